//! MongoDB query-string execution library
//!
//! Turns shell-style query text such as
//! `db.orders.find({status:'open'}).sort({date:-1}).limit(10)` into typed
//! operations, runs them against a document store and returns a
//! JSON-friendly outcome.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `error`: Error types and handling
//! - `executor`: Operation state machine and result types
//! - `formatter`: Result sanitizing and output formatting
//! - `parser`: Tokenizing, text repair, decoding and compiling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mongo_query_exec::{config::Config, connection::ConnectionManager, QueryRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(config.connection);
//!     manager.connect().await?;
//!
//!     let runner = QueryRunner::new(Arc::new(manager.store()?));
//!     let outcome = runner.run("db.orders.count({status:'open'})", None).await;
//!     println!("{}", serde_json::to_string(&outcome)?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod parser;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use error::{QueryError, Result};
pub use executor::{DocumentStore, MongoStore, QueryOutcome, QueryResult, QueryRunner};
pub use parser::{CompiledQuery, Parser, compile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
