//! Error handling for the query pipeline.
//!
//! Every stage of the pipeline reports failures through [`QueryError`]:
//! - `Parse` covers the surface syntax, argument repair and method dispatch
//! - `Execution` covers anything the document store rejects
//! - `Config`, `Connection`, `Io` and `Json` cover the ambient plumbing
//!
//! # Example
//!
//! ```rust
//! use mongo_query_exec::error::{ParseError, QueryError};
//!
//! let err: QueryError = ParseError::UnsupportedMethod("explain".to_string()).into();
//! assert_eq!(err.to_string(), "Unsupported method: explain");
//! ```

pub mod kinds;
pub mod mongo;

pub use kinds::{ConfigError, ConnectionError, ExecutionError, ParseError, QueryError, Result};
pub use mongo::describe_mongodb_error;
