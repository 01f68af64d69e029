//! Query execution engine
//!
//! This module runs compiled queries against a document store and turns the
//! result into a serializable outcome. It includes:
//! - `store`: the collection-handle abstraction and its MongoDB implementation
//! - `query`: the operation state machine
//! - `result`: raw results and the outcome envelope
//! - `writer`: persistence of outcome data to a file
//!
//! [`QueryRunner`] ties the pipeline together:
//! text → tokenize → compile → execute → sanitize → outcome.

mod query;
mod result;
mod store;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::formatter::sanitize::sanitize_result;
use crate::parser::Parser;

pub use query::{ExecutionState, PendingCursor, QueryExecutor};
pub use result::{OutcomeStatus, QueryOutcome, QueryResult};
pub use store::{DocumentStore, FindSpec, MongoStore};

/// End-to-end runner for query strings
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct QueryRunner {
    parser: Parser,
    executor: QueryExecutor,
}

impl QueryRunner {
    /// Create a runner over a store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            parser: Parser::new(),
            executor: QueryExecutor::new(store),
        }
    }

    /// Parse, compile and execute a query string
    ///
    /// # Arguments
    /// * `query` - Query text such as `db.orders.find({status:'open'})`
    ///
    /// # Returns
    /// * `Result<QueryResult>` - Unsanitized result or the first error
    pub async fn execute(&self, query: &str) -> Result<QueryResult> {
        debug!("Raw query received: {}", query);
        let compiled = self.parser.parse(query)?;
        self.executor.execute(compiled).await
    }

    /// Run a query and wrap the result in a [`QueryOutcome`]
    ///
    /// Never fails: errors become `{"error": ...}` outcomes. When
    /// `output_file` is given and the query succeeds, the sanitized data is
    /// written there and the outcome carries the path.
    pub async fn run(&self, query: &str, output_file: Option<&Path>) -> QueryOutcome {
        match self.run_inner(query, output_file).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Query execution failed: {}", e);
                QueryOutcome::failure(e)
            }
        }
    }

    async fn run_inner(&self, query: &str, output_file: Option<&Path>) -> Result<QueryOutcome> {
        let result = self.execute(query).await?;
        let data = sanitize_result(&result);

        let file = match output_file {
            Some(path) => {
                writer::persist_json(path, &data).await?;
                info!("Saved {} item(s) to {}", result.len(), path.display());
                Some(path.display().to_string())
            }
            None => None,
        };

        Ok(QueryOutcome::success(data, file))
    }
}
