//! Execution result types
//!
//! - QueryResult: raw value produced by the executor
//! - QueryOutcome: serializable success/error envelope handed to callers

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::Value;

/// Raw result of running a compiled query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Drained cursor
    Documents(Vec<Document>),

    /// `count()` result
    Count(u64),

    /// `distinct()` result
    Values(Vec<Bson>),

    /// Chain ended without ever opening a cursor
    Empty,
}

impl QueryResult {
    /// Number of items returned (a count is one item)
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Documents(docs) => docs.len(),
            QueryResult::Values(values) => values.len(),
            QueryResult::Count(_) => 1,
            QueryResult::Empty => 0,
        }
    }

    /// Whether nothing was returned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the result as a single BSON value
    pub fn to_bson(&self) -> Bson {
        match self {
            QueryResult::Documents(docs) => {
                Bson::Array(docs.iter().cloned().map(Bson::Document).collect())
            }
            QueryResult::Count(n) => match i64::try_from(*n) {
                Ok(n) => Bson::Int64(n),
                Err(_) => Bson::Double(*n as f64),
            },
            QueryResult::Values(values) => Bson::Array(values.clone()),
            QueryResult::Empty => Bson::Null,
        }
    }
}

/// Status marker serialized as `"success"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
}

/// Serializable outcome of one query.
///
/// Success: `{"status": "success", "data": ..., "file": "out.json"}`
/// Failure: `{"error": "Query execution failed: ..."}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Success {
        status: OutcomeStatus,
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl QueryOutcome {
    /// Create a successful outcome
    pub fn success(data: Value, file: Option<String>) -> Self {
        QueryOutcome::Success {
            status: OutcomeStatus::Success,
            data,
            file,
        }
    }

    /// Create a failed outcome from any displayable error
    pub fn failure(error: impl std::fmt::Display) -> Self {
        QueryOutcome::Failure {
            error: format!("Query execution failed: {error}"),
        }
    }

    /// Whether the query succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success { .. })
    }

    /// Result data on success
    pub fn data(&self) -> Option<&Value> {
        match self {
            QueryOutcome::Success { data, .. } => Some(data),
            QueryOutcome::Failure { .. } => None,
        }
    }

    /// Error message on failure
    pub fn error(&self) -> Option<&str> {
        match self {
            QueryOutcome::Success { .. } => None,
            QueryOutcome::Failure { error } => Some(error),
        }
    }

    /// Path the data was persisted to, if any
    pub fn file(&self) -> Option<&str> {
        match self {
            QueryOutcome::Success { file, .. } => file.as_deref(),
            QueryOutcome::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use serde_json::json;

    #[test]
    fn test_success_serialization() {
        let outcome = QueryOutcome::success(json!([{"a": 1}]), Some("out.json".to_string()));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"status": "success", "data": [{"a": 1}], "file": "out.json"})
        );
    }

    #[test]
    fn test_success_without_file_omits_key() {
        let outcome = QueryOutcome::success(json!(3), None);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"status": "success", "data": 3})
        );
    }

    #[test]
    fn test_failure_serialization() {
        let outcome = QueryOutcome::failure("boom");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"error": "Query execution failed: boom"})
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.data(), None);
    }

    #[test]
    fn test_result_len() {
        assert_eq!(QueryResult::Documents(vec![doc! {}, doc! {}]).len(), 2);
        assert_eq!(QueryResult::Count(42).len(), 1);
        assert!(QueryResult::Empty.is_empty());
        assert_eq!(QueryResult::Count(7).to_bson(), Bson::Int64(7));
    }
}
