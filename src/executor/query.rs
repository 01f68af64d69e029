//! Operation executor
//!
//! Runs a compiled operation sequence as a three-state machine:
//!
//! ```text
//! NoCursor --find/aggregate--> Active(cursor) --limit/skip/sort--> Active(cursor)
//!    |                            |
//!    +------count/distinct--------+--> Terminal(result)   (remaining ops skipped)
//! ```
//!
//! Cursor transformations on `NoCursor` are no-ops. Cursors are lazy: the
//! store is only queried when the chain ends in `Active` and the cursor is
//! drained.

use std::sync::Arc;

use mongodb::bson::{Document, doc};
use tracing::{debug, info, warn};

use super::result::QueryResult;
use super::store::{DocumentStore, FindSpec};
use crate::error::{ExecutionError, QueryError, Result};
use crate::parser::{CompiledQuery, CursorArg, DistinctTarget, Operation};

/// Evolving state threaded through the operation sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionState {
    /// No collection-producing operation seen yet
    NoCursor,

    /// A cursor is open and may still be transformed
    Active(PendingCursor),

    /// A terminal operation produced the final value
    Terminal(QueryResult),
}

/// A cursor that has not been drained yet.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCursor {
    /// Filtered find with accumulated modifiers
    Find { filter: Document, spec: FindSpec },

    /// Aggregation; cursor modifiers are appended as stages
    Aggregate { stages: Vec<Document> },
}

impl PendingCursor {
    fn limit(&mut self, n: u64) -> Result<()> {
        let n = i64::try_from(n).map_err(|_| ExecutionError::InvalidCursorArgument {
            method: "limit".to_string(),
            value: n.to_string(),
        })?;
        match self {
            PendingCursor::Find { spec, .. } => spec.limit = Some(n),
            // limit(0) is "no limit"; a zero $limit stage is rejected by the server
            PendingCursor::Aggregate { .. } if n == 0 => {}
            PendingCursor::Aggregate { stages } => stages.push(doc! { "$limit": n }),
        }
        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        match self {
            PendingCursor::Find { spec, .. } => spec.skip = Some(n),
            PendingCursor::Aggregate { stages } => {
                let n = i64::try_from(n).map_err(|_| ExecutionError::InvalidCursorArgument {
                    method: "skip".to_string(),
                    value: n.to_string(),
                })?;
                stages.push(doc! { "$skip": n });
            }
        }
        Ok(())
    }

    fn sort(&mut self, sort: Document) {
        match self {
            PendingCursor::Find { spec, .. } => spec.sort = Some(sort),
            PendingCursor::Aggregate { stages } => stages.push(doc! { "$sort": sort }),
        }
    }
}

/// Executor for compiled queries
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn DocumentStore>,
}

impl QueryExecutor {
    /// Create a new executor over a store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Execute a compiled query
    ///
    /// # Arguments
    /// * `query` - Compiled query
    ///
    /// # Returns
    /// * `Result<QueryResult>` - Drained documents, terminal value, or `Empty`
    pub async fn execute(&self, query: CompiledQuery) -> Result<QueryResult> {
        let CompiledQuery {
            collection,
            operations,
        } = query;

        info!(
            "Executing {} operation(s) on collection '{}'",
            operations.len(),
            collection
        );

        let mut state = ExecutionState::NoCursor;
        for operation in operations {
            state = self.step(&collection, state, operation).await?;
            if matches!(state, ExecutionState::Terminal(_)) {
                break;
            }
        }

        match state {
            ExecutionState::NoCursor => {
                debug!("Chain ended without a cursor");
                Ok(QueryResult::Empty)
            }
            ExecutionState::Active(cursor) => self
                .drain(&collection, cursor)
                .await
                .map(QueryResult::Documents),
            ExecutionState::Terminal(result) => Ok(result),
        }
    }

    /// Apply one operation to the current state
    pub async fn step(
        &self,
        collection: &str,
        state: ExecutionState,
        operation: Operation,
    ) -> Result<ExecutionState> {
        if let ExecutionState::Terminal(_) = state {
            return Ok(state);
        }

        match operation {
            Operation::Find { filter, projection } => {
                if let ExecutionState::Active(_) = state {
                    warn!("find() replaces the cursor opened earlier in the chain");
                }
                Ok(ExecutionState::Active(PendingCursor::Find {
                    filter,
                    spec: FindSpec {
                        projection,
                        ..FindSpec::default()
                    },
                }))
            }

            Operation::Aggregate { pipeline } => {
                if let ExecutionState::Active(_) = state {
                    warn!("aggregate() replaces the cursor opened earlier in the chain");
                }
                Ok(ExecutionState::Active(PendingCursor::Aggregate {
                    stages: pipeline.into_stages(),
                }))
            }

            Operation::Count { filter } => {
                let count = self
                    .store
                    .count_documents(collection, filter)
                    .await
                    .map_err(execution_failed)?;
                Ok(ExecutionState::Terminal(QueryResult::Count(count)))
            }

            Operation::Distinct { target, filter } => {
                let field = distinct_field(&target)?;
                let values = self
                    .store
                    .distinct(collection, &field, filter.unwrap_or_default())
                    .await
                    .map_err(execution_failed)?;
                Ok(ExecutionState::Terminal(QueryResult::Values(values)))
            }

            Operation::Limit(arg) => transform(state, "limit", |cursor| {
                cursor.limit(cursor_count("limit", arg)?)
            }),

            Operation::Skip(arg) => transform(state, "skip", |cursor| {
                cursor.skip(cursor_count("skip", arg)?)
            }),

            Operation::Sort(sort) => transform(state, "sort", |cursor| {
                cursor.sort(sort);
                Ok(())
            }),
        }
    }

    /// Drain a pending cursor into documents
    async fn drain(&self, collection: &str, cursor: PendingCursor) -> Result<Vec<Document>> {
        let documents = match cursor {
            PendingCursor::Find { filter, spec } => {
                self.store.find(collection, filter, spec).await
            }
            PendingCursor::Aggregate { stages } => self.store.aggregate(collection, stages).await,
        }
        .map_err(execution_failed)?;

        info!("Cursor returned {} document(s)", documents.len());
        Ok(documents)
    }
}

/// Apply a cursor transformation, or ignore it when no cursor is open.
fn transform<F>(state: ExecutionState, method: &str, apply: F) -> Result<ExecutionState>
where
    F: FnOnce(&mut PendingCursor) -> Result<()>,
{
    match state {
        ExecutionState::Active(mut cursor) => {
            apply(&mut cursor)?;
            Ok(ExecutionState::Active(cursor))
        }
        other => {
            debug!("{}() ignored: no cursor is open", method);
            Ok(other)
        }
    }
}

fn cursor_count(method: &str, arg: CursorArg) -> Result<u64> {
    match arg {
        CursorArg::Count(n) => Ok(n),
        CursorArg::Raw(value) => Err(ExecutionError::InvalidCursorArgument {
            method: method.to_string(),
            value,
        }
        .into()),
    }
}

fn distinct_field(target: &DistinctTarget) -> Result<String> {
    target.field_name().ok_or_else(|| {
        ExecutionError::Failed(format!("distinct() could not resolve a field name from {target:?}"))
            .into()
    })
}

/// Any store failure surfaces as an execution failure.
fn execution_failed(err: QueryError) -> QueryError {
    match err {
        QueryError::Execution(_) => err,
        other => ExecutionError::Failed(other.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{MemoryStore, RecordedCall};
    use crate::parser::compile;
    use mongodb::bson::{Bson, doc};

    fn orders() -> Vec<Document> {
        vec![
            doc! { "_id": 1, "status": "open", "date": 3 },
            doc! { "_id": 2, "status": "closed", "date": 1 },
            doc! { "_id": 3, "status": "open", "date": 2 },
            doc! { "_id": 4, "status": "pending", "date": 4 },
        ]
    }

    fn setup() -> (Arc<MemoryStore>, QueryExecutor) {
        let store = Arc::new(MemoryStore::new().with_collection("orders", orders()));
        let executor = QueryExecutor::new(store.clone());
        (store, executor)
    }

    async fn run(executor: &QueryExecutor, query: &str) -> Result<QueryResult> {
        executor.execute(compile(query)?).await
    }

    #[tokio::test]
    async fn test_find_sort_limit() {
        let (store, executor) = setup();
        let result = run(
            &executor,
            "db.orders.find({status:'open'}).sort({date:-1}).limit(10)",
        )
        .await
        .unwrap();

        match result {
            QueryResult::Documents(docs) => {
                let ids: Vec<i32> = docs.iter().map(|d| d.get_i32("_id").unwrap()).collect();
                assert_eq!(ids, vec![1, 3]);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        assert_eq!(
            store.calls(),
            vec![RecordedCall::Find {
                filter: doc! { "status": "open" },
                spec: FindSpec {
                    projection: None,
                    sort: Some(doc! { "date": -1 }),
                    skip: None,
                    limit: Some(10),
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_count_short_circuits() {
        let (store, executor) = setup();
        let result = run(
            &executor,
            "db.orders.count({status:'open'}).find({}).limit(1)",
        )
        .await
        .unwrap();

        assert_eq!(result, QueryResult::Count(2));
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Count {
                filter: doc! { "status": "open" }
            }]
        );
    }

    #[tokio::test]
    async fn test_count_after_find_is_terminal() {
        let (store, executor) = setup();
        let result = run(&executor, "db.orders.find({}).count()").await.unwrap();
        assert_eq!(result, QueryResult::Count(4));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_deduplicates() {
        let (_, executor) = setup();
        let result = run(&executor, "db.orders.distinct('status')").await.unwrap();
        assert_eq!(
            result,
            QueryResult::Values(vec![
                Bson::String("open".to_string()),
                Bson::String("closed".to_string()),
                Bson::String("pending".to_string()),
            ])
        );
    }

    #[tokio::test]
    async fn test_distinct_mapping_uses_first_key() {
        let (store, executor) = setup();
        run(&executor, "db.orders.distinct({status: 1})").await.unwrap();
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Distinct {
                field: "status".to_string(),
                filter: doc! {}
            }]
        );
    }

    #[tokio::test]
    async fn test_aggregate_single_stage_is_wrapped() {
        let (store, executor) = setup();
        let result = run(&executor, "db.orders.aggregate({$match: {status: 'closed'}})")
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Aggregate {
                pipeline: vec![doc! { "$match": { "status": "closed" } }]
            }]
        );
    }

    #[tokio::test]
    async fn test_aggregate_cursor_modifiers_become_stages() {
        let (store, executor) = setup();
        run(
            &executor,
            "db.orders.aggregate([{$match: {status: 'open'}}]).sort({date: 1}).skip(1).limit(5)",
        )
        .await
        .unwrap();

        assert_eq!(
            store.calls(),
            vec![RecordedCall::Aggregate {
                pipeline: vec![
                    doc! { "$match": { "status": "open" } },
                    doc! { "$sort": { "date": 1 } },
                    doc! { "$skip": 1_i64 },
                    doc! { "$limit": 5_i64 },
                ]
            }]
        );
    }

    #[tokio::test]
    async fn test_aggregate_zero_limit_adds_no_stage() {
        let (store, executor) = setup();
        let result = run(
            &executor,
            "db.orders.aggregate([{$match: {status: 'open'}}]).limit(0)",
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Aggregate {
                pipeline: vec![doc! { "$match": { "status": "open" } }]
            }]
        );
    }

    #[tokio::test]
    async fn test_transforms_without_cursor_are_ignored() {
        let (store, executor) = setup();
        let result = run(&executor, "db.orders.limit(5).skip(2).sort({a: 1})")
            .await
            .unwrap();
        assert_eq!(result, QueryResult::Empty);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_raw_limit_fails_on_active_cursor() {
        let (store, executor) = setup();
        let err = run(&executor, "db.orders.find({}).limit(ten)").await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::Execution(ExecutionError::InvalidCursorArgument { .. })
        ));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MemoryStore::new().failing("connection refused"));
        let executor = QueryExecutor::new(store);
        let err = run(&executor, "db.orders.find({})").await.unwrap_err();
        match err {
            QueryError::Execution(ExecutionError::Failed(msg)) => {
                assert_eq!(msg, "connection refused")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_step_keeps_terminal_state() {
        let (store, executor) = setup();
        let state = ExecutionState::Terminal(QueryResult::Count(1));
        let next = executor
            .step(
                "orders",
                state.clone(),
                Operation::Find {
                    filter: doc! {},
                    projection: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(next, state);
        assert!(store.calls().is_empty());
    }
}
