//! In-memory [`DocumentStore`] used by executor tests.
//!
//! Supports top-level equality filters, single-key sorts and the
//! `$match`/`$sort`/`$skip`/`$limit` stages; every call is recorded.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use super::store::{DocumentStore, FindSpec};
use crate::error::{ExecutionError, Result};

/// A call observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Find {
        filter: Document,
        spec: FindSpec,
    },
    Aggregate {
        pipeline: Vec<Document>,
    },
    Count {
        filter: Document,
    },
    Distinct {
        field: String,
        filter: Document,
    },
}

#[derive(Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
    calls: Mutex<Vec<RecordedCall>>,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: &str, docs: Vec<Document>) -> Self {
        self.collections.insert(name.to_string(), docs);
        self
    }

    /// Make every call fail with the given message
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(message) => Err(ExecutionError::Failed(message.clone()).into()),
            None => Ok(()),
        }
    }

    fn matching(&self, collection: &str, filter: &Document) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.iter().all(|(k, v)| doc.get(k) == Some(v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>> {
        self.record(RecordedCall::Find {
            filter: filter.clone(),
            spec: spec.clone(),
        })?;

        let mut docs = self.matching(collection, &filter);
        if let Some(sort) = &spec.sort {
            sort_documents(&mut docs, sort);
        }
        let skip = spec.skip.unwrap_or(0) as usize;
        let docs = docs.into_iter().skip(skip);
        Ok(match spec.limit {
            Some(limit) if limit > 0 => docs.take(limit as usize).collect(),
            _ => docs.collect(),
        })
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        self.record(RecordedCall::Aggregate {
            pipeline: pipeline.clone(),
        })?;

        let mut docs = self.matching(collection, &Document::new());
        for stage in &pipeline {
            if let Ok(filter) = stage.get_document("$match") {
                docs.retain(|doc| filter.iter().all(|(k, v)| doc.get(k) == Some(v)));
            } else if let Ok(sort) = stage.get_document("$sort") {
                sort_documents(&mut docs, sort);
            } else if let Some(n) = stage.get("$skip").and_then(as_usize) {
                docs = docs.into_iter().skip(n).collect();
            } else if let Some(n) = stage.get("$limit").and_then(as_usize) {
                docs.truncate(n);
            }
        }
        Ok(docs)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        self.record(RecordedCall::Count {
            filter: filter.clone(),
        })?;
        Ok(self.matching(collection, &filter).len() as u64)
    }

    async fn distinct(&self, collection: &str, field: &str, filter: Document) -> Result<Vec<Bson>> {
        self.record(RecordedCall::Distinct {
            field: field.to_string(),
            filter: filter.clone(),
        })?;

        let mut values: Vec<Bson> = Vec::new();
        for doc in self.matching(collection, &filter) {
            if let Some(value) = doc.get(field) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }
}

fn as_usize(value: &Bson) -> Option<usize> {
    match value {
        Bson::Int32(n) => usize::try_from(*n).ok(),
        Bson::Int64(n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

fn sort_documents(docs: &mut [Document], sort: &Document) {
    let Some((field, direction)) = sort.iter().next() else {
        return;
    };
    let descending = matches!(direction, Bson::Int32(-1) | Bson::Int64(-1));
    docs.sort_by(|a, b| {
        let ordering = compare(a.get(field), b.get(field));
        if descending { ordering.reverse() } else { ordering }
    });
}

fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (Some(Bson::Int32(x)), Some(Bson::Int32(y))) => x.cmp(y),
        (Some(Bson::Int64(x)), Some(Bson::Int64(y))) => x.cmp(y),
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
