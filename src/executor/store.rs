//! Document store abstraction
//!
//! The executor talks to collections only through [`DocumentStore`], so the
//! state machine can be exercised without a server. [`MongoStore`] is the
//! production implementation over a `mongodb::Database`.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::{Collection, Database};
use tracing::debug;

use crate::error::Result;

/// Cursor modifiers accumulated for a `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    /// Fields to include or exclude
    pub projection: Option<Document>,

    /// Sort specification
    pub sort: Option<Document>,

    /// Number of documents to skip
    pub skip: Option<u64>,

    /// Maximum number of documents to return
    pub limit: Option<i64>,
}

/// Read-only access to named collections.
///
/// Implementations must be safe for concurrent use; the executor holds no
/// lock around calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a filtered find and drain the cursor
    async fn find(&self, collection: &str, filter: Document, spec: FindSpec)
    -> Result<Vec<Document>>;

    /// Run an aggregation pipeline and drain the cursor
    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>>;

    /// Count documents matching a filter
    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Distinct values of a field among documents matching a filter
    async fn distinct(&self, collection: &str, field: &str, filter: Document) -> Result<Vec<Bson>>;
}

/// [`DocumentStore`] backed by a MongoDB database handle.
#[derive(Clone, Debug)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Wrap a database handle
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>> {
        debug!(
            "find on '{}' with filter {:?} and options {:?}",
            collection, filter, spec
        );

        let mut find_options = mongodb::options::FindOptions::default();
        find_options.projection = spec.projection;
        find_options.sort = spec.sort;
        find_options.skip = spec.skip;
        find_options.limit = spec.limit;

        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(find_options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        debug!(
            "aggregate on '{}' with {} stage(s)",
            collection,
            pipeline.len()
        );

        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64> {
        debug!("countDocuments on '{}' with filter {:?}", collection, filter);
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn distinct(&self, collection: &str, field: &str, filter: Document) -> Result<Vec<Bson>> {
        debug!("distinct '{}' on '{}' with filter {:?}", field, collection, filter);
        Ok(self.collection(collection).distinct(field, filter).await?)
    }
}
