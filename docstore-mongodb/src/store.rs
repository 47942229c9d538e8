use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind},
    options::{ClientOptions, FindOptions, IndexOptions},
};
use tracing::debug;

use docstore_core::{
    backend::{IndexSpec, ReplaceOutcome, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
};

use crate::{query::MongoQueryTranslator, sanitizer::KeySanitizer};

/// Maps a driver error onto the store failure classes.
///
/// Network and server selection failures, timeouts included, are unavailability; anything
/// else the driver reports is a backend failure.
pub(crate) fn classify_error(operation: &str, collection: &str, err: MongoError) -> DocumentStoreError {
    debug!(operation, collection, error = %err, "mongodb operation failed");

    match err.kind.as_ref() {
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
            DocumentStoreError::Unavailable(err.to_string())
        }
        _ => DocumentStoreError::Backend(err.to_string()),
    }
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_string(collection_name))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }

        Ok(self
            .get_collection(collection)
            .find(MongoQueryTranslator::translate(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(|e| classify_error("find", collection, e))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| classify_error("find", collection, e))?
            .into_iter()
            .map(KeySanitizer::restore_document)
            .collect())
    }

    async fn replace_document(
        &self,
        filter: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ReplaceOutcome> {
        let result = self
            .get_collection(collection)
            .replace_one(
                MongoQueryTranslator::translate(Some(&filter))?,
                KeySanitizer::sanitize_document(document),
            )
            .upsert(true)
            .await
            .map_err(|e| classify_error("replace", collection, e))?;

        Ok(match result.upserted_id {
            Some(_) => ReplaceOutcome::Inserted,
            None => ReplaceOutcome::Replaced,
        })
    }

    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_one(MongoQueryTranslator::translate(Some(&filter))?)
            .await
            .map_err(|e| classify_error("delete", collection, e))?
            .deleted_count)
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        let keys: Document = index
            .fields
            .iter()
            .map(|field| (field.clone(), Bson::Int32(1)))
            .collect();

        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(keys)
                    .options(
                        IndexOptions::builder()
                            .name(index.name.clone())
                            .unique(index.unique)
                            .build(),
                    )
                    .build(),
            )
            .await
            .map_err(|e| classify_error("create_index", collection, e))?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
