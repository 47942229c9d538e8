//! In-memory storage implementation for document stores.
//!
//! Documents live in per-collection vectors behind an async-aware read-write lock, so the
//! natural order of every query result is insertion order. A replaced document keeps the
//! position of the document it replaced.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use mea::rwlock::RwLock;

use docstore_core::{
    backend::{IndexSpec, ReplaceOutcome, StoreBackend, StoreBackendBuilder},
    document::Document,
    error::DocumentStoreResult,
    query::{Expr, Query},
};

use crate::evaluator::DocumentEvaluator;

type StoreMap = HashMap<String, Vec<Document>>;
type IndexMap = HashMap<String, HashSet<IndexSpec>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// safely shared across async tasks. Multiple clones of the same instance share the same
/// underlying data.
///
/// Queries scan every document of a collection. Index specifications are recorded but do
/// not change how queries run.
///
/// # Example
///
/// ```ignore
/// use docstore_memory::InMemoryStore;
/// use docstore::store::DocumentStore;
///
/// let store = DocumentStore::new(InMemoryStore::new(), Arc::new(CollectionRegistry::defaults()));
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
    /// collection_name -> indexes created on it
    indexes: Arc<RwLock<IndexMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Returns the indexes created on `collection`, sorted by name.
    pub async fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        let mut indexes: Vec<IndexSpec> = self
            .indexes
            .read()
            .await
            .get(collection)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        indexes
    }

    /// Inserts `document` without any uniqueness check.
    ///
    /// This bypasses the upsert path and exists to seed data that violates the store's
    /// invariants, such as two documents sharing an identifier.
    pub async fn insert_raw(&self, collection: &str, document: Document) {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }
}

fn position(documents: &[Document], filter: &Expr) -> DocumentStoreResult<Option<usize>> {
    for (index, document) in documents.iter().enumerate() {
        if DocumentEvaluator::new(document).evaluate(filter)? {
            return Ok(Some(index));
        }
    }

    Ok(None)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(vec![]);
        };

        let limit = query.limit.unwrap_or(usize::MAX);
        let mut found = Vec::new();

        for document in documents {
            if found.len() >= limit {
                break;
            }

            let matched = match &query.filter {
                Some(filter) => DocumentEvaluator::new(document).evaluate(filter)?,
                None => true,
            };

            if matched {
                found.push(document.clone());
            }
        }

        Ok(found)
    }

    async fn replace_document(
        &self,
        filter: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ReplaceOutcome> {
        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        match position(documents, &filter)? {
            Some(index) => {
                documents[index] = document;
                Ok(ReplaceOutcome::Replaced)
            }
            None => {
                documents.push(document);
                Ok(ReplaceOutcome::Inserted)
            }
        }
    }

    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(0);
        };

        match position(documents, &filter)? {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        self.indexes
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(index.clone());

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docstore_memory::InMemoryStore;
/// use docstore::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
