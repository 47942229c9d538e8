//! The persistence engine.
//!
//! [`DocumentStore`] owns every interaction with the underlying store. It wraps a boxed
//! [`DynStoreBackend`] so the backend can be chosen at runtime, and it refuses to touch any
//! collection that is not part of its [`CollectionRegistry`].
//!
//! # Example
//!
//! ```ignore
//! use docstore::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend, Arc::new(CollectionRegistry::defaults()));
//! store.apply_indexes(["content", "lists"]).await?;
//!
//! let content = store.find_by_identifier("content", "http://api.ft.com/system/FTCOM-METHODE", "abc").await?;
//! ```

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, CollectionRegistry, ListFilter},
    document::{Document, WriteResult},
    error::DocumentStoreResult,
};

/// A document store over a runtime-selected backend and a fixed set of collections.
///
/// The store is shared by every concurrent request; it holds no per-request state.
#[derive(Debug)]
pub struct DocumentStore {
    backend: Box<dyn DynStoreBackend>,
    registry: Arc<CollectionRegistry>,
}

impl DocumentStore {
    /// Creates a new document store with the given backend and collection registry.
    pub fn new<B: StoreBackend + 'static>(backend: B, registry: Arc<CollectionRegistry>) -> Self {
        Self::from_boxed(Box::new(backend), registry)
    }

    /// Creates a new document store from an already boxed backend.
    pub fn from_boxed(backend: Box<dyn DynStoreBackend>, registry: Arc<CollectionRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Returns the collection registry this store enforces.
    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    /// Gets a handle onto a registered collection.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionNotFound`](crate::error::DocumentStoreError::CollectionNotFound)
    /// if `name` is not registered.
    pub fn collection(&self, name: &str) -> DocumentStoreResult<Collection<'_>> {
        let spec = self.registry.require(name)?;
        Ok(Collection::new(spec.name().to_string(), self.backend.as_ref()))
    }

    /// Finds a document by uuid. See [`Collection::find_by_uuid`].
    pub async fn find_by_uuid(&self, collection: &str, uuid: &Uuid) -> DocumentStoreResult<Option<Document>> {
        self.collection(collection)?.find_by_uuid(uuid).await
    }

    /// Finds the existing subset of `uuids`. See [`Collection::find_by_uuids`].
    pub async fn find_by_uuids(&self, collection: &str, uuids: &[Uuid]) -> DocumentStoreResult<Vec<Document>> {
        self.collection(collection)?.find_by_uuids(uuids).await
    }

    /// Finds a document by identifier. See [`Collection::find_by_identifier`].
    pub async fn find_by_identifier(
        &self,
        collection: &str,
        authority: &str,
        value: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        self.collection(collection)?
            .find_by_identifier(authority, value)
            .await
    }

    /// Finds a document by concept and type. See [`Collection::find_by_concept_and_type`].
    pub async fn find_by_concept_and_type(
        &self,
        collection: &str,
        concept_id: &str,
        type_id: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        self.collection(collection)?
            .find_by_concept_and_type(concept_id, type_id)
            .await
    }

    /// Filters list documents. See [`Collection::filter_lists`].
    pub async fn filter_lists(&self, collection: &str, filter: &ListFilter) -> DocumentStoreResult<Vec<Document>> {
        self.collection(collection)?.filter_lists(filter).await
    }

    /// Upserts a document keyed by its uuid. See [`Collection::write`].
    pub async fn write(&self, collection: &str, document: Document) -> DocumentStoreResult<WriteResult> {
        self.collection(collection)?.write(document).await
    }

    /// Deletes a document by uuid. See [`Collection::delete`].
    pub async fn delete(&self, collection: &str, uuid: &Uuid) -> DocumentStoreResult<()> {
        self.collection(collection)?.delete(uuid).await
    }

    /// Ensures the indexes of every named collection exist.
    ///
    /// Safe to call repeatedly. All names are checked against the registry before any index
    /// is created.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionNotFound`](crate::error::DocumentStoreError::CollectionNotFound)
    /// for the first unregistered name, or the backend failure that stopped provisioning.
    pub async fn apply_indexes<'n, I>(&self, names: I) -> DocumentStoreResult<()>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let specs = names
            .into_iter()
            .map(|name| self.registry.require(name))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        for spec in specs {
            info!(collection = spec.name(), indexes = spec.indexes().len(), "applying indexes");
            self.collection(spec.name())?
                .ensure_indexes(spec.indexes())
                .await?;
        }

        Ok(())
    }

    /// Shuts down the store and its backend, releasing all resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}
