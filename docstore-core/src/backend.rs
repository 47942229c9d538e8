//! Storage backend abstraction for the document store.
//!
//! This module defines the store-client boundary: the few primitive operations the
//! persistence engine needs from a schemaless store. Backends know nothing about uuids,
//! identifiers or lists; they receive collection names, [`Query`] values, and
//! [`IndexSpec`]s, and return raw documents or counts.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    document::Document,
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// What a [`StoreBackend::replace_document`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// An existing document matched the filter and was replaced.
    Replaced,
    /// Nothing matched, so the document was inserted.
    Inserted,
}

/// A secondary index over one or more fields of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexSpec {
    /// Store-level name of the index.
    pub name: String,
    /// Indexed field paths, in key order.
    pub fields: Vec<String>,
    /// Whether the store rejects two documents with the same key.
    pub unique: bool,
}

impl IndexSpec {
    /// Creates an ascending index over `fields`, named after them.
    pub fn ascending<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let name = fields
            .iter()
            .map(|field| format!("{field}_1"))
            .collect::<Vec<_>>()
            .join("_");

        Self { name, fields, unique: false }
    }

    /// Marks the index as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Requests share nothing but the backend itself.
///
/// # Error Handling
///
/// Connectivity and timeout failures must be reported as
/// [`DocumentStoreError::Unavailable`](crate::error::DocumentStoreError::Unavailable); any other
/// unexpected store failure as [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the documents of `collection` matching `query`, in the store's natural order.
    ///
    /// A missing collection yields an empty result. Storage-only fields may be present in
    /// the returned documents; the engine strips them.
    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Atomically replaces the first document matching `filter` with `document`, or inserts
    /// `document` when nothing matches.
    ///
    /// The replacement is total: no field of the previous document survives.
    async fn replace_document(
        &self,
        filter: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ReplaceOutcome>;

    /// Deletes at most one document matching `filter` and returns how many were removed.
    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64>;

    /// Ensures the index exists. Creating an index that already exists is a no-op.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;
    async fn replace_document(
        &self,
        filter: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ReplaceOutcome>;
    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64>;
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn find_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::find_documents(self, query, collection).await
    }

    async fn replace_document(
        &self,
        filter: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ReplaceOutcome> {
        StoreBackend::replace_document(self, filter, document, collection).await
    }

    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::delete_document(self, filter, collection).await
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        StoreBackend::create_index(self, collection, index).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        (*self).shutdown().await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_index_is_named_after_its_fields() {
        let index = IndexSpec::ascending(["identifiers.authority", "identifiers.identifierValue"]);
        assert_eq!(index.name, "identifiers.authority_1_identifiers.identifierValue_1");
        assert_eq!(index.fields.len(), 2);
        assert!(!index.unique);
        assert!(index.unique().unique);
    }
}
