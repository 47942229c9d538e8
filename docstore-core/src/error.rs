//! Error types and result types for document store operations.
//!
//! Every failure raised by the persistence engine, the validators or the pipeline router
//! is a [`DocumentStoreError`]. The [`classify`](crate::classify) module maps these onto the
//! stable external failure taxonomy; nothing in this module knows about transports.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization, configuration or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A caller-correctable problem with the request: malformed uuid, malformed document,
    /// or a path/body uuid mismatch. The message is shown to clients as-is.
    #[error("{0}")]
    Validation(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document with uuid : {0} not found in collection {1}")]
    DocumentNotFound(String, String),
    /// The collection is not part of the collection registry.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// No pipeline is registered for the collection and operation.
    #[error("No pipeline registered for operation {1} on collection {0}")]
    NotRegistered(String, String),
    /// A lookup that must resolve to at most one document matched several.
    /// The first argument is the collection, the second describes the lookup key.
    #[error("Query on collection {0} for {1} returned more than one document")]
    QueryResultNotUnique(String, String),
    /// The store could not be reached or timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// The body-transform collaborator rejected a document body.
    #[error("Body transform error: {0}")]
    Transform(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl DocumentStoreError {
    /// Shorthand for a [`DocumentStoreError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        DocumentStoreError::Validation(message.into())
    }
}

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
