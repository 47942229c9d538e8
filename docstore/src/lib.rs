//! Document store access layer: one CRUD-and-query mechanism for heterogeneous,
//! uuid-keyed document collections.
//!
//! This crate is the primary entry point. It re-exports the core types from the sub-crates,
//! wires the default route table for `content`, `lists` and `generic-lists`, and provides a
//! [`DocumentStoreService`](service::DocumentStoreService) that bootstraps everything from
//! configuration.
//!
//! # Features
//!
//! - **Declarative dispatch** - `(collection, operation)` pairs map to chains of reusable stages
//! - **Well-defined persistence** - Upsert keyed by uuid, best-effort batch reads, uniqueness
//!   checks on secondary keys, truthful not-found on delete
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Stable failure taxonomy** - Every failure leaves as a classified [`ErrorDescriptor`](classify::ErrorDescriptor)
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DocumentStoreConfig::from_env()?;
//!     let service = DocumentStoreService::from_config(&config).await?;
//!
//!     let uuid = "9b7b5b5e-0d0a-4b4e-8f0c-2a1f6c0c1d11";
//!     let outcome = service
//!         .handle(OperationRequest::add(
//!             "lists",
//!             uuid,
//!             json!({ "uuid": uuid, "title": "Top Stories", "items": [] }),
//!         ))
//!         .await?;
//!     assert!(matches!(outcome, Outcome::Written(WriteResult::Created(_))));
//!
//!     let outcome = service.handle(OperationRequest::get("lists", uuid)).await?;
//!     println!("{outcome:?}");
//!
//!     service.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom routes
//!
//! New collections or operations are added by composing existing stages:
//!
//! ```ignore
//! let registry = Arc::new(CollectionRegistry::new().with(CollectionSpec::new("pictures").with_uuid_index()));
//! let store = Arc::new(DocumentStore::new(InMemoryStore::new(), registry.clone()));
//!
//! let router = PipelineRouter::builder(registry)
//!     .route(
//!         "pictures",
//!         Operation::GetById,
//!         Chain::new()
//!             .then(ValidatePathUuid)
//!             .then(FetchByUuid::new(store.clone()))
//!             .then(RequireFound)
//!             .then(ReturnDocuments),
//!     )
//!     .build()?;
//!
//! let service = DocumentStoreService::new(store, router);
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)

pub mod config;
pub mod prelude;
pub mod routes;
pub mod service;

pub use docstore_core::{
    backend, classify, collection, content, document, error, pipeline, query, store, transform, validate,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docstore_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docstore_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
