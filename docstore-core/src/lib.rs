//! Core of the document store access layer: a uniform CRUD-and-query facade over named
//! collections of schemaless, uuid-keyed documents.
//!
//! This crate provides:
//!
//! - **Document model** ([`document`]) - Schemaless documents, persisted field names and write results
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query expressions** ([`query`]) - The small filter language backends evaluate or translate
//! - **Collections** ([`collection`]) - The collection registry and per-collection query semantics
//! - **Content read model** ([`content`]) - The public shape of stored content
//! - **Persistence engine** ([`store`]) - The runtime-dispatched document store
//! - **Validators** ([`validate`]) - Canonical uuid and document shape checks
//! - **Pipelines** ([`pipeline`]) - Stages, chains and the `(collection, operation)` router
//! - **Body transforms** ([`transform`]) - The link-rewriting collaborator boundary
//! - **Error handling** ([`error`], [`classify`]) - Internal errors and the external failure taxonomy
//!
//! # Example
//!
//! ```ignore
//! use docstore_core::{collection::CollectionRegistry, store::DocumentStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(backend, Arc::new(CollectionRegistry::defaults()));
//! store.apply_indexes(["content", "lists", "generic-lists"]).await?;
//!
//! let result = store.write("lists", doc! { "uuid": uuid.to_string(), "title": "Top", "items": [] }).await?;
//! ```

pub mod backend;
pub mod classify;
pub mod collection;
pub mod content;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod transform;
pub mod validate;
