//! In-memory document storage backend for the document store.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion order** - Query results come back in the order documents were first written
//! - **Full query support** - Equality, case-insensitive substring, membership and
//!   element matching over dotted paths
//!
//! # Quick Start
//!
//! ```ignore
//! use docstore::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend, Arc::new(CollectionRegistry::defaults()));
//!
//!     let written = store
//!         .write("lists", doc! { "uuid": Uuid::new_v4().to_string(), "title": "Top", "items": [] })
//!         .await?;
//!     assert!(written.is_created());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docstore_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
