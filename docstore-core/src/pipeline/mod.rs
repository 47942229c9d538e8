//! Declarative request pipelines.
//!
//! A [`PipelineRouter`] maps each `(collection, operation)` pair to a [`Chain`] of
//! [`Stage`]s. Adding a collection or an operation means composing existing stages into a
//! new route; neither the stages nor the dispatch logic change.
//!
//! ```ignore
//! let validate = Arc::new(ValidatePathUuid) as Arc<dyn Stage>;
//!
//! let router = PipelineRouter::builder(registry)
//!     .route(
//!         "lists",
//!         Operation::GetById,
//!         Chain::new()
//!             .then_shared(validate.clone())
//!             .then(FetchByUuid::new(store.clone()))
//!             .then(RequireFound)
//!             .then(ReturnDocuments),
//!     )
//!     .build()?;
//!
//! let outcome = router
//!     .execute(Context::new("lists", Operation::GetById).with_path_id(id))
//!     .await?;
//! ```

use std::fmt;

mod context;
mod router;
mod stage;
pub mod stages;

pub use context::{Context, Flow, Outcome, QueryParams};
pub use router::{PipelineRouter, PipelineRouterBuilder};
pub use stage::{Chain, Stage};

/// The operation kinds a chain can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read one document by path uuid.
    GetById,
    /// Read documents selected by query parameters.
    GetFiltered,
    /// Create or replace a document under the path uuid.
    Add,
    /// Delete the document with the path uuid.
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetById => "GetById",
            Operation::GetFiltered => "GetFiltered",
            Operation::Add => "Add",
            Operation::Remove => "Remove",
        };
        f.write_str(name)
    }
}
