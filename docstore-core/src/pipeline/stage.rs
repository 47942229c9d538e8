use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use tracing::trace;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Context, Flow, Outcome},
};

/// A single-purpose unit of request processing.
///
/// Stages hold no per-request state, so one instance may be shared by any number of chains
/// and concurrent requests. A stage either enriches the context and returns
/// [`Flow::Continue`], ends the chain with [`Flow::Terminate`], or fails.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow>;
}

/// An ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    stages: Vec<Arc<dyn Stage>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn then<S: Stage + 'static>(self, stage: S) -> Self {
        self.then_shared(Arc::new(stage))
    }

    /// Appends a stage instance that other chains may also hold.
    pub fn then_shared(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the stages in order until one terminates or fails.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure, or [`DocumentStoreError::Unknown`] if every stage
    /// continued without producing an outcome.
    pub async fn execute(&self, context: &mut Context) -> DocumentStoreResult<Outcome> {
        for stage in &self.stages {
            trace!(stage = stage.name(), collection = %context.collection, "running stage");

            if let Flow::Terminate(outcome) = stage.run(context).await? {
                return Ok(outcome);
            }
        }

        Err(DocumentStoreError::Unknown(format!(
            "chain for {} on {} ended without an outcome",
            context.operation, context.collection
        )))
    }
}
