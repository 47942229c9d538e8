use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    collection::CollectionRegistry,
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Chain, Context, Operation, Outcome},
};

/// Dispatch table from `(collection, operation)` to a [`Chain`].
///
/// The table is fixed once built and can be shared freely between concurrent requests.
#[derive(Debug, Clone)]
pub struct PipelineRouter {
    registry: Arc<CollectionRegistry>,
    chains: HashMap<(String, Operation), Chain>,
}

impl PipelineRouter {
    /// Creates a builder whose routes are checked against `registry`.
    pub fn builder(registry: Arc<CollectionRegistry>) -> PipelineRouterBuilder {
        PipelineRouterBuilder { registry, chains: HashMap::new() }
    }

    /// Finds the chain for `collection` and `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] for an unregistered collection and
    /// [`DocumentStoreError::NotRegistered`] when the collection has no chain for the
    /// operation.
    pub fn resolve(&self, collection: &str, operation: Operation) -> DocumentStoreResult<&Chain> {
        self.registry.require(collection)?;

        self.chains
            .get(&(collection.to_string(), operation))
            .ok_or_else(|| {
                DocumentStoreError::NotRegistered(collection.to_string(), operation.to_string())
            })
    }

    /// Resolves and runs the chain for the context's collection and operation.
    pub async fn execute(&self, mut context: Context) -> DocumentStoreResult<Outcome> {
        let chain = self.resolve(&context.collection, context.operation)?;

        debug!(
            collection = %context.collection,
            operation = %context.operation,
            stages = chain.len(),
            "dispatching request"
        );

        chain.execute(&mut context).await
    }

    /// Whether a chain is registered for the pair.
    pub fn is_routed(&self, collection: &str, operation: Operation) -> bool {
        self.chains.contains_key(&(collection.to_string(), operation))
    }
}

/// Builder for [`PipelineRouter`].
#[derive(Debug)]
pub struct PipelineRouterBuilder {
    registry: Arc<CollectionRegistry>,
    chains: HashMap<(String, Operation), Chain>,
}

impl PipelineRouterBuilder {
    /// Registers `chain` for the pair, replacing any earlier registration.
    pub fn route(mut self, collection: impl Into<String>, operation: Operation, chain: Chain) -> Self {
        self.chains.insert((collection.into(), operation), chain);
        self
    }

    /// Builds the router.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if a route names an unregistered
    /// collection or has no stages.
    pub fn build(self) -> DocumentStoreResult<PipelineRouter> {
        for ((collection, operation), chain) in &self.chains {
            if !self.registry.contains(collection) {
                return Err(DocumentStoreError::Initialization(format!(
                    "route {operation} targets unregistered collection {collection}"
                )));
            }
            if chain.is_empty() {
                return Err(DocumentStoreError::Initialization(format!(
                    "route {operation} on {collection} has no stages"
                )));
            }
        }

        Ok(PipelineRouter { registry: self.registry, chains: self.chains })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bson::doc;

    use super::*;
    use crate::{
        collection::CollectionSpec,
        pipeline::{Flow, Stage},
    };

    #[derive(Debug, Default)]
    struct Count(AtomicUsize);

    #[async_trait]
    impl Stage for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn run(&self, _: &mut Context) -> DocumentStoreResult<Flow> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Continue)
        }
    }

    #[derive(Debug)]
    struct Answer;

    #[async_trait]
    impl Stage for Answer {
        fn name(&self) -> &'static str {
            "answer"
        }

        async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
            Ok(Flow::Terminate(Outcome::Document(doc! { "collection": context.collection.clone() })))
        }
    }

    #[derive(Debug)]
    struct Fail;

    #[async_trait]
    impl Stage for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        async fn run(&self, _: &mut Context) -> DocumentStoreResult<Flow> {
            Err(DocumentStoreError::validation("rejected"))
        }
    }

    fn registry() -> Arc<CollectionRegistry> {
        Arc::new(
            CollectionRegistry::new()
                .with(CollectionSpec::new("lists"))
                .with(CollectionSpec::new("content")),
        )
    }

    #[tokio::test]
    async fn terminating_stage_skips_the_rest() {
        let counter = Arc::new(Count::default());
        let router = PipelineRouter::builder(registry())
            .route(
                "lists",
                Operation::GetById,
                Chain::new()
                    .then_shared(counter.clone())
                    .then(Answer)
                    .then_shared(counter.clone()),
            )
            .build()
            .unwrap();

        let outcome = router.execute(Context::new("lists", Operation::GetById)).await.unwrap();

        assert_eq!(outcome, Outcome::Document(doc! { "collection": "lists" }));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_stage_aborts_the_chain() {
        let counter = Arc::new(Count::default());
        let router = PipelineRouter::builder(registry())
            .route(
                "lists",
                Operation::Add,
                Chain::new().then(Fail).then_shared(counter.clone()).then(Answer),
            )
            .build()
            .unwrap();

        let err = router.execute(Context::new("lists", Operation::Add)).await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::Validation(message) if message == "rejected"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_collection_and_operation_are_not_found() {
        let router = PipelineRouter::builder(registry())
            .route("lists", Operation::GetById, Chain::new().then(Answer))
            .build()
            .unwrap();

        let err = router.execute(Context::new("pictures", Operation::GetById)).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::CollectionNotFound(_)));

        let err = router.execute(Context::new("content", Operation::GetById)).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotRegistered(collection, operation)
            if collection == "content" && operation == "GetById"));
        assert!(!router.is_routed("lists", Operation::Remove));
    }

    #[tokio::test]
    async fn chain_without_outcome_is_an_internal_error() {
        let router = PipelineRouter::builder(registry())
            .route("lists", Operation::Remove, Chain::new().then(Count::default()))
            .build()
            .unwrap();

        let err = router.execute(Context::new("lists", Operation::Remove)).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::Unknown(_)));
    }

    #[test]
    fn build_rejects_routes_outside_the_registry() {
        let err = PipelineRouter::builder(registry())
            .route("pictures", Operation::GetById, Chain::new().then(Answer))
            .build()
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::Initialization(_)));

        let err = PipelineRouter::builder(registry())
            .route("lists", Operation::GetById, Chain::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::Initialization(_)));
    }
}
