//! The document store service: a bootstrapped store plus its router.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use docstore_core::{
    backend::{DynStoreBackend, StoreBackendBuilder},
    classify::{ErrorClassifier, ErrorDescriptor},
    collection::CollectionRegistry,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Context, Operation, Outcome, PipelineRouter, QueryParams},
    store::DocumentStore,
    transform::{ApiUriResolver, BodyTransformer},
};
use docstore_memory::InMemoryStore;

use crate::{
    config::{DocumentStoreConfig, StoreConfig},
    routes::default_router,
};

/// An inbound operation as handed over by a transport.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub collection: String,
    pub operation: Operation,
    pub path_id: Option<String>,
    pub params: QueryParams,
    /// The JSON body of an `Add`.
    pub body: Option<Value>,
}

impl OperationRequest {
    pub fn new(collection: impl Into<String>, operation: Operation) -> Self {
        Self {
            collection: collection.into(),
            operation,
            path_id: None,
            params: QueryParams::new(),
            body: None,
        }
    }

    pub fn get(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(collection, Operation::GetById).with_path_id(id)
    }

    pub fn filter(collection: impl Into<String>, params: QueryParams) -> Self {
        Self::new(collection, Operation::GetFiltered).with_params(params)
    }

    pub fn add(collection: impl Into<String>, id: impl Into<String>, body: Value) -> Self {
        Self::new(collection, Operation::Add).with_path_id(id).with_body(body)
    }

    pub fn remove(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(collection, Operation::Remove).with_path_id(id)
    }

    pub fn with_path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn into_context(self) -> DocumentStoreResult<Context> {
        let mut context = Context::new(self.collection, self.operation).with_params(self.params);
        context.path_id = self.path_id;
        context.body = self.body.map(Document::from_json).transpose()?;
        Ok(context)
    }
}

/// Dispatches operation requests through a [`PipelineRouter`] and classifies failures.
#[derive(Debug)]
pub struct DocumentStoreService {
    store: Arc<DocumentStore>,
    router: PipelineRouter,
}

impl DocumentStoreService {
    /// Assembles a service from an existing store and router.
    pub fn new(store: Arc<DocumentStore>, router: PipelineRouter) -> Self {
        Self { store, router }
    }

    /// Bootstraps the configured backend with the default collections and routes.
    pub async fn from_config(config: &DocumentStoreConfig) -> DocumentStoreResult<Self> {
        Self::from_config_with_transformer(config, None).await
    }

    /// As [`DocumentStoreService::from_config`], passing content bodies through `transformer`
    /// on the way out.
    pub async fn from_config_with_transformer(
        config: &DocumentStoreConfig,
        transformer: Option<Arc<dyn BodyTransformer>>,
    ) -> DocumentStoreResult<Self> {
        let registry = Arc::new(CollectionRegistry::defaults());
        let backend = build_backend(&config.store).await?;
        let store = Arc::new(DocumentStore::from_boxed(backend, registry.clone()));

        if config.apply_indexes_on_startup {
            store.apply_indexes(registry.names()).await?;
        }

        let resolver = Arc::new(ApiUriResolver::new(config.api_host.clone()));
        let router = default_router(store.clone(), resolver, transformer)?;

        info!(
            backend = config.store.kind(),
            api_host = %config.api_host,
            collections = ?registry.names().collect::<Vec<_>>(),
            "document store service ready"
        );

        Ok(Self::new(store, router))
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    pub fn router(&self) -> &PipelineRouter {
        &self.router
    }

    /// Runs one request through its chain.
    ///
    /// Every failure, including an unparseable body, comes back classified.
    pub async fn handle(&self, request: OperationRequest) -> Result<Outcome, ErrorDescriptor> {
        let result = match request.into_context() {
            Ok(context) => self.router.execute(context).await,
            Err(err) => Err(err),
        };

        result.map_err(|err| ErrorClassifier::classify(&err))
    }

    /// Shuts down the backend.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Unknown`] if the store is still shared outside the service.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        drop(self.router);

        match Arc::try_unwrap(self.store) {
            Ok(store) => store.shutdown().await,
            Err(_) => Err(DocumentStoreError::Unknown(
                "document store is still in use and cannot be shut down".to_string(),
            )),
        }
    }
}

async fn build_backend(config: &StoreConfig) -> DocumentStoreResult<Box<dyn DynStoreBackend>> {
    let backend: Box<dyn DynStoreBackend> = match config {
        StoreConfig::Memory => Box::new(InMemoryStore::builder().build().await?),
        #[cfg(feature = "mongodb")]
        StoreConfig::Mongodb { dsn, database } => Box::new(
            docstore_mongodb::MongoDbStore::builder(dsn, database)
                .build()
                .await?,
        ),
        #[cfg(not(feature = "mongodb"))]
        StoreConfig::Mongodb { .. } => {
            return Err(DocumentStoreError::Initialization(
                "the mongodb backend requires the `mongodb` feature".to_string(),
            ));
        }
    };

    Ok(backend)
}
