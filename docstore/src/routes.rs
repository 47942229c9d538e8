//! The default route table for `content`, `lists` and `generic-lists`.
//!
//! | Collection      | GetById                 | GetFiltered            | Add                  | Remove                  |
//! |-----------------|-------------------------|------------------------|----------------------|-------------------------|
//! | `content`       | fetch, 404, read model, rewrite body | batch by `uuid` params, read model | content shape, upsert | idempotent |
//! | `lists`         | fetch, 404, decorate    | list filter, decorate  | list shape, upsert   | 404 when missing        |
//! | `generic-lists` | as `lists`              | as `lists`             | as `lists`           | as `lists`              |

use std::sync::Arc;

use docstore_core::{
    collection::{CONTENT, GENERIC_LISTS, LISTS},
    error::DocumentStoreResult,
    pipeline::{
        Chain, Operation, PipelineRouter, Stage,
        stages::{
            ApplyDeletePolicy, DecorateContent, DecorateLists, DeleteDocument, DeletePolicy, FetchByUuid,
            FetchByUuids, FilterLists, LogWrite, ParseListFilter, ParseUuidParams, RequireFound,
            ReturnDocuments, ReturnWriteResult, RewriteBody, ValidateBody, ValidatePathUuid,
            WriteDocument,
        },
    },
    store::DocumentStore,
    transform::{BodyTransformer, UriResolver},
    validate::{ContentDocumentValidator, ListDocumentValidator},
};

/// Builds the default router over `store`.
///
/// Content reads answer with the content read model. When a `transformer` is given, its
/// `bodyXML` is passed through it.
pub fn default_router(
    store: Arc<DocumentStore>,
    resolver: Arc<dyn UriResolver>,
    transformer: Option<Arc<dyn BodyTransformer>>,
) -> DocumentStoreResult<PipelineRouter> {
    let stages = SharedStages::new(store.clone(), resolver.clone());

    let mut router = PipelineRouter::builder(store.registry().clone());

    let rewrite = transformer.map(|transformer| {
        Arc::new(RewriteBody::new(transformer, resolver.clone())) as Arc<dyn Stage>
    });
    let decorate_content = Arc::new(DecorateContent::new(resolver.clone())) as Arc<dyn Stage>;
    let read_model = |chain: Chain| {
        let chain = chain.then_shared(decorate_content.clone());
        match &rewrite {
            Some(rewrite) => chain.then_shared(rewrite.clone()),
            None => chain,
        }
    };

    router = router
        .route(
            CONTENT,
            Operation::GetById,
            read_model(stages.fetch_one()).then_shared(stages.return_documents.clone()),
        )
        .route(
            CONTENT,
            Operation::GetFiltered,
            read_model(
                Chain::new()
                    .then(ParseUuidParams)
                    .then(FetchByUuids::new(store.clone())),
            )
            .then_shared(stages.return_documents.clone()),
        )
        .route(
            CONTENT,
            Operation::Add,
            stages.write(Arc::new(ValidateBody::new(ContentDocumentValidator))),
        )
        .route(CONTENT, Operation::Remove, stages.remove(DeletePolicy::Idempotent));

    let list_body = Arc::new(ValidateBody::new(ListDocumentValidator)) as Arc<dyn Stage>;
    for collection in [LISTS, GENERIC_LISTS] {
        router = router
            .route(
                collection,
                Operation::GetById,
                stages
                    .fetch_one()
                    .then_shared(stages.decorate.clone())
                    .then_shared(stages.return_documents.clone()),
            )
            .route(
                collection,
                Operation::GetFiltered,
                Chain::new()
                    .then(ParseListFilter)
                    .then(FilterLists::new(store.clone()))
                    .then_shared(stages.decorate.clone())
                    .then_shared(stages.return_documents.clone()),
            )
            .route(collection, Operation::Add, stages.write(list_body.clone()))
            .route(collection, Operation::Remove, stages.remove(DeletePolicy::ReportNotFound));
    }

    router.build()
}

/// Stage instances reused across chains.
struct SharedStages {
    store: Arc<DocumentStore>,
    validate_uuid: Arc<dyn Stage>,
    fetch_by_uuid: Arc<dyn Stage>,
    require_found: Arc<dyn Stage>,
    decorate: Arc<dyn Stage>,
    return_documents: Arc<dyn Stage>,
    log_write: Arc<dyn Stage>,
    write_document: Arc<dyn Stage>,
    return_write_result: Arc<dyn Stage>,
}

impl SharedStages {
    fn new(store: Arc<DocumentStore>, resolver: Arc<dyn UriResolver>) -> Self {
        Self {
            validate_uuid: Arc::new(ValidatePathUuid),
            fetch_by_uuid: Arc::new(FetchByUuid::new(store.clone())),
            require_found: Arc::new(RequireFound),
            decorate: Arc::new(DecorateLists::new(resolver)),
            return_documents: Arc::new(ReturnDocuments),
            log_write: Arc::new(LogWrite),
            write_document: Arc::new(WriteDocument::new(store.clone())),
            return_write_result: Arc::new(ReturnWriteResult),
            store,
        }
    }

    /// Validate the path uuid, fetch it, fail when absent.
    fn fetch_one(&self) -> Chain {
        Chain::new()
            .then_shared(self.validate_uuid.clone())
            .then_shared(self.fetch_by_uuid.clone())
            .then_shared(self.require_found.clone())
    }

    fn write(&self, validate_body: Arc<dyn Stage>) -> Chain {
        Chain::new()
            .then_shared(self.validate_uuid.clone())
            .then_shared(validate_body)
            .then_shared(self.log_write.clone())
            .then_shared(self.write_document.clone())
            .then_shared(self.return_write_result.clone())
    }

    fn remove(&self, policy: DeletePolicy) -> Chain {
        Chain::new()
            .then_shared(self.validate_uuid.clone())
            .then(DeleteDocument::new(self.store.clone()))
            .then(ApplyDeletePolicy(policy))
    }
}
