//! The stage library that chains are composed from.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bson::Bson;
use tracing::{debug, info};

use crate::{
    collection::ListFilter,
    content::ContentMapper,
    document::{Document, DocumentExt, fields},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Context, Flow, Operation, Outcome, Stage},
    store::DocumentStore,
    transform::{BodyTransformer, UriResolver},
    validate::{DocumentValidator, UuidValidator},
};

/// Prefix of the public `id` given to outbound lists and list items.
pub const THING_URI_PREFIX: &str = "http://api.ft.com/thing/";

/// Query parameter carrying one uuid of a batch read. May repeat.
pub const UUID_PARAM: &str = "uuid";
/// Query parameter filtering lists by concept.
pub const CONCEPT_UUID_PARAM: &str = "conceptUUID";
/// Query parameter filtering lists by list type.
pub const LIST_TYPE_PARAM: &str = "listType";
/// Query parameter filtering lists by a title substring.
pub const SEARCH_TERM_PARAM: &str = "searchTerm";

/// Validates the path id as a canonical uuid and records it in the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatePathUuid;

#[async_trait]
impl Stage for ValidatePathUuid {
    fn name(&self) -> &'static str {
        "validate_path_uuid"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let candidate = context.path_id.as_deref().unwrap_or_default();
        context.uuid = Some(UuidValidator::validate(candidate)?);
        Ok(Flow::Continue)
    }
}

/// Runs a collection-specific document validator over the inbound body.
#[derive(Debug, Clone)]
pub struct ValidateBody {
    validator: Arc<dyn DocumentValidator>,
}

impl ValidateBody {
    pub fn new<V: DocumentValidator + 'static>(validator: V) -> Self {
        Self { validator: Arc::new(validator) }
    }
}

#[async_trait]
impl Stage for ValidateBody {
    fn name(&self) -> &'static str {
        "validate_body"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let path_uuid = context.path_id.as_deref().unwrap_or_default();
        self.validator.validate(path_uuid, context.body.as_ref())?;
        Ok(Flow::Continue)
    }
}

/// Emits the write-audit event for the inbound body.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWrite;

#[async_trait]
impl Stage for LogWrite {
    fn name(&self) -> &'static str {
        "log_write"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let body = context
            .body
            .as_ref()
            .map(|body| body.to_json().map(|json| json.to_string()))
            .transpose()?
            .unwrap_or_default();

        info!(
            event = "SaveDocStore",
            monitoring_event = true,
            collection = %context.collection,
            uuid = %context.requested_id(),
            body = %body,
            "saving document"
        );

        Ok(Flow::Continue)
    }
}

/// Fetches the document with the validated path uuid, if any.
#[derive(Debug, Clone)]
pub struct FetchByUuid {
    store: Arc<DocumentStore>,
}

impl FetchByUuid {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for FetchByUuid {
    fn name(&self) -> &'static str {
        "fetch_by_uuid"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let uuid = context.require_uuid()?;
        if let Some(document) = self.store.find_by_uuid(&context.collection, &uuid).await? {
            context.documents.push(document);
        }
        Ok(Flow::Continue)
    }
}

/// Fails with a not-found error when nothing has been fetched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireFound;

#[async_trait]
impl Stage for RequireFound {
    fn name(&self) -> &'static str {
        "require_found"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        if context.documents.is_empty() {
            return Err(DocumentStoreError::DocumentNotFound(
                context.requested_id(),
                context.collection.clone(),
            ));
        }
        Ok(Flow::Continue)
    }
}

/// Validates every `uuid` query parameter.
///
/// Repeated values are kept once, in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseUuidParams;

#[async_trait]
impl Stage for ParseUuidParams {
    fn name(&self) -> &'static str {
        "parse_uuid_params"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let mut uuids = Vec::new();
        for candidate in context.params.get_all(UUID_PARAM) {
            let uuid = UuidValidator::validate(candidate)?;
            if !uuids.contains(&uuid) {
                uuids.push(uuid);
            }
        }
        context.uuids = uuids;
        Ok(Flow::Continue)
    }
}

/// Fetches the existing subset of the validated `uuid` parameters.
#[derive(Debug, Clone)]
pub struct FetchByUuids {
    store: Arc<DocumentStore>,
}

impl FetchByUuids {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for FetchByUuids {
    fn name(&self) -> &'static str {
        "fetch_by_uuids"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        context.documents = self
            .store
            .find_by_uuids(&context.collection, &context.uuids)
            .await?;
        Ok(Flow::Continue)
    }
}

/// Builds a [`ListFilter`] from the `conceptUUID`, `listType` and `searchTerm` parameters.
///
/// Empty values count as absent. A present `conceptUUID` must be a canonical uuid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseListFilter;

#[async_trait]
impl Stage for ParseListFilter {
    fn name(&self) -> &'static str {
        "parse_list_filter"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let params = &context.params;

        let concept_uuid = params
            .first(CONCEPT_UUID_PARAM)
            .map(UuidValidator::validate)
            .transpose()?
            .map(|uuid| uuid.to_string());

        let filter = ListFilter {
            concept_uuid,
            list_type: params.first(LIST_TYPE_PARAM).map(str::to_string),
            search_term: params.first(SEARCH_TERM_PARAM).map(str::to_string),
        };

        debug!(collection = %context.collection, ?filter, "parsed list filter");
        context.list_filter = Some(filter);
        Ok(Flow::Continue)
    }
}

/// Fetches the lists matching the parsed filter.
#[derive(Debug, Clone)]
pub struct FilterLists {
    store: Arc<DocumentStore>,
}

impl FilterLists {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for FilterLists {
    fn name(&self) -> &'static str {
        "filter_lists"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let filter = context.list_filter.clone().unwrap_or_default();
        context.documents = self.store.filter_lists(&context.collection, &filter).await?;
        Ok(Flow::Continue)
    }
}

/// Adds public `id` and `apiUrl` fields to fetched lists and to their items.
///
/// A list gets `apiUrl` under its own collection path; an item that carries a uuid gets
/// one under `/content`. Items identified only by `webUrl` are left untouched.
#[derive(Debug, Clone)]
pub struct DecorateLists {
    resolver: Arc<dyn UriResolver>,
}

impl DecorateLists {
    pub fn new(resolver: Arc<dyn UriResolver>) -> Self {
        Self { resolver }
    }

    fn decorate(&self, collection: &str, mut list: Document) -> Document {
        if let Some(uuid) = list.uuid().map(str::to_string) {
            list.insert(fields::ID, format!("{THING_URI_PREFIX}{uuid}"));
            list.insert(fields::API_URL, self.resolver.resolve(&format!("/{collection}/{uuid}")));
        }

        if let Some(Bson::Array(items)) = list.get_mut(fields::ITEMS) {
            for item in items.iter_mut() {
                let Bson::Document(item) = item else { continue };
                let Some(uuid) = item.non_empty_str(fields::UUID).map(str::to_string) else {
                    continue;
                };
                item.insert(fields::ID, format!("{THING_URI_PREFIX}{uuid}"));
                item.insert(fields::API_URL, self.resolver.resolve(&format!("/content/{uuid}")));
            }
        }

        list
    }
}

#[async_trait]
impl Stage for DecorateLists {
    fn name(&self) -> &'static str {
        "decorate_lists"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let documents = std::mem::take(&mut context.documents);
        context.documents = documents
            .into_iter()
            .map(|list| self.decorate(&context.collection, list))
            .collect();
        Ok(Flow::Continue)
    }
}

/// Replaces every fetched content document with its read model.
#[derive(Debug, Clone)]
pub struct DecorateContent {
    mapper: ContentMapper,
}

impl DecorateContent {
    pub fn new(resolver: Arc<dyn UriResolver>) -> Self {
        Self { mapper: ContentMapper::new(resolver) }
    }
}

#[async_trait]
impl Stage for DecorateContent {
    fn name(&self) -> &'static str {
        "decorate_content"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        context.documents = context
            .documents
            .iter()
            .map(|content| self.mapper.map(content))
            .collect();
        Ok(Flow::Continue)
    }
}

/// Applies the body transformer to the `bodyXML` field of every fetched document.
#[derive(Clone)]
pub struct RewriteBody {
    transformer: Arc<dyn BodyTransformer>,
    resolver: Arc<dyn UriResolver>,
}

impl RewriteBody {
    pub fn new(transformer: Arc<dyn BodyTransformer>, resolver: Arc<dyn UriResolver>) -> Self {
        Self { transformer, resolver }
    }
}

impl fmt::Debug for RewriteBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteBody")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for RewriteBody {
    fn name(&self) -> &'static str {
        "rewrite_body"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        for document in &mut context.documents {
            let Some(body) = document.get_str(fields::BODY_XML).ok() else {
                continue;
            };
            let rewritten = self.transformer.transform(body, self.resolver.as_ref())?;
            document.insert(fields::BODY_XML, rewritten);
        }
        Ok(Flow::Continue)
    }
}

/// Ends a read chain with the fetched documents.
///
/// A [`Operation::GetById`] chain answers with a single document, every other chain with
/// the full sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnDocuments;

#[async_trait]
impl Stage for ReturnDocuments {
    fn name(&self) -> &'static str {
        "return_documents"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let documents = std::mem::take(&mut context.documents);

        if context.operation != Operation::GetById {
            return Ok(Flow::Terminate(Outcome::Documents(documents)));
        }

        documents
            .into_iter()
            .next()
            .map(|document| Flow::Terminate(Outcome::Document(document)))
            .ok_or_else(|| {
                DocumentStoreError::DocumentNotFound(context.requested_id(), context.collection.clone())
            })
    }
}

/// Upserts the inbound body.
#[derive(Debug, Clone)]
pub struct WriteDocument {
    store: Arc<DocumentStore>,
}

impl WriteDocument {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for WriteDocument {
    fn name(&self) -> &'static str {
        "write_document"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let body = context
            .body
            .clone()
            .ok_or_else(|| DocumentStoreError::validation("document must be provided in request body"))?;

        let result = self.store.write(&context.collection, body).await?;
        debug!(
            collection = %context.collection,
            uuid = result.document().uuid().unwrap_or_default(),
            created = result.is_created(),
            "document written"
        );
        context.write_result = Some(result);
        Ok(Flow::Continue)
    }
}

/// Ends a write chain with the write result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnWriteResult;

#[async_trait]
impl Stage for ReturnWriteResult {
    fn name(&self) -> &'static str {
        "return_write_result"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        context
            .write_result
            .take()
            .map(|result| Flow::Terminate(Outcome::Written(result)))
            .ok_or_else(|| DocumentStoreError::Unknown("no write result in context".to_string()))
    }
}

/// Deletes the document with the validated path uuid and records whether it existed.
#[derive(Debug, Clone)]
pub struct DeleteDocument {
    store: Arc<DocumentStore>,
}

impl DeleteDocument {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Stage for DeleteDocument {
    fn name(&self) -> &'static str {
        "delete_document"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        let uuid = context.require_uuid()?;

        context.deleted = match self.store.delete(&context.collection, &uuid).await {
            Ok(()) => Some(true),
            Err(DocumentStoreError::DocumentNotFound(..)) => Some(false),
            Err(err) => return Err(err),
        };
        Ok(Flow::Continue)
    }
}

/// How a delete of a missing document is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Treat it as a successful delete.
    Idempotent,
    /// Report it as not found.
    ReportNotFound,
}

/// Ends a delete chain according to a [`DeletePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct ApplyDeletePolicy(pub DeletePolicy);

#[async_trait]
impl Stage for ApplyDeletePolicy {
    fn name(&self) -> &'static str {
        "apply_delete_policy"
    }

    async fn run(&self, context: &mut Context) -> DocumentStoreResult<Flow> {
        match (context.deleted, self.0) {
            (Some(true), _) => Ok(Flow::Terminate(Outcome::Deleted { existed: true })),
            (Some(false), DeletePolicy::Idempotent) => {
                Ok(Flow::Terminate(Outcome::Deleted { existed: false }))
            }
            (Some(false), DeletePolicy::ReportNotFound) => Err(DocumentStoreError::DocumentNotFound(
                context.requested_id(),
                context.collection.clone(),
            )),
            (None, _) => Err(DocumentStoreError::Unknown("no delete result in context".to_string())),
        }
    }
}
