//! Convenient re-exports of commonly used types.
//!
//! ```ignore
//! use docstore::prelude::*;
//! ```
//!
//! This provides access to:
//! - The document model and write results
//! - Store backends and builders
//! - Collections, the registry and the persistence engine
//! - Pipelines, stages and the router
//! - Validators, error types and the failure classifier
//! - The service, its configuration and request type

pub use docstore_core::{
    backend::{DynStoreBackend, IndexSpec, ReplaceOutcome, StoreBackend, StoreBackendBuilder},
    classify::{ErrorClassifier, ErrorDescriptor, FailureKind},
    collection::{Collection, CollectionRegistry, CollectionSpec, ListFilter},
    content::{ContentMapper, ContentType},
    document::{Document, DocumentExt, WriteResult},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{
        Chain, Context, Flow, Operation, Outcome, PipelineRouter, PipelineRouterBuilder,
        QueryParams, Stage,
        stages::{
            ApplyDeletePolicy, DecorateContent, DecorateLists, DeleteDocument, DeletePolicy, FetchByUuid,
            FetchByUuids, FilterLists, LogWrite, ParseListFilter, ParseUuidParams, RequireFound,
            ReturnDocuments, ReturnWriteResult, RewriteBody, ValidateBody, ValidatePathUuid,
            WriteDocument,
        },
    },
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor},
    store::DocumentStore,
    transform::{ApiUriResolver, BodyTransformer, UriResolver},
    validate::{ContentDocumentValidator, DocumentValidator, ListDocumentValidator, UuidValidator},
};

pub use docstore_memory::InMemoryStore;

pub use crate::{
    config::{DocumentStoreConfig, StoreConfig},
    service::{DocumentStoreService, OperationRequest},
};
