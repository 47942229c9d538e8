use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use docstore::prelude::*;
use docstore::routes::default_router;

fn config() -> DocumentStoreConfig {
    DocumentStoreConfig {
        api_host: "api.ft.com".to_string(),
        ..Default::default()
    }
}

async fn service() -> DocumentStoreService {
    DocumentStoreService::from_config(&config()).await.unwrap()
}

fn list_body(uuid: &str, title: &str) -> serde_json::Value {
    json!({
        "uuid": uuid,
        "title": title,
        "concept": { "uuid": "d8a4f1ce-57c4-4f36-8a0c-6e2c0a5b5e11" },
        "listType": "TopStories",
        "items": [
            { "uuid": "c3f1b0b4-5d8e-4a36-9d4c-0f6b1d2e3a4b" },
            { "webUrl": "http://www.ft.com/cms/s/0/x.html" },
        ],
    })
}

fn expect_document(outcome: Outcome) -> Document {
    match outcome {
        Outcome::Document(document) => document,
        other => panic!("expected a single document, got {other:?}"),
    }
}

fn expect_documents(outcome: Outcome) -> Vec<Document> {
    match outcome {
        Outcome::Documents(documents) => documents,
        other => panic!("expected documents, got {other:?}"),
    }
}

#[tokio::test]
async fn add_creates_then_updates() {
    let service = service().await;
    let uuid = Uuid::new_v4().to_string();

    let first = service
        .handle(OperationRequest::add("lists", &uuid, list_body(&uuid, "Top Stories")))
        .await
        .unwrap();
    assert!(matches!(first, Outcome::Written(WriteResult::Created(_))));

    let second = service
        .handle(OperationRequest::add("lists", &uuid, list_body(&uuid, "Renamed")))
        .await
        .unwrap();
    assert!(matches!(second, Outcome::Written(WriteResult::Updated(_))));

    let stored = expect_document(service.handle(OperationRequest::get("lists", &uuid)).await.unwrap());
    assert_eq!(stored.get_str("title").unwrap(), "Renamed");
}

#[tokio::test]
async fn lists_are_decorated_on_read() {
    let service = service().await;
    let uuid = Uuid::new_v4().to_string();
    service
        .handle(OperationRequest::add("lists", &uuid, list_body(&uuid, "Top Stories")))
        .await
        .unwrap();

    let list = expect_document(service.handle(OperationRequest::get("lists", &uuid)).await.unwrap());
    assert_eq!(list.get_str("id").unwrap(), format!("http://api.ft.com/thing/{uuid}"));
    assert_eq!(list.get_str("apiUrl").unwrap(), format!("http://api.ft.com/lists/{uuid}"));
    assert!(!list.contains_key("_id"));

    let items = list.get_array("items").unwrap();
    let first = items[0].as_document().unwrap();
    assert_eq!(
        first.get_str("apiUrl").unwrap(),
        "http://api.ft.com/content/c3f1b0b4-5d8e-4a36-9d4c-0f6b1d2e3a4b"
    );
    assert_eq!(
        first.get_str("id").unwrap(),
        "http://api.ft.com/thing/c3f1b0b4-5d8e-4a36-9d4c-0f6b1d2e3a4b"
    );
    let second = items[1].as_document().unwrap();
    assert!(!second.contains_key("apiUrl"));
}

#[tokio::test]
async fn generic_lists_resolve_under_their_own_path() {
    let service = service().await;
    let uuid = Uuid::new_v4().to_string();
    service
        .handle(OperationRequest::add("generic-lists", &uuid, list_body(&uuid, "Editors' picks")))
        .await
        .unwrap();

    let list = expect_document(
        service
            .handle(OperationRequest::get("generic-lists", &uuid))
            .await
            .unwrap(),
    );
    assert_eq!(
        list.get_str("apiUrl").unwrap(),
        format!("http://api.ft.com/generic-lists/{uuid}")
    );

    // collections do not share documents
    let missing = service.handle(OperationRequest::get("lists", &uuid)).await.unwrap_err();
    assert_eq!(missing.kind, FailureKind::NotFound);
}

#[tokio::test]
async fn validation_failures_keep_their_message() {
    let service = service().await;

    let err = service.handle(OperationRequest::get("content", "abc")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::ValidationFailure);
    assert_eq!(err.message, "invalid UUID: abc, does not conform to RFC 4122");
    assert!(err.kind.is_client_error());

    let uppercase = "550E8400-E29B-41D4-A716-446655440000";
    let err = service.handle(OperationRequest::get("content", uppercase)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::ValidationFailure);

    let path = "550e8400-e29b-41d4-a716-446655440000";
    let body_uuid = Uuid::new_v4().to_string();
    let err = service
        .handle(OperationRequest::add("lists", path, list_body(&body_uuid, "Mismatch")))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::ValidationFailure);
    assert_eq!(
        err.message,
        format!("uuid in path {path} is not equal to uuid in submitted list {body_uuid}")
    );

    let err = service
        .handle(OperationRequest::add("lists", path, json!({ "uuid": path, "title": "No items" })))
        .await
        .unwrap_err();
    assert_eq!(err.message, "submitted list should have an 'items' field");

    let err = service
        .handle(OperationRequest::new("content", Operation::Add).with_path_id(path))
        .await
        .unwrap_err();
    assert_eq!(err.message, "content must be provided in request body");
}

#[tokio::test]
async fn missing_documents_are_reported_as_not_found() {
    let service = service().await;

    let err = service
        .handle(OperationRequest::get("content", Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(err.message, "Requested item does not exist");
    assert!(!err.retryable);
}

#[tokio::test]
async fn delete_policies_differ_per_collection() {
    let service = service().await;
    let missing = Uuid::new_v4().to_string();

    let outcome = service
        .handle(OperationRequest::remove("content", &missing))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Deleted { existed: false });

    let err = service
        .handle(OperationRequest::remove("lists", &missing))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);

    let uuid = Uuid::new_v4().to_string();
    service
        .handle(OperationRequest::add("lists", &uuid, list_body(&uuid, "Doomed")))
        .await
        .unwrap();
    let outcome = service.handle(OperationRequest::remove("lists", &uuid)).await.unwrap();
    assert_eq!(outcome, Outcome::Deleted { existed: true });

    let err = service.handle(OperationRequest::get("lists", &uuid)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
}

#[tokio::test]
async fn content_batch_read_returns_the_existing_subset() {
    let service = service().await;
    let a = Uuid::new_v4().to_string();
    let b = Uuid::new_v4().to_string();

    for uuid in [&a, &b] {
        service
            .handle(OperationRequest::add("content", uuid, json!({ "uuid": uuid, "title": "Story" })))
            .await
            .unwrap();
    }

    let params: QueryParams = [
        ("uuid", a.clone()),
        ("uuid", Uuid::new_v4().to_string()),
        ("uuid", b.clone()),
        ("uuid", a.clone()),
    ]
    .into_iter()
    .collect();
    let documents = expect_documents(
        service
            .handle(OperationRequest::filter("content", params))
            .await
            .unwrap(),
    );

    let mut found: Vec<&str> = documents.iter().filter_map(|d| d.get_str("id").ok()).collect();
    found.sort_unstable();
    let mut expected = vec![format!("http://www.ft.com/thing/{a}"), format!("http://www.ft.com/thing/{b}")];
    expected.sort_unstable();
    assert_eq!(found, expected);

    let params: QueryParams = [("uuid", "nope")].into_iter().collect();
    let err = service
        .handle(OperationRequest::filter("content", params))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::ValidationFailure);
}

#[tokio::test]
async fn lists_filter_by_query_parameters() {
    let service = service().await;
    let concept = "d8a4f1ce-57c4-4f36-8a0c-6e2c0a5b5e11";

    let top = Uuid::new_v4().to_string();
    service
        .handle(OperationRequest::add("lists", &top, list_body(&top, "Top Stories")))
        .await
        .unwrap();

    let other = Uuid::new_v4().to_string();
    let mut body = list_body(&other, "Opinion");
    body["listType"] = json!("Opinion");
    service
        .handle(OperationRequest::add("lists", &other, body))
        .await
        .unwrap();

    let params: QueryParams = [("conceptUUID", concept), ("listType", "TopStories")]
        .into_iter()
        .collect();
    let lists = expect_documents(service.handle(OperationRequest::filter("lists", params)).await.unwrap());
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].uuid(), Some(top.as_str()));
    assert_eq!(lists[0].get_str("apiUrl").unwrap(), format!("http://api.ft.com/lists/{top}"));

    let params: QueryParams = [("searchTerm", "opin")].into_iter().collect();
    let lists = expect_documents(service.handle(OperationRequest::filter("lists", params)).await.unwrap());
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].uuid(), Some(other.as_str()));

    let lists = expect_documents(
        service
            .handle(OperationRequest::filter("lists", QueryParams::new()))
            .await
            .unwrap(),
    );
    assert_eq!(lists.len(), 2);

    let params: QueryParams = [("conceptUUID", "not-a-uuid")].into_iter().collect();
    let err = service.handle(OperationRequest::filter("lists", params)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::ValidationFailure);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let service = service().await;

    let err = service
        .handle(OperationRequest::get("pictures", Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);

    let registry = Arc::new(CollectionRegistry::new().with(CollectionSpec::new("pictures").with_uuid_index()));
    let store = Arc::new(DocumentStore::new(InMemoryStore::new(), registry.clone()));
    let router = PipelineRouter::builder(registry)
        .route(
            "pictures",
            Operation::GetById,
            Chain::new()
                .then(ValidatePathUuid)
                .then(FetchByUuid::new(store.clone()))
                .then(RequireFound)
                .then(ReturnDocuments),
        )
        .build()
        .unwrap();
    let service = DocumentStoreService::new(store, router);

    let uuid = Uuid::new_v4().to_string();
    let err = service
        .handle(OperationRequest::add("pictures", &uuid, json!({ "uuid": uuid })))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::NotFound);
    assert_eq!(err.message, "Requested item does not exist");
}

#[derive(Debug)]
struct UnreachableStore;

#[async_trait]
impl StoreBackend for UnreachableStore {
    async fn find_documents(&self, _: Query, _: &str) -> DocumentStoreResult<Vec<Document>> {
        Err(DocumentStoreError::Unavailable("server selection timeout".to_string()))
    }

    async fn replace_document(
        &self,
        _: Expr,
        _: Document,
        _: &str,
    ) -> DocumentStoreResult<ReplaceOutcome> {
        Err(DocumentStoreError::Unavailable("server selection timeout".to_string()))
    }

    async fn delete_document(&self, _: Expr, _: &str) -> DocumentStoreResult<u64> {
        Err(DocumentStoreError::Backend("write concern failed".to_string()))
    }

    async fn create_index(&self, _: &str, _: &IndexSpec) -> DocumentStoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn store_failures_are_classified() {
    let store = Arc::new(DocumentStore::new(
        UnreachableStore,
        Arc::new(CollectionRegistry::defaults()),
    ));
    let router = default_router(store.clone(), Arc::new(ApiUriResolver::new("api.ft.com")), None).unwrap();
    let service = DocumentStoreService::new(store, router);
    let uuid = Uuid::new_v4().to_string();

    let err = service.handle(OperationRequest::get("content", &uuid)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::ExternalSystemUnavailable);
    assert_eq!(err.message, "Service Unavailable");
    assert!(err.retryable);

    let err = service.handle(OperationRequest::remove("content", &uuid)).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::ExternalSystemInternal);
    assert_eq!(err.message, "Internal error communicating with external system");
    assert!(!err.retryable);
}

#[tokio::test]
async fn content_bodies_pass_through_the_transformer() {
    let transformer: Arc<dyn BodyTransformer> = Arc::new(
        |body: &str, resolver: &dyn UriResolver| -> DocumentStoreResult<String> {
            Ok(body.replace("{content}", &resolver.resolve("/content")))
        },
    );
    let service = DocumentStoreService::from_config_with_transformer(&config(), Some(transformer))
        .await
        .unwrap();
    let uuid = Uuid::new_v4().to_string();

    service
        .handle(OperationRequest::add(
            "content",
            &uuid,
            json!({ "uuid": uuid, "bodyXML": "<body><a href=\"{content}/x\"/></body>" }),
        ))
        .await
        .unwrap();

    let content = expect_document(service.handle(OperationRequest::get("content", &uuid)).await.unwrap());
    assert_eq!(
        content.get_str("bodyXML").unwrap(),
        "<body><a href=\"http://api.ft.com/content/x\"/></body>"
    );

    // the stored body is untouched
    let stored = service.store().find_by_uuid("content", &uuid.parse::<Uuid>().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.get_str("bodyXML").unwrap(), "<body><a href=\"{content}/x\"/></body>");
}

#[tokio::test]
async fn content_reads_answer_with_the_read_model() {
    let service = service().await;
    let uuid = Uuid::new_v4().to_string();
    let image = Uuid::new_v4().to_string();

    service
        .handle(OperationRequest::add(
            "content",
            &uuid,
            json!({
                "uuid": uuid,
                "title": "Philosopher",
                "body": "<body>Why did the chicken cross the street?</body>",
                "brands": [ { "id": "Lex" }, { "id": "Chuck Taylor" } ],
                "mainImage": image,
                "identifiers": [ { "authority": "authority1", "identifierValue": "identifier1" } ],
                "comments": { "enabled": true },
                "publishReference": "tid_1",
            }),
        ))
        .await
        .unwrap();

    let content = expect_document(service.handle(OperationRequest::get("content", &uuid)).await.unwrap());
    assert_eq!(content.get_str("id").unwrap(), format!("http://www.ft.com/thing/{uuid}"));
    assert_eq!(content.get_str("type").unwrap(), ContentType::Article.uri());
    assert_eq!(
        content.get_str("bodyXML").unwrap(),
        "<body>Why did the chicken cross the street?</body>"
    );
    assert_eq!(
        content.get_document("mainImage").unwrap().get_str("id").unwrap(),
        format!("http://api.ft.com/content/{image}")
    );
    assert_eq!(content.get_array("brands").unwrap().len(), 2);
    assert!(content.get_document("comments").unwrap().get_bool("enabled").unwrap());
    assert!(!content.contains_key("body"));

    let params: QueryParams = [("uuid", uuid.as_str())].into_iter().collect();
    let batch = expect_documents(service.handle(OperationRequest::filter("content", params)).await.unwrap());
    assert_eq!(batch, vec![content]);
}

#[tokio::test]
async fn default_routes_cover_every_operation() {
    let service = service().await;

    for collection in ["content", "lists", "generic-lists"] {
        for operation in [Operation::GetById, Operation::GetFiltered, Operation::Add, Operation::Remove] {
            assert!(service.router().is_routed(collection, operation), "{collection} {operation}");
        }
    }
}

#[cfg(not(feature = "mongodb"))]
#[tokio::test]
async fn mongodb_requires_its_feature() {
    let config = DocumentStoreConfig {
        store: StoreConfig::Mongodb {
            dsn: "mongodb://localhost:27017".to_string(),
            database: "upp-store".to_string(),
        },
        ..Default::default()
    };

    let result = DocumentStoreService::from_config(&config).await;
    assert!(matches!(result.err(), Some(DocumentStoreError::Initialization(_))));
}

#[tokio::test]
async fn shutdown_releases_the_store() {
    let service = service().await;
    service.shutdown().await.unwrap();
}
