//! Identifier and document validators.
//!
//! Validators are pure: they look at their input and either accept it or return a
//! [`DocumentStoreError::Validation`] whose message is shown to clients verbatim.

use bson::Bson;
use uuid::Uuid;

use crate::{
    document::{Document, DocumentExt, fields},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Strict canonical uuid validation.
///
/// A candidate is accepted only when it parses as a uuid and its canonical lowercase,
/// hyphenated rendering equals the input exactly. Upper case, braces, URNs and the simple
/// (unhyphenated) form are all rejected even though [`Uuid::parse_str`] accepts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidValidator;

impl UuidValidator {
    pub fn validate(candidate: &str) -> DocumentStoreResult<Uuid> {
        Uuid::parse_str(candidate)
            .ok()
            .filter(|parsed| parsed.hyphenated().to_string() == candidate)
            .ok_or_else(|| {
                DocumentStoreError::validation(format!(
                    "invalid UUID: {candidate}, does not conform to RFC 4122"
                ))
            })
    }
}

/// A collection-specific structural check run before a write reaches the store.
pub trait DocumentValidator: Send + Sync + std::fmt::Debug {
    /// Validates `document` submitted under `path_uuid`.
    ///
    /// `document` is `None` when the request carried no body.
    fn validate(&self, path_uuid: &str, document: Option<&Document>) -> DocumentStoreResult<()>;
}

/// Validates list documents.
///
/// Rules are checked in order and the first failure wins:
///
/// 1. a body is present
/// 2. `uuid` is a non-empty string
/// 3. `title` is a non-empty string
/// 4. `items` is present (it may be empty)
/// 5. every item has a non-empty `uuid` or a non-empty `webUrl`
/// 6. the path uuid equals the body uuid
#[derive(Debug, Clone, Copy, Default)]
pub struct ListDocumentValidator;

impl DocumentValidator for ListDocumentValidator {
    fn validate(&self, path_uuid: &str, document: Option<&Document>) -> DocumentStoreResult<()> {
        let document = document
            .ok_or_else(|| DocumentStoreError::validation("list must be provided in request body"))?;

        let uuid = document.non_empty_str(fields::UUID).ok_or_else(|| {
            DocumentStoreError::validation("submitted list must provide a non-empty uuid")
        })?;

        if document.non_empty_str(fields::TITLE).is_none() {
            return Err(DocumentStoreError::validation(
                "submitted list must provide a non-empty title",
            ));
        }

        let Some(Bson::Array(items)) = document.get(fields::ITEMS) else {
            return Err(DocumentStoreError::validation(
                "submitted list should have an 'items' field",
            ));
        };

        if !items.iter().all(is_identifiable_item) {
            return Err(DocumentStoreError::validation(
                "list items must have a non-empty uuid or a non-empty webUrl",
            ));
        }

        require_same_uuid(path_uuid, uuid, "list")
    }
}

/// Validates content documents: a body with a non-empty uuid matching the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentDocumentValidator;

impl DocumentValidator for ContentDocumentValidator {
    fn validate(&self, path_uuid: &str, document: Option<&Document>) -> DocumentStoreResult<()> {
        let document = document
            .ok_or_else(|| DocumentStoreError::validation("content must be provided in request body"))?;

        let uuid = document.non_empty_str(fields::UUID).ok_or_else(|| {
            DocumentStoreError::validation("submitted content must provide a non-empty uuid")
        })?;

        require_same_uuid(path_uuid, uuid, "content")
    }
}

fn is_identifiable_item(item: &Bson) -> bool {
    match item {
        Bson::Document(item) => {
            item.non_empty_str(fields::UUID).is_some() || item.non_empty_str(fields::WEB_URL).is_some()
        }
        _ => false,
    }
}

fn require_same_uuid(path_uuid: &str, body_uuid: &str, noun: &str) -> DocumentStoreResult<()> {
    if path_uuid == body_uuid {
        return Ok(());
    }

    Err(DocumentStoreError::validation(format!(
        "uuid in path {path_uuid} is not equal to uuid in submitted {noun} {body_uuid}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    const UUID: &str = "9b7b5b5e-0d0a-4b4e-8f0c-2a1f6c0c1d11";

    fn message(result: DocumentStoreResult<()>) -> String {
        match result {
            Err(DocumentStoreError::Validation(message)) => message,
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    fn valid_list() -> Document {
        doc! {
            "uuid": UUID,
            "title": "Top Stories",
            "items": [ { "uuid": "c3f1b0b4-5d8e-4a36-9d4c-0f6b1d2e3a4b" }, { "webUrl": "http://www.ft.com/x" } ],
        }
    }

    #[test]
    fn accepts_canonical_uuids() {
        let parsed = UuidValidator::validate(UUID).unwrap();
        assert_eq!(parsed.to_string(), UUID);
    }

    #[test]
    fn rejects_non_canonical_uuids() {
        for candidate in [
            "9B7B5B5E-0D0A-4B4E-8F0C-2A1F6C0C1D11",
            "9b7b5b5e0d0a4b4e8f0c2a1f6c0c1d11",
            "{9b7b5b5e-0d0a-4b4e-8f0c-2a1f6c0c1d11}",
            "urn:uuid:9b7b5b5e-0d0a-4b4e-8f0c-2a1f6c0c1d11",
            "not-a-uuid",
            "",
        ] {
            let err = UuidValidator::validate(candidate).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("invalid UUID: {candidate}, does not conform to RFC 4122")
            );
        }
    }

    #[test]
    fn accepts_valid_list_and_empty_items() {
        assert!(ListDocumentValidator.validate(UUID, Some(&valid_list())).is_ok());

        let empty = doc! { "uuid": UUID, "title": "Empty", "items": [] };
        assert!(ListDocumentValidator.validate(UUID, Some(&empty)).is_ok());
    }

    #[test]
    fn list_rules_report_first_failure() {
        let validator = ListDocumentValidator;

        assert_eq!(message(validator.validate(UUID, None)), "list must be provided in request body");

        let mut list = valid_list();
        list.insert("uuid", "");
        list.insert("title", "");
        assert_eq!(
            message(validator.validate(UUID, Some(&list))),
            "submitted list must provide a non-empty uuid"
        );

        let mut list = valid_list();
        list.remove("title");
        assert_eq!(
            message(validator.validate(UUID, Some(&list))),
            "submitted list must provide a non-empty title"
        );

        let mut list = valid_list();
        list.remove("items");
        assert_eq!(
            message(validator.validate(UUID, Some(&list))),
            "submitted list should have an 'items' field"
        );

        let mut list = valid_list();
        list.insert("items", vec![Bson::Document(doc! { "uuid": "", "webUrl": "" })]);
        assert_eq!(
            message(validator.validate(UUID, Some(&list))),
            "list items must have a non-empty uuid or a non-empty webUrl"
        );
    }

    #[test]
    fn rejects_path_and_body_uuid_mismatch() {
        let path = "0f7d3c2e-1111-4a4a-9b9b-123456789abc";
        assert_eq!(
            message(ListDocumentValidator.validate(path, Some(&valid_list()))),
            format!("uuid in path {path} is not equal to uuid in submitted list {UUID}")
        );
        assert_eq!(
            message(ContentDocumentValidator.validate(path, Some(&doc! { "uuid": UUID }))),
            format!("uuid in path {path} is not equal to uuid in submitted content {UUID}")
        );
    }

    #[test]
    fn content_requires_body_and_uuid() {
        assert_eq!(
            message(ContentDocumentValidator.validate(UUID, None)),
            "content must be provided in request body"
        );
        assert_eq!(
            message(ContentDocumentValidator.validate(UUID, Some(&doc! { "title": "x" }))),
            "submitted content must provide a non-empty uuid"
        );
    }
}
