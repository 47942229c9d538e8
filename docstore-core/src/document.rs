//! The opaque document model and write results.
//!
//! Documents are schemaless: a [`Document`] is an ordered BSON field mapping that always
//! carries a `uuid` field equal to its key within its collection. Collection-specific rules
//! live in the [`validate`](crate::validate) module, never in the type system, so fields the
//! core does not understand pass through untouched.

use bson::{Bson, ser::serialize_to_bson};
use serde_json::{Value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A schemaless record keyed by uuid within a collection.
pub type Document = bson::Document;

/// Names of the persisted fields the core knows about.
///
/// The core is the only place with knowledge of these names; backends receive them
/// through query expressions and index specifications.
pub mod fields {
    /// Lookup key of every document.
    pub const UUID: &str = "uuid";
    /// Title of a list document.
    pub const TITLE: &str = "title";
    /// Items of a list document.
    pub const ITEMS: &str = "items";
    /// Web URL of a list item without a uuid.
    pub const WEB_URL: &str = "webUrl";
    /// Sequence of `(authority, identifierValue)` entries used for secondary lookup.
    pub const IDENTIFIERS: &str = "identifiers";
    /// Authority of an entry inside [`IDENTIFIERS`].
    pub const AUTHORITY: &str = "authority";
    /// Value of an entry inside [`IDENTIFIERS`].
    pub const IDENTIFIER_VALUE: &str = "identifierValue";
    /// Concept identifier half of the concept+type key.
    pub const CONCEPT_IDENTIFIER: &str = "concept.tmeIdentifier";
    /// Type discriminator half of the concept+type key.
    pub const TYPE_ID: &str = "type.id";
    /// Concept reference filtered on by list queries.
    pub const CONCEPT_UUID: &str = "concept.uuid";
    /// List type filtered on by list queries.
    pub const LIST_TYPE: &str = "listType";
    /// XML body of a content document.
    pub const BODY_XML: &str = "bodyXML";
    /// Public identifier added to outbound documents.
    pub const ID: &str = "id";
    /// Public API location added to outbound documents.
    pub const API_URL: &str = "apiUrl";
    /// Storage-only primary key; never part of a returned document.
    pub const INTERNAL_ID: &str = "_id";
}

/// Convenience accessors on [`Document`].
pub trait DocumentExt {
    /// Returns the document's `uuid` field when it is a string.
    fn uuid(&self) -> Option<&str>;

    /// Returns the string value at `field` when present and non-empty.
    fn non_empty_str(&self, field: &str) -> Option<&str>;

    /// Removes every storage-only field from the document.
    fn strip_internal_fields(self) -> Self;

    /// Converts this document to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value. The value must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if the value is not an object, or a
    /// serialization error if it cannot be represented as BSON.
    fn from_json(value: Value) -> DocumentStoreResult<Document>;
}

impl DocumentExt for Document {
    fn uuid(&self) -> Option<&str> {
        self.get(fields::UUID).and_then(Bson::as_str)
    }

    fn non_empty_str(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Bson::as_str)
            .filter(|value| !value.is_empty())
    }

    fn strip_internal_fields(mut self) -> Self {
        self.remove(fields::INTERNAL_ID);
        self
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Document> {
        if !value.is_object() {
            return Err(DocumentStoreError::validation("document body must be a JSON object"));
        }

        match serialize_to_bson(&value)? {
            Bson::Document(document) => Ok(document),
            _ => Err(DocumentStoreError::Serialization("expected a BSON document".to_string())),
        }
    }
}

/// Outcome of an upsert: whether a new document was created or an existing one replaced.
///
/// Produced once per write and consumed by the caller to pick a response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult {
    /// No document with this uuid existed before the write.
    Created(Document),
    /// A document with this uuid existed and was fully replaced.
    Updated(Document),
}

impl WriteResult {
    /// Returns the document that was written.
    pub fn document(&self) -> &Document {
        match self {
            WriteResult::Created(document) | WriteResult::Updated(document) => document,
        }
    }

    /// Returns `true` for [`WriteResult::Created`].
    pub fn is_created(&self) -> bool {
        matches!(self, WriteResult::Created(_))
    }
}
