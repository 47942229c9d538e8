//! Collections: the registry of legal collection names and the per-collection handle.
//!
//! A [`CollectionRegistry`] is the static allow-list of collections, built once at startup
//! and never mutated. A [`Collection`] is a short-lived handle onto one registered
//! collection that carries the persistence engine's query semantics: upsert keyed by uuid,
//! best-effort batch reads, uniqueness checks on secondary keys, and truthful not-found
//! reporting on delete.
//!
//! ```ignore
//! let registry = Arc::new(CollectionRegistry::defaults());
//! let store = DocumentStore::new(InMemoryStore::new(), registry);
//!
//! let lists = store.collection("lists")?;
//! let written = lists.write(doc! { "uuid": uuid.to_string(), "title": "Top Stories" }).await?;
//! assert!(written.is_created());
//! ```

use std::collections::HashMap;

use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    backend::{DynStoreBackend, IndexSpec, ReplaceOutcome},
    document::{Document, DocumentExt, WriteResult, fields},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter, Query},
};

/// Name of the content collection.
pub const CONTENT: &str = "content";
/// Name of the lists collection.
pub const LISTS: &str = "lists";
/// Name of the generic lists collection.
pub const GENERIC_LISTS: &str = "generic-lists";

/// A registered collection and the indexes it requires.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    name: String,
    indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    /// Creates a collection with no indexes.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), indexes: Vec::new() }
    }

    /// Adds the unique index on the `uuid` lookup key.
    pub fn with_uuid_index(self) -> Self {
        self.with_index(IndexSpec::ascending([fields::UUID]).unique())
    }

    /// Adds the compound index backing lookups by `(authority, identifierValue)`.
    pub fn with_identifier_index(self) -> Self {
        self.with_index(IndexSpec::ascending([
            format!("{}.{}", fields::IDENTIFIERS, fields::AUTHORITY),
            format!("{}.{}", fields::IDENTIFIERS, fields::IDENTIFIER_VALUE),
        ]))
    }

    /// Adds an arbitrary index.
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexes this collection requires, in registration order.
    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }
}

/// The set of legal collection names.
///
/// Constructed once and passed explicitly to the persistence engine and the router.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    order: Vec<String>,
    collections: HashMap<String, CollectionSpec>,
}

impl CollectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by the document store service: `content`, `lists` and
    /// `generic-lists`.
    pub fn defaults() -> Self {
        Self::new()
            .with(CollectionSpec::new(CONTENT).with_uuid_index().with_identifier_index())
            .with(CollectionSpec::new(LISTS).with_uuid_index())
            .with(CollectionSpec::new(GENERIC_LISTS).with_uuid_index())
    }

    /// Registers a collection, replacing any previous registration under the same name.
    pub fn with(mut self, spec: CollectionSpec) -> Self {
        if !self.collections.contains_key(spec.name()) {
            self.order.push(spec.name().to_string());
        }
        self.collections.insert(spec.name().to_string(), spec);
        self
    }

    /// Whether `name` is a registered collection.
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Returns the named collection, if registered.
    pub fn get(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.get(name)
    }

    /// Returns the named collection, or [`DocumentStoreError::CollectionNotFound`].
    pub fn require(&self, name: &str) -> DocumentStoreResult<&CollectionSpec> {
        self.get(name)
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(name.to_string()))
    }

    /// Registered collection names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Optional predicates over list documents, ANDed together.
///
/// A filter with no predicate matches every document in the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Matches `concept.uuid` exactly.
    pub concept_uuid: Option<String>,
    /// Matches `listType` exactly.
    pub list_type: Option<String>,
    /// Case-insensitive substring of `title`.
    pub search_term: Option<String>,
}

impl ListFilter {
    /// Whether no predicate is present.
    pub fn is_empty(&self) -> bool {
        self.concept_uuid.is_none() && self.list_type.is_none() && self.search_term.is_none()
    }

    /// The conjunction of the present predicates, or `None` when there are none.
    pub fn to_expr(&self) -> Option<Expr> {
        let predicates = [
            self.concept_uuid
                .as_deref()
                .map(|concept| Filter::eq(fields::CONCEPT_UUID, concept)),
            self.list_type
                .as_deref()
                .map(|list_type| Filter::eq(fields::LIST_TYPE, list_type)),
            self.search_term
                .as_deref()
                .map(|term| Filter::contains(fields::TITLE, term)),
        ];

        let predicates: Vec<Expr> = predicates.into_iter().flatten().collect();
        (!predicates.is_empty()).then(|| Filter::and(predicates))
    }
}

/// A handle onto one registered collection of a document store.
#[derive(Debug)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finds the document whose `uuid` equals `uuid`.
    pub async fn find_by_uuid(&self, uuid: &Uuid) -> DocumentStoreResult<Option<Document>> {
        let query = Query::builder()
            .filter(uuid_filter(uuid))
            .limit(1)
            .build();

        Ok(self.find(query).await?.into_iter().next())
    }

    /// Finds the documents whose uuids are among `uuids`.
    ///
    /// Uuids with no document are silently omitted; the result follows store order.
    pub async fn find_by_uuids(&self, uuids: &[Uuid]) -> DocumentStoreResult<Vec<Document>> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::builder()
            .filter(Filter::any_of(fields::UUID, uuids.iter().map(Uuid::to_string)))
            .build();

        self.find(query).await
    }

    /// Finds the document carrying the identifier `(authority, value)`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::QueryResultNotUnique`] if two or more documents carry it.
    pub async fn find_by_identifier(
        &self,
        authority: &str,
        value: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        let filter = Filter::elem_match(
            fields::IDENTIFIERS,
            Filter::and([
                Filter::eq(fields::AUTHORITY, authority),
                Filter::eq(fields::IDENTIFIER_VALUE, value),
            ]),
        );

        self.find_unique(filter, format!("identifier {authority}:{value}"))
            .await
    }

    /// Finds the document keyed by concept identifier and type discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::QueryResultNotUnique`] if two or more documents match.
    pub async fn find_by_concept_and_type(
        &self,
        concept_id: &str,
        type_id: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        let filter = Filter::and([
            Filter::eq(fields::CONCEPT_IDENTIFIER, concept_id),
            Filter::eq(fields::TYPE_ID, type_id),
        ]);

        self.find_unique(filter, format!("concept {concept_id} and type {type_id}"))
            .await
    }

    /// Returns the documents matching every predicate present in `filter`, in store order.
    pub async fn filter_lists(&self, filter: &ListFilter) -> DocumentStoreResult<Vec<Document>> {
        let query = Query::builder()
            .maybe_filter(filter.to_expr())
            .build();

        self.find(query).await
    }

    /// Upserts `document` keyed by its `uuid` field.
    ///
    /// An existing document with the same uuid is fully replaced, not merged.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if the document has no non-empty uuid.
    pub async fn write(&self, document: Document) -> DocumentStoreResult<WriteResult> {
        let document = document.strip_internal_fields();
        let uuid = document
            .non_empty_str(fields::UUID)
            .ok_or_else(|| DocumentStoreError::validation("document must provide a non-empty uuid"))?
            .to_string();

        let outcome = self
            .backend
            .replace_document(Filter::eq(fields::UUID, uuid), document.clone(), &self.name)
            .await
            .inspect_err(|err| self.report(err, "write"))?;

        Ok(match outcome {
            ReplaceOutcome::Inserted => WriteResult::Created(document),
            ReplaceOutcome::Replaced => WriteResult::Updated(document),
        })
    }

    /// Deletes the document with the given uuid.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if no such document existed.
    pub async fn delete(&self, uuid: &Uuid) -> DocumentStoreResult<()> {
        let deleted = self
            .backend
            .delete_document(uuid_filter(uuid), &self.name)
            .await
            .inspect_err(|err| self.report(err, "delete"))?;

        if deleted == 0 {
            return Err(DocumentStoreError::DocumentNotFound(uuid.to_string(), self.name.clone()));
        }

        Ok(())
    }

    /// Ensures every index in `indexes` exists on this collection.
    pub async fn ensure_indexes(&self, indexes: &[IndexSpec]) -> DocumentStoreResult<()> {
        for index in indexes {
            self.backend
                .create_index(&self.name, index)
                .await
                .inspect_err(|err| self.report(err, "create_index"))?;
        }

        Ok(())
    }

    async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        Ok(self
            .backend
            .find_documents(query, &self.name)
            .await
            .inspect_err(|err| self.report(err, "find"))?
            .into_iter()
            .map(DocumentExt::strip_internal_fields)
            .collect())
    }

    async fn find_unique(&self, filter: Expr, key: String) -> DocumentStoreResult<Option<Document>> {
        let query = Query::builder()
            .filter(filter)
            .limit(2)
            .build();

        let mut found = self.find(query).await?.into_iter();

        match (found.next(), found.next()) {
            (Some(first), Some(second)) => {
                warn!(
                    collection = %self.name,
                    key = %key,
                    first = %first,
                    second = %second,
                    "found too many results for unique lookup"
                );
                Err(DocumentStoreError::QueryResultNotUnique(self.name.clone(), key))
            }
            (first, _) => Ok(first),
        }
    }

    fn report(&self, err: &DocumentStoreError, operation: &str) {
        match err {
            DocumentStoreError::Unavailable(reason) => {
                warn!(collection = %self.name, operation, reason = %reason, "store unavailable")
            }
            DocumentStoreError::Backend(reason) => {
                error!(collection = %self.name, operation, reason = %reason, "store failure")
            }
            _ => {}
        }
    }
}

fn uuid_filter(uuid: &Uuid) -> Expr {
    Filter::eq(fields::UUID, uuid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_filter_has_no_expression() {
        let filter = ListFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.to_expr(), None);
    }

    #[test]
    fn list_filter_ands_present_predicates() {
        let filter = ListFilter {
            concept_uuid: Some("A".to_string()),
            list_type: None,
            search_term: Some("Top".to_string()),
        };

        assert_eq!(
            filter.to_expr(),
            Some(Filter::and([
                Filter::eq("concept.uuid", "A"),
                Filter::contains("title", "Top"),
            ]))
        );
    }

    #[test]
    fn default_registry_lists_collections_in_order() {
        let registry = CollectionRegistry::defaults();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![CONTENT, LISTS, GENERIC_LISTS]);
        assert_eq!(registry.require(CONTENT).unwrap().indexes().len(), 2);
        for name in [CONTENT, LISTS, GENERIC_LISTS] {
            let uuid_index = &registry.require(name).unwrap().indexes()[0];
            assert_eq!(uuid_index.fields, vec![fields::UUID.to_string()]);
            assert!(uuid_index.unique);
        }
        assert!(matches!(
            registry.require("pictures"),
            Err(DocumentStoreError::CollectionNotFound(name)) if name == "pictures"
        ));
    }
}
