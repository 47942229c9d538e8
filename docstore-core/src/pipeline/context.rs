//! The per-request value bag threaded through a chain.

use uuid::Uuid;

use crate::{
    collection::ListFilter,
    document::{Document, WriteResult},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Operation,
};

/// Query parameters of a request, in arrival order. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, keeping any earlier values for the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Every value given for `key`, in arrival order.
    pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// The first non-empty value given for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).find(|value| !value.is_empty())
    }

    /// Whether no parameter was given at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The final result of a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A single document.
    Document(Document),
    /// Zero or more documents.
    Documents(Vec<Document>),
    /// A write created or replaced a document.
    Written(WriteResult),
    /// A delete completed. `existed` is false when the delete policy forgave a missing document.
    Deleted { existed: bool },
}

/// What a stage asks the chain to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Run the next stage.
    Continue,
    /// Skip the remaining stages and answer with this outcome.
    Terminate(Outcome),
}

/// Request-scoped state shared by the stages of one chain execution.
///
/// Inbound fields are set by the caller; the rest are filled in by stages as they run.
#[derive(Debug, Clone)]
pub struct Context {
    pub collection: String,
    pub operation: Operation,
    /// The id from the request target, unvalidated.
    pub path_id: Option<String>,
    pub params: QueryParams,
    pub body: Option<Document>,

    /// The path id once validated.
    pub uuid: Option<Uuid>,
    /// Validated `uuid` query parameters.
    pub uuids: Vec<Uuid>,
    pub list_filter: Option<ListFilter>,
    /// Documents fetched so far, in store order.
    pub documents: Vec<Document>,
    pub write_result: Option<WriteResult>,
    /// Whether a delete removed a document. `None` until a delete ran.
    pub deleted: Option<bool>,
}

impl Context {
    /// Creates the context of a request on `collection`, with nothing validated or fetched yet.
    pub fn new(collection: impl Into<String>, operation: Operation) -> Self {
        Self {
            collection: collection.into(),
            operation,
            path_id: None,
            params: QueryParams::new(),
            body: None,
            uuid: None,
            uuids: Vec::new(),
            list_filter: None,
            documents: Vec::new(),
            write_result: None,
            deleted: None,
        }
    }

    /// Sets the id from the request target.
    pub fn with_path_id(mut self, id: impl Into<String>) -> Self {
        self.path_id = Some(id.into());
        self
    }

    /// Sets the query parameters.
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the inbound body of a write.
    pub fn with_body(mut self, body: Document) -> Self {
        self.body = Some(body);
        self
    }

    /// The validated path uuid.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Unknown`] if no earlier stage validated one, which means
    /// the chain was assembled in the wrong order.
    pub fn require_uuid(&self) -> DocumentStoreResult<Uuid> {
        self.uuid.ok_or_else(|| {
            DocumentStoreError::Unknown(format!(
                "no validated uuid in context for {} on {}",
                self.operation, self.collection
            ))
        })
    }

    /// A description of the requested document for not-found reporting.
    pub fn requested_id(&self) -> String {
        match (&self.uuid, &self.path_id) {
            (Some(uuid), _) => uuid.to_string(),
            (None, Some(id)) => id.clone(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_keep_repeated_keys_in_order() {
        let params: QueryParams = [("uuid", "a"), ("listType", "x"), ("uuid", "b")]
            .into_iter()
            .collect();

        assert_eq!(params.get_all("uuid").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.first("listType"), Some("x"));
        assert_eq!(params.first("searchTerm"), None);
    }

    #[test]
    fn first_skips_empty_values() {
        let params: QueryParams = [("searchTerm", ""), ("searchTerm", "Top")].into_iter().collect();
        assert_eq!(params.first("searchTerm"), Some("Top"));
    }

    #[test]
    fn values_outlive_the_lookup_key() {
        let params: QueryParams = [("listType", "TopStories")].into_iter().collect();

        let value = {
            let key = String::from("listType");
            params.first(&key)
        };
        let all: Vec<&str> = {
            let key = String::from("listType");
            params.get_all(&key).collect()
        };

        assert_eq!(value, Some("TopStories"));
        assert_eq!(all, vec!["TopStories"]);
    }

    #[test]
    fn require_uuid_fails_before_validation() {
        let context = Context::new("lists", Operation::GetById).with_path_id("abc");
        assert!(matches!(context.require_uuid(), Err(DocumentStoreError::Unknown(_))));
        assert_eq!(context.requested_id(), "abc");
    }
}
