//! Query expression evaluation for in-memory document filtering.
//!
//! Field paths are resolved the way a document database resolves them: dotted segments
//! descend into nested documents, and an array met along the way fans out over its
//! document elements. A comparison matches when any resolved value, or any element of a
//! resolved array, satisfies it.

use std::collections::HashMap;

use bson::{Bson, DateTime};

use docstore_core::{
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `1_i32` equals `1.0_f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON type; equal to nothing, itself included.
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns every value reachable at `path`, expanding arrays of documents along the way.
    fn resolve(&self, path: &str) -> Vec<&'a Bson> {
        let mut found = Vec::new();
        collect(self.document, path, &mut found);
        found
    }

    /// Resolved values plus the elements of any resolved arrays.
    fn candidates(&self, path: &str) -> Vec<&'a Bson> {
        let mut candidates = Vec::new();
        for value in self.resolve(path) {
            candidates.push(value);
            if let Bson::Array(items) = value {
                candidates.extend(items.iter());
            }
        }
        candidates
    }
}

fn collect<'a>(document: &'a Document, path: &str, found: &mut Vec<&'a Bson>) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let Some(value) = document.get(head) else {
        return;
    };

    match (rest, value) {
        (None, value) => found.push(value),
        (Some(rest), Bson::Document(inner)) => collect(inner, rest, found),
        (Some(rest), Bson::Array(items)) => {
            for item in items {
                if let Bson::Document(inner) = item {
                    collect(inner, rest, found);
                }
            }
        }
        (Some(_), _) => {}
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error> {
        for value in self.resolve(field) {
            let Bson::Array(items) = value else { continue };

            for item in items {
                if let Bson::Document(element) = item {
                    if DocumentEvaluator::new(element).evaluate(expr)? {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let candidates = self.candidates(field);

        match op {
            FieldOp::Eq => {
                let expected = Comparable::from(value);
                Ok(candidates.into_iter().any(|candidate| Comparable::from(candidate) == expected))
            }
            FieldOp::Contains => {
                let Bson::String(needle) = value else {
                    return Err(DocumentStoreError::Unknown(format!(
                        "contains on {field} expects a string, got {value}"
                    )));
                };
                Ok(candidates
                    .into_iter()
                    .filter_map(Bson::as_str)
                    .any(|haystack| contains_ignore_case(haystack, needle)))
            }
            FieldOp::AnyOf => {
                let Bson::Array(options) = value else {
                    return Err(DocumentStoreError::Unknown(format!(
                        "any_of on {field} expects an array, got {value}"
                    )));
                };
                let options: Vec<Comparable> = options.iter().map(Comparable::from).collect();
                Ok(candidates
                    .into_iter()
                    .map(Comparable::from)
                    .any(|candidate| options.contains(&candidate)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docstore_core::query::Filter;

    use super::*;

    fn matches(document: &Document, expr: Expr) -> bool {
        DocumentEvaluator::new(document).evaluate(&expr).unwrap()
    }

    #[test]
    fn eq_follows_dotted_paths() {
        let document = doc! { "concept": { "uuid": "A" }, "type": { "id": "T" } };
        assert!(matches(&document, Filter::eq("concept.uuid", "A")));
        assert!(!matches(&document, Filter::eq("concept.uuid", "B")));
        assert!(!matches(&document, Filter::eq("concept.missing", "A")));
    }

    #[test]
    fn numbers_compare_across_types() {
        let document = doc! { "count": 3_i64 };
        assert!(matches(&document, Filter::eq("count", 3_i32)));
        assert!(matches(&document, Filter::eq("count", 3.0_f64)));
    }

    #[test]
    fn contains_ignores_case() {
        let document = doc! { "title": "Top Stories" };
        assert!(matches(&document, Filter::contains("title", "top")));
        assert!(matches(&document, Filter::contains("title", "STORIES")));
        assert!(!matches(&document, Filter::contains("title", "bottom")));
    }

    #[test]
    fn any_of_matches_membership() {
        let document = doc! { "uuid": "b" };
        assert!(matches(&document, Filter::any_of("uuid", ["a", "b"])));
        assert!(!matches(&document, Filter::any_of("uuid", ["c"])));
        assert!(!matches(&document, Filter::any_of("uuid", Vec::<String>::new())));
    }

    #[test]
    fn elem_match_requires_one_element_to_satisfy_all() {
        let document = doc! {
            "identifiers": [
                { "authority": "x", "identifierValue": "1" },
                { "authority": "y", "identifierValue": "2" },
            ]
        };
        let identifier = |authority: &str, value: &str| {
            Filter::elem_match(
                "identifiers",
                Filter::and([Filter::eq("authority", authority), Filter::eq("identifierValue", value)]),
            )
        };

        assert!(matches(&document, identifier("x", "1")));
        assert!(matches(&document, identifier("y", "2")));
        assert!(!matches(&document, identifier("x", "2")));
    }

    #[test]
    fn arrays_of_documents_fan_out_on_dotted_paths() {
        let document = doc! { "identifiers": [ { "authority": "x" }, { "authority": "y" } ] };
        assert!(matches(&document, Filter::eq("identifiers.authority", "y")));
    }

    #[test]
    fn empty_conjunction_matches_everything() {
        assert!(matches(&doc! {}, Filter::and([])));
    }
}
