//! Query translation from document store expressions to MongoDB query syntax.
//!
//! This module translates the abstract query expressions into MongoDB BSON filter
//! documents for execution by the MongoDB query engine.

use bson::{Bson, Document, doc};

use docstore_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates query expressions into MongoDB filter documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` becomes the match-all filter.
    pub(crate) fn translate(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

/// Escapes regular expression metacharacters so `term` matches literally.
pub(crate) fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // MongoDB rejects an empty $and.
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$elemMatch": self.visit_expr(expr)? },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s), "$options": "i" },
                    _ => return Err(DocumentStoreError::Backend("Contains operator requires a string value".to_string())),
                },
                FieldOp::AnyOf => match value {
                    Bson::Array(_) => doc! { "$in": value },
                    _ => return Err(DocumentStoreError::Backend("AnyOf operator requires an array value".to_string())),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use docstore_core::query::Filter;

    use super::*;

    #[test]
    fn identifier_lookup_becomes_elem_match() {
        let expr = Filter::elem_match(
            "identifiers",
            Filter::and([Filter::eq("authority", "a"), Filter::eq("identifierValue", "1")]),
        );

        assert_eq!(
            MongoQueryTranslator::translate(Some(&expr)).unwrap(),
            doc! {
                "identifiers": {
                    "$elemMatch": {
                        "$and": [
                            { "authority": { "$eq": "a" } },
                            { "identifierValue": { "$eq": "1" } },
                        ]
                    }
                }
            }
        );
    }

    #[test]
    fn contains_is_an_escaped_case_insensitive_regex() {
        let expr = Filter::contains("title", "Top (1.0)");
        assert_eq!(
            MongoQueryTranslator::translate(Some(&expr)).unwrap(),
            doc! { "title": { "$regex": "Top \\(1\\.0\\)", "$options": "i" } }
        );
    }

    #[test]
    fn any_of_becomes_in() {
        let expr = Filter::any_of("uuid", ["a", "b"]);
        assert_eq!(
            MongoQueryTranslator::translate(Some(&expr)).unwrap(),
            doc! { "uuid": { "$in": ["a", "b"] } }
        );
    }

    #[test]
    fn missing_or_empty_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
        assert_eq!(MongoQueryTranslator::translate(Some(&Filter::and([]))).unwrap(), doc! {});
    }
}
