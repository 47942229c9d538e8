//! Field name sanitization for MongoDB compatibility.
//!
//! MongoDB gives dots and leading dollar signs in field names a query meaning, so keys
//! carrying them are escaped on the way in and restored on the way out. Values are never
//! touched: documents are opaque and a stored title must come back byte for byte.

use bson::{Bson, Document};

/// Sanitizes and restores document keys to handle MongoDB field name restrictions.
pub(crate) struct KeySanitizer;

impl KeySanitizer {
    /// Character replacements for sanitization
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Recursively sanitizes every key of `document`, including keys of nested documents
    /// and of documents inside arrays.
    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(k, v)| (Self::sanitize_string(&k), Self::map_keys(v, Self::sanitize_document)))
            .collect()
    }

    /// Recursively reverts [`KeySanitizer::sanitize_document`].
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(k, v)| (Self::restore_string(&k), Self::map_keys(v, Self::restore_document)))
            .collect()
    }

    fn map_keys(value: Bson, f: fn(Document) -> Document) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(f(doc)),
            Bson::Array(arr) => Bson::Array(arr.into_iter().map(|v| Self::map_keys(v, f)).collect()),
            other => other,
        }
    }

    /// Sanitizes a string by replacing problematic characters with safe escaped versions.
    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    /// Restores a string by reverting sanitization escapes.
    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }
}
