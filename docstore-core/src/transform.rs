//! The body-transform collaborator boundary.
//!
//! Rewriting links inside a document body is done by an external transformer; the
//! document store only hands it a body and a [`UriResolver`] and stores nothing about how
//! the rewrite works. Any `Fn(&str, &dyn UriResolver) -> DocumentStoreResult<String>`
//! closure is a [`BodyTransformer`].

use std::fmt::Debug;

use crate::error::DocumentStoreResult;

/// Resolves an API path such as `/lists/<uuid>` to an absolute URL.
pub trait UriResolver: Send + Sync + Debug {
    fn resolve(&self, path: &str) -> String;
}

/// Resolves paths against a fixed API host over plain http.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUriResolver {
    api_host: String,
}

impl ApiUriResolver {
    pub fn new(api_host: impl Into<String>) -> Self {
        Self { api_host: api_host.into() }
    }
}

impl UriResolver for ApiUriResolver {
    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("http://{}{}", self.api_host, path)
        } else {
            format!("http://{}/{}", self.api_host, path)
        }
    }
}

/// A pure rewrite of a document body.
///
/// Failures should be reported as
/// [`DocumentStoreError::Transform`](crate::error::DocumentStoreError::Transform).
pub trait BodyTransformer: Send + Sync {
    fn transform(&self, body: &str, resolver: &dyn UriResolver) -> DocumentStoreResult<String>;
}

impl<F> BodyTransformer for F
where
    F: Fn(&str, &dyn UriResolver) -> DocumentStoreResult<String> + Send + Sync,
{
    fn transform(&self, body: &str, resolver: &dyn UriResolver) -> DocumentStoreResult<String> {
        self(body, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_api_host() {
        let resolver = ApiUriResolver::new("api.ft.com");
        assert_eq!(resolver.resolve("/lists/abc"), "http://api.ft.com/lists/abc");
        assert_eq!(resolver.resolve("content/abc"), "http://api.ft.com/content/abc");
    }

    #[test]
    fn closures_are_transformers() {
        let upper = |body: &str, _: &dyn UriResolver| -> DocumentStoreResult<String> {
            Ok(body.to_uppercase())
        };
        let resolver = ApiUriResolver::new("localhost");
        assert_eq!(upper.transform("<body/>", &resolver).unwrap(), "<BODY/>");
    }
}
