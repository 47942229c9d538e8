//! Mapping of internal failures onto the external failure taxonomy.
//!
//! Every failure that leaves the pipeline router goes through [`ErrorClassifier::classify`],
//! which produces a transport-independent [`ErrorDescriptor`]. Internal details never reach
//! the public message except for validation failures, whose text is part of the contract.

use serde::Serialize;
use tracing::{error, warn};

use crate::error::DocumentStoreError;

/// Public message for every not-found class failure.
pub const NOT_FOUND_MESSAGE: &str = "Requested item does not exist";
/// Public message for store connectivity failures.
pub const UNAVAILABLE_MESSAGE: &str = "Service Unavailable";
/// Public message for every other store or processing failure.
pub const INTERNAL_MESSAGE: &str = "Internal error communicating with external system";

/// The stable external failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// The caller sent something malformed.
    ValidationFailure,
    /// The requested item, collection or operation does not exist.
    NotFound,
    /// A lookup that must be unique matched several documents.
    QueryResultNotUnique,
    /// The store could not be reached or timed out.
    ExternalSystemUnavailable,
    /// Any other store or processing failure.
    ExternalSystemInternal,
}

impl FailureKind {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::ExternalSystemUnavailable)
    }

    /// Whether the failure is the caller's fault.
    pub fn is_client_error(self) -> bool {
        matches!(self, FailureKind::ValidationFailure | FailureKind::NotFound)
    }
}

/// A classified failure, ready to be rendered by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

/// Converts internal failures to [`ErrorDescriptor`]s and logs them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(error: &DocumentStoreError) -> ErrorDescriptor {
        let (kind, message) = match error {
            DocumentStoreError::Validation(message) => {
                (FailureKind::ValidationFailure, message.clone())
            }
            DocumentStoreError::DocumentNotFound(..)
            | DocumentStoreError::CollectionNotFound(_)
            | DocumentStoreError::NotRegistered(..) => {
                (FailureKind::NotFound, NOT_FOUND_MESSAGE.to_string())
            }
            DocumentStoreError::QueryResultNotUnique(..) => {
                (FailureKind::QueryResultNotUnique, INTERNAL_MESSAGE.to_string())
            }
            DocumentStoreError::Unavailable(_) => {
                (FailureKind::ExternalSystemUnavailable, UNAVAILABLE_MESSAGE.to_string())
            }
            DocumentStoreError::Serialization(_)
            | DocumentStoreError::Initialization(_)
            | DocumentStoreError::Backend(_)
            | DocumentStoreError::Transform(_)
            | DocumentStoreError::Unknown(_) => {
                (FailureKind::ExternalSystemInternal, INTERNAL_MESSAGE.to_string())
            }
        };

        if kind.is_client_error() {
            warn!(?kind, reason = %message, cause = %error, "document store error");
        } else {
            error!(?kind, reason = %message, cause = %error, "document store error");
        }

        ErrorDescriptor { kind, message, retryable: kind.is_retryable() }
    }
}
