//! # Error Types — Structured Error Hierarchy
//!
//! Defines the failure taxonomy shared by every jsev crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Setup failures (malformed schema, unsupported vocabulary, duplicate
//!   identifiers, unresolvable references) fail fast and carry the
//!   location that caused them.
//! - Constraint violations are *not* errors: they are recorded as
//!   `valid: false` nodes in the evaluation result and never abort.
//! - Only [`EvaluationError`] can abort an in-flight evaluation.

use thiserror::Error;

/// Top-level error type for building, registering, and evaluating schemas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema document is structurally invalid.
    #[error(transparent)]
    Malformed(#[from] MalformedSchemaError),

    /// A meta-schema requires a vocabulary that is not registered.
    #[error(transparent)]
    UnsupportedVocabulary(#[from] UnsupportedVocabularyError),

    /// Two schema nodes claim the same canonical URI with different content.
    #[error(transparent)]
    DuplicateId(#[from] DuplicateIdError),

    /// A `$ref` or `$dynamicRef` could not be resolved.
    #[error(transparent)]
    RefResolution(#[from] RefResolutionError),

    /// Evaluation nested deeper than the configured limit.
    #[error(transparent)]
    DepthExceeded(#[from] EvaluationDepthExceededError),
}

impl From<EvaluationError> for SchemaError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::RefResolution(e) => Self::RefResolution(e),
            EvaluationError::DepthExceeded(e) => Self::DepthExceeded(e),
        }
    }
}

/// The schema document itself is structurally invalid.
///
/// Raised by the build step when the root is neither a boolean nor an
/// object, when a known keyword carries a value of the wrong shape, or
/// when an identifier keyword contains characters that cannot appear in
/// a URI fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed schema at '{location}': {reason}")]
pub struct MalformedSchemaError {
    /// JSON Pointer to the offending location within the document.
    pub location: String,
    /// Human-readable description of the problem.
    pub reason: String,
}

impl MalformedSchemaError {
    /// Create a new error for the given document location.
    pub fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// A meta-schema marks a vocabulary as required, but no vocabulary with
/// that URI is registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("meta-schema '{meta_schema}' requires unsupported vocabulary '{vocabulary}'")]
pub struct UnsupportedVocabularyError {
    /// URI of the meta-schema carrying the `$vocabulary` declaration.
    pub meta_schema: String,
    /// URI of the vocabulary that is not registered.
    pub vocabulary: String,
}

/// Registration found a canonical URI already bound to different content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate schema identifier '{uri}' with conflicting content")]
pub struct DuplicateIdError {
    /// The canonical URI claimed twice.
    pub uri: String,
}

/// A reference could not be turned into a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefResolutionError {
    /// The reference is not a valid URI reference, or cannot be combined
    /// with its base URI.
    #[error("invalid reference '{reference}' against base '{base}': {reason}")]
    InvalidReference {
        /// The raw reference text.
        reference: String,
        /// The base URI it was resolved against.
        base: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The target document is unknown and no fetch hook is configured.
    #[error("no retriever configured to fetch '{uri}'")]
    RetrieverUnavailable {
        /// Document URI that was needed.
        uri: String,
    },

    /// The fetch hook reported a failure.
    #[error("failed to fetch '{uri}': {reason}")]
    FetchFailed {
        /// Document URI that was fetched.
        uri: String,
        /// Failure reported by the hook.
        reason: String,
    },

    /// The fetched content does not build or register as a schema.
    #[error("document retrieved from '{uri}' is not a usable schema: {reason}")]
    InvalidDocument {
        /// Document URI that was fetched.
        uri: String,
        /// Build or registration failure.
        reason: String,
    },

    /// The fragment pointer does not exist within the target document.
    #[error("JSON pointer '{pointer}' does not exist in '{uri}'")]
    PointerNotFound {
        /// Document URI searched.
        uri: String,
        /// The pointer that was not found.
        pointer: String,
    },

    /// The plain-name fragment does not name an anchor in the target resource.
    #[error("anchor '{anchor}' is not defined in '{uri}'")]
    AnchorNotFound {
        /// Resource URI searched.
        uri: String,
        /// The anchor name.
        anchor: String,
    },

    /// The asynchronous fetch was cancelled before completing.
    #[error("fetch of '{uri}' was cancelled")]
    Cancelled {
        /// Document URI whose fetch was abandoned.
        uri: String,
    },
}

/// Evaluation nested more (schema, instance) pairs than the configured limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "maximum evaluation depth {limit} exceeded at '{evaluation_path}' (instance '{instance_location}')"
)]
pub struct EvaluationDepthExceededError {
    /// The configured maximum depth.
    pub limit: usize,
    /// Evaluation path at which the limit was hit.
    pub evaluation_path: String,
    /// Instance location at which the limit was hit.
    pub instance_location: String,
}

/// Failures that abort a single `evaluate` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// A reference reached during evaluation could not be resolved.
    #[error(transparent)]
    RefResolution(#[from] RefResolutionError),

    /// The recursion guard tripped.
    #[error(transparent)]
    DepthExceeded(#[from] EvaluationDepthExceededError),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error parsing a JSON Pointer (RFC 6901).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A non-empty pointer must start with `/`.
    #[error("JSON pointer '{0}' must be empty or start with '/'")]
    MissingLeadingSlash(String),

    /// `~` must be followed by `0` or `1`.
    #[error("JSON pointer '{0}' contains an invalid '~' escape")]
    InvalidEscape(String),

    /// A `%` escape in a URI fragment is not followed by two hex digits,
    /// or decodes to invalid UTF-8.
    #[error("URI fragment '{0}' contains an invalid percent-encoding")]
    InvalidPercentEncoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_location() {
        let err = MalformedSchemaError::new("/properties", "expected an object");
        assert_eq!(
            err.to_string(),
            "malformed schema at '/properties': expected an object"
        );
    }

    #[test]
    fn test_evaluation_error_converts_to_schema_error() {
        let err: SchemaError = EvaluationError::from(RefResolutionError::RetrieverUnavailable {
            uri: "https://example.com/a.json".into(),
        })
        .into();
        assert!(matches!(err, SchemaError::RefResolution(_)));

        let err: SchemaError = EvaluationError::from(EvaluationDepthExceededError {
            limit: 4,
            evaluation_path: "/$ref/$ref".into(),
            instance_location: String::new(),
        })
        .into();
        assert!(matches!(err, SchemaError::DepthExceeded(_)));
    }

    #[test]
    fn test_depth_error_display() {
        let err = EvaluationDepthExceededError {
            limit: 8,
            evaluation_path: "/items/$ref".into(),
            instance_location: "/0/0".into(),
        };
        let s = err.to_string();
        assert!(s.contains("8"));
        assert!(s.contains("/items/$ref"));
        assert!(s.contains("/0/0"));
    }
}
