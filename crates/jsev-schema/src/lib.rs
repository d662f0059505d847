//! # jsev-schema — JSON Schema 2020-12 Evaluation
//!
//! Compiles JSON Schema draft 2020-12 documents, registers them for
//! cross-document `$ref` and `$dynamicRef` resolution, and evaluates JSON
//! instances against them, producing results in the Flag, List and
//! Hierarchical output formats.
//!
//! ## Lifecycle
//!
//! A [`SchemaRegistry`] is constructed, schemas are registered into it
//! through `&mut` methods, and it is then shared by reference (or behind
//! an `Arc`) for evaluation. Evaluation takes `&self`: concurrent calls
//! never observe each other's dynamic scope, and documents fetched
//! on demand are added to internal single-flight caches.
//!
//! ```ignore
//! let mut registry = SchemaRegistry::new();
//! let schema = registry.register(json!({"minimum": 10}))?;
//! let output = registry.validate(&schema, &json!(5), registry.options())?;
//! assert!(!output.valid());
//! ```
//!
//! ## Modules
//!
//! - [`model`] — the arena-compiled schema tree.
//! - [`keywords`] — the keyword extension point and the built-in
//!   vocabularies; [`vocabulary`] maps keyword names to handlers and
//!   computes dialects from `$vocabulary`.
//! - [`registry`] / [`resolver`] — URI indexing, reference resolution and
//!   fetching through the [`retrieve`] hooks.
//! - [`evaluator`] — the recursive walk; [`output`] — result nodes and
//!   the three output formats.
//! - [`options`] — per-call configuration; [`loader`] — JSON/YAML files.
//!
//! ## Crate Policy
//!
//! - Depends only on `jsev-core` internally.
//! - Engine code performs no I/O; documents arrive through fetch hooks.
//! - Invalid instances are results, never errors. `Err` is reserved for
//!   malformed schemas, unresolvable references and the recursion guard.

pub mod evaluator;
pub mod json;
pub mod keywords;
pub mod loader;
pub mod metaschema;
pub mod model;
pub mod options;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod retrieve;
pub mod vocabulary;

use serde_json::Value;

pub use evaluator::Evaluator;
pub use jsev_core::{
    EvaluationError, JsonPointer, MalformedSchemaError, RefResolutionError, SchemaError,
};
pub use keywords::{Keyword, KeywordContext, KeywordHandler, KeywordResult};
pub use loader::{load_document, LoadError};
pub use model::Schema;
pub use options::{
    AnnotationRetention, EvaluationOptions, OutputFormat, RetentionPolicy,
    DEFAULT_MAX_RECURSION_DEPTH,
};
pub use output::{EvaluationNode, Output, OutputUnit};
pub use registry::SchemaRegistry;
pub use resolver::SchemaHandle;
pub use retrieve::{
    AsyncRetrieve, CancellationSignal, DirectoryRetriever, Retrieve, RetrieveError, SyncRetriever,
};
pub use vocabulary::{Dialect, VocabularyRegistry};

/// Register `schema` in a fresh registry and evaluate `instance` against
/// it, rendering in `options.output_format`.
///
/// # Errors
///
/// Returns `SchemaError` if the schema is malformed, requires an
/// unsupported vocabulary, or evaluation aborts.
pub fn evaluate(
    schema: &Value,
    instance: &Value,
    options: &EvaluationOptions,
) -> Result<Output, SchemaError> {
    let mut registry = SchemaRegistry::new().with_options(options.clone());
    let handle = registry.register(schema.clone())?;
    Ok(registry.validate(&handle, instance, options)?)
}

/// [`evaluate`] with external references pre-fetched through `retriever`.
///
/// # Errors
///
/// As [`evaluate`], plus `RefResolutionError::Cancelled` if `cancel` fires.
pub async fn evaluate_async(
    schema: &Value,
    instance: &Value,
    options: &EvaluationOptions,
    retriever: &dyn AsyncRetrieve,
    cancel: &CancellationSignal,
) -> Result<Output, SchemaError> {
    let mut registry = SchemaRegistry::new().with_options(options.clone());
    let handle = registry.register(schema.clone())?;
    let node = registry
        .evaluate_async(&handle, instance, options, retriever, cancel)
        .await?;
    Ok(node.format(options.output_format, options.retention()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluate_convenience() {
        let options = EvaluationOptions::default();
        let output = evaluate(&json!({"minimum": 10}), &json!(5), &options).unwrap();
        assert!(!output.valid());
        let output = evaluate(&json!({"minimum": 10}), &json!(15), &options).unwrap();
        assert!(output.valid());
    }

    #[test]
    fn test_evaluate_reports_malformed_schema() {
        let err = evaluate(&json!({"type": 7}), &json!(1), &EvaluationOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
    }
}
