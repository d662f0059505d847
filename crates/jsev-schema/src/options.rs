//! # Evaluation Options
//!
//! Per-call configuration. `EvaluationOptions` deserializes from the
//! camelCase keys callers put in configuration files, so the CLI and
//! library users share one representation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::retrieve::Retrieve;

/// Base URI assigned to documents that do not declare an absolute `$id`.
pub const DEFAULT_BASE_URI: &str = "json-schema:///";

/// Default ceiling on nested schema evaluations.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 256;

/// Rendering of an evaluation result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A single boolean.
    Flag,
    /// Every informative node, flattened in evaluation order.
    #[default]
    List,
    /// The nested result tree, pruned to informative nodes.
    Hierarchical,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "flag",
            Self::List => "list",
            Self::Hierarchical => "hierarchical",
        })
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flag" => Ok(Self::Flag),
            "list" | "basic" => Ok(Self::List),
            "hierarchical" | "verbose" => Ok(Self::Hierarchical),
            other => Err(format!(
                "unknown output format '{other}' (expected flag, list, or hierarchical)"
            )),
        }
    }
}

/// Which annotations survive formatting when part of the tree failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationRetention {
    /// Drop annotations of every invalid node and of all nodes beneath it.
    #[default]
    FailedBranch,
    /// Drop annotations of invalid nodes only; valid descendants of an
    /// invalid node keep theirs.
    FailedNode,
}

/// Effective retention after `preserveDroppedAnnotations` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep every annotation.
    PreserveAll,
    /// Apply the given rule.
    Drop(AnnotationRetention),
}

/// Configuration for one `evaluate` call.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluationOptions {
    /// Output rendering.
    pub output_format: OutputFormat,
    /// Treat `format` as an assertion regardless of the dialect.
    pub require_format_assertions: bool,
    /// Keep unknown keywords as inert data instead of rejecting the schema.
    pub allow_unknown_keywords: bool,
    /// Maximum nesting of schema evaluations; `None` disables the guard.
    pub max_recursion_depth: Option<usize>,
    /// Keep annotations from failed branches in the formatted output.
    pub preserve_dropped_annotations: bool,
    /// Base URI for documents without an absolute `$id`.
    pub default_base_uri: String,
    /// Retention rule applied when `preserve_dropped_annotations` is off.
    pub annotation_retention: AnnotationRetention,
    /// Stop evaluating a node once it is known to be invalid, in flag format.
    pub short_circuit: bool,
    /// Short-circuit in every output format, trading detail for speed.
    pub force_short_circuit: bool,
    /// Report unknown keywords as annotations carrying their raw value.
    pub annotate_unknown_keywords: bool,
    /// Synchronous fetch hook for documents not in the registry.
    #[serde(skip)]
    pub external_fetch: Option<Arc<dyn Retrieve>>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            require_format_assertions: false,
            allow_unknown_keywords: true,
            max_recursion_depth: Some(DEFAULT_MAX_RECURSION_DEPTH),
            preserve_dropped_annotations: false,
            default_base_uri: DEFAULT_BASE_URI.to_string(),
            annotation_retention: AnnotationRetention::default(),
            short_circuit: true,
            force_short_circuit: false,
            annotate_unknown_keywords: false,
            external_fetch: None,
        }
    }
}

impl fmt::Debug for EvaluationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationOptions")
            .field("output_format", &self.output_format)
            .field("require_format_assertions", &self.require_format_assertions)
            .field("allow_unknown_keywords", &self.allow_unknown_keywords)
            .field("max_recursion_depth", &self.max_recursion_depth)
            .field("preserve_dropped_annotations", &self.preserve_dropped_annotations)
            .field("default_base_uri", &self.default_base_uri)
            .field("annotation_retention", &self.annotation_retention)
            .field("short_circuit", &self.short_circuit)
            .field("force_short_circuit", &self.force_short_circuit)
            .field("annotate_unknown_keywords", &self.annotate_unknown_keywords)
            .field("external_fetch", &self.external_fetch.is_some())
            .finish()
    }
}

impl EvaluationOptions {
    /// Set the output format.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Assert `format` values regardless of dialect.
    pub fn with_format_assertions(mut self, enabled: bool) -> Self {
        self.require_format_assertions = enabled;
        self
    }

    /// Set (or with `None`, disable) the recursion guard.
    pub fn with_max_recursion_depth(mut self, depth: Option<usize>) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Install a synchronous fetch hook.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retrieve>) -> Self {
        self.external_fetch = Some(retriever);
        self
    }

    /// Whether evaluation may stop at the first certain failure.
    pub fn effective_short_circuit(&self) -> bool {
        self.force_short_circuit
            || (self.short_circuit && self.output_format == OutputFormat::Flag)
    }

    /// The retention rule the formatter applies.
    pub fn retention(&self) -> RetentionPolicy {
        if self.preserve_dropped_annotations {
            RetentionPolicy::PreserveAll
        } else {
            RetentionPolicy::Drop(self.annotation_retention)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = EvaluationOptions::default();
        assert_eq!(opts.output_format, OutputFormat::List);
        assert!(opts.allow_unknown_keywords);
        assert_eq!(opts.max_recursion_depth, Some(256));
        assert_eq!(opts.default_base_uri, DEFAULT_BASE_URI);
        assert!(!opts.effective_short_circuit());
        assert_eq!(
            opts.retention(),
            RetentionPolicy::Drop(AnnotationRetention::FailedBranch)
        );
    }

    #[test]
    fn test_short_circuit_only_in_flag_unless_forced() {
        let flag = EvaluationOptions::default().with_output_format(OutputFormat::Flag);
        assert!(flag.effective_short_circuit());

        let mut list = EvaluationOptions::default();
        list.force_short_circuit = true;
        assert!(list.effective_short_circuit());

        let mut flag_off = flag.clone();
        flag_off.short_circuit = false;
        assert!(!flag_off.effective_short_circuit());
    }

    #[test]
    fn test_deserialize_camel_case_config() {
        let raw = serde_json::json!({
            "outputFormat": "hierarchical",
            "requireFormatAssertions": true,
            "maxRecursionDepth": null,
            "defaultBaseUri": "https://example.com/schemas/",
            "annotationRetention": "failedNode"
        });
        let opts: EvaluationOptions = serde_json::from_value(raw).unwrap();
        assert_eq!(opts.output_format, OutputFormat::Hierarchical);
        assert!(opts.require_format_assertions);
        assert_eq!(opts.max_recursion_depth, None);
        assert_eq!(opts.default_base_uri, "https://example.com/schemas/");
        assert_eq!(opts.annotation_retention, AnnotationRetention::FailedNode);
        assert!(opts.allow_unknown_keywords);
    }

    #[test]
    fn test_preserve_overrides_retention() {
        let mut opts = EvaluationOptions::default();
        opts.preserve_dropped_annotations = true;
        assert_eq!(opts.retention(), RetentionPolicy::PreserveAll);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("FLAG".parse::<OutputFormat>().unwrap(), OutputFormat::Flag);
        assert_eq!("basic".parse::<OutputFormat>().unwrap(), OutputFormat::List);
        assert!("tree".parse::<OutputFormat>().is_err());
    }
}
