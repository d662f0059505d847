//! # Result Model & Formatter
//!
//! [`EvaluationNode`] is the full result tree of one evaluation.
//! [`EvaluationNode::format`] renders it in one of the three output
//! formats, which serialize to the 2020-12 output shape (`valid`,
//! `evaluationPath`, `schemaLocation`, `instanceLocation`, `errors`,
//! `annotations`, `details`).
//!
//! ## Retention
//!
//! Invalid nodes always keep their errors. Annotations are filtered by the
//! [`RetentionPolicy`]: by default a node keeps its annotations only if it
//! and every ancestor are valid.

use std::collections::BTreeMap;
use std::sync::Arc;

use jsev_core::JsonPointer;
use serde::Serialize;
use serde_json::Value;

use crate::keywords::KeywordResult;
use crate::options::{AnnotationRetention, OutputFormat, RetentionPolicy};

/// One (schema node, instance location) evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationNode {
    /// Conjunction of this node's keyword verdicts.
    pub valid: bool,
    /// Keywords traversed from the evaluation root, through references.
    pub evaluation_path: JsonPointer,
    /// Absolute canonical URI of the schema node actually evaluated.
    pub schema_location: Arc<str>,
    /// Location within the instance.
    pub instance_location: JsonPointer,
    /// Failed keywords with their messages.
    pub errors: BTreeMap<String, String>,
    /// Annotations of passing keywords.
    pub annotations: BTreeMap<String, Value>,
    /// Nested evaluations, in evaluation order.
    pub children: Vec<EvaluationNode>,
}

impl EvaluationNode {
    /// A valid node with no keyword results yet.
    pub fn new(
        evaluation_path: JsonPointer,
        schema_location: Arc<str>,
        instance_location: JsonPointer,
    ) -> Self {
        Self {
            valid: true,
            evaluation_path,
            schema_location,
            instance_location,
            errors: BTreeMap::new(),
            annotations: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Fold one keyword outcome into the node.
    pub fn record(&mut self, keyword: &str, outcome: KeywordResult) {
        match outcome {
            KeywordResult::Pass(Some(annotation)) => {
                self.annotations.insert(keyword.to_string(), annotation);
            }
            KeywordResult::Pass(None) => {}
            KeywordResult::Fail(message) => {
                self.valid = false;
                if let Some(message) = message {
                    self.errors.insert(keyword.to_string(), message);
                }
            }
        }
    }

    /// Pre-order iterator over this node and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &EvaluationNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Every error message in the tree with the node that raised it.
    pub fn errors(&self) -> impl Iterator<Item = (&EvaluationNode, &str, &str)> {
        self.iter().flat_map(|node| {
            node.errors
                .iter()
                .map(move |(keyword, message)| (node, keyword.as_str(), message.as_str()))
        })
    }

    /// Render in the requested format.
    pub fn format(&self, format: OutputFormat, retention: RetentionPolicy) -> Output {
        match format {
            OutputFormat::Flag => Output::Flag(FlagOutput { valid: self.valid }),
            OutputFormat::List => {
                let mut details = Vec::new();
                flatten(self, false, retention, &mut details);
                Output::List(ListOutput {
                    valid: self.valid,
                    details,
                })
            }
            OutputFormat::Hierarchical => {
                let mut root = unit(self, false, retention);
                root.details = nested(self, false, retention);
                Output::Hierarchical(root)
            }
        }
    }
}

/// A formatted result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// `{"valid": bool}`
    Flag(FlagOutput),
    /// `{"valid": bool, "details": [unit, ...]}`
    List(ListOutput),
    /// The root unit with nested `details`.
    Hierarchical(OutputUnit),
}

impl Output {
    /// The overall verdict.
    pub fn valid(&self) -> bool {
        match self {
            Self::Flag(f) => f.valid,
            Self::List(l) => l.valid,
            Self::Hierarchical(h) => h.valid,
        }
    }

    /// Serialize to a JSON value.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Flag output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagOutput {
    /// The verdict.
    pub valid: bool,
}

/// List output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListOutput {
    /// The verdict.
    pub valid: bool,
    /// Informative units in evaluation (pre-)order.
    pub details: Vec<OutputUnit>,
}

/// One rendered node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    /// Verdict of the node.
    pub valid: bool,
    /// Keywords traversed to reach the node.
    pub evaluation_path: JsonPointer,
    /// Absolute schema location.
    pub schema_location: String,
    /// Instance location.
    pub instance_location: JsonPointer,
    /// Keyword errors.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    /// Retained annotations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, Value>,
    /// Nested units (hierarchical format only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<OutputUnit>,
}

fn retained(
    node: &EvaluationNode,
    ancestor_failed: bool,
    retention: RetentionPolicy,
) -> BTreeMap<String, Value> {
    let keep = match retention {
        RetentionPolicy::PreserveAll => true,
        RetentionPolicy::Drop(AnnotationRetention::FailedNode) => node.valid,
        RetentionPolicy::Drop(AnnotationRetention::FailedBranch) => node.valid && !ancestor_failed,
    };
    if keep {
        node.annotations.clone()
    } else {
        BTreeMap::new()
    }
}

fn unit(node: &EvaluationNode, ancestor_failed: bool, retention: RetentionPolicy) -> OutputUnit {
    OutputUnit {
        valid: node.valid,
        evaluation_path: node.evaluation_path.clone(),
        schema_location: node.schema_location.to_string(),
        instance_location: node.instance_location.clone(),
        errors: node.errors.clone(),
        annotations: retained(node, ancestor_failed, retention),
        details: Vec::new(),
    }
}

fn flatten(
    node: &EvaluationNode,
    ancestor_failed: bool,
    retention: RetentionPolicy,
    out: &mut Vec<OutputUnit>,
) {
    let unit = unit(node, ancestor_failed, retention);
    if !unit.valid || !unit.annotations.is_empty() {
        out.push(unit);
    }
    let failed = ancestor_failed || !node.valid;
    for child in &node.children {
        flatten(child, failed, retention, out);
    }
}

fn nested(
    node: &EvaluationNode,
    ancestor_failed: bool,
    retention: RetentionPolicy,
) -> Vec<OutputUnit> {
    let failed = ancestor_failed || !node.valid;
    node.children
        .iter()
        .filter_map(|child| {
            let mut unit = unit(child, failed, retention);
            unit.details = nested(child, failed, retention);
            let informative =
                !unit.errors.is_empty() || !unit.annotations.is_empty() || !unit.details.is_empty();
            informative.then_some(unit)
        })
        .collect()
}
