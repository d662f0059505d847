//! # Evaluator
//!
//! Walks an instance against a registered schema and builds the
//! [`EvaluationNode`] tree: one node per (schema node, instance location)
//! pair, with each node's validity the conjunction of its keyword
//! verdicts.
//!
//! ## Evaluation state
//!
//! Every call owns an `EvaluationState`: the dynamic scope (the stack of
//! schema resources entered so far, consulted by `$dynamicRef`), the
//! recursion depth, and whether short-circuiting is allowed. The state is
//! threaded through keyword evaluation by `&mut` and never shared between
//! calls, so concurrent evaluations against one registry are independent.
//!
//! ## Short-circuit
//!
//! When enabled, a node stops evaluating keywords as soon as it is known to
//! be invalid, and applicators stop once their own verdict is settled as a
//! failure. Nothing is skipped while a node may still pass, so the verdict
//! never depends on the output format.

use std::collections::BTreeSet;
use std::sync::Arc;

use jsev_core::{EvaluationDepthExceededError, EvaluationError, JsonPointer};
use serde_json::Value;
use url::Url;

use crate::keywords::KeywordResult;
use crate::model::{NodeBody, SchemaIndex};
use crate::options::EvaluationOptions;
use crate::output::EvaluationNode;
use crate::registry::SchemaRegistry;
use crate::resolver::SchemaHandle;
use crate::vocabulary::Dialect;

/// Keywords whose annotations name evaluated object properties.
const PROPERTY_ANNOTATIONS: [&str; 4] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
];

/// Evaluates instances against schemas of one registry.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r SchemaRegistry,
    options: &'r EvaluationOptions,
}

impl<'r> Evaluator<'r> {
    /// Bind a registry and per-call options.
    pub fn new(registry: &'r SchemaRegistry, options: &'r EvaluationOptions) -> Self {
        Self { registry, options }
    }

    /// Evaluate `instance` against `schema`.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` if a reference cannot be resolved or the
    /// recursion guard trips. Constraint violations are not errors; they
    /// are recorded in the returned tree.
    pub fn evaluate(
        &self,
        schema: &SchemaHandle,
        instance: &Value,
    ) -> Result<EvaluationNode, EvaluationError> {
        let mut state = EvaluationState {
            registry: self.registry,
            options: self.options,
            dynamic_scope: Vec::new(),
            depth: 0,
            short_circuit: self.options.effective_short_circuit(),
        };
        let result = state.evaluate_node(schema, instance, JsonPointer::root(), JsonPointer::root());
        match &result {
            Ok(node) => tracing::debug!(
                schema = %schema.uri(),
                valid = node.valid,
                "evaluation finished"
            ),
            Err(e) => tracing::debug!(schema = %schema.uri(), error = %e, "evaluation aborted"),
        }
        result
    }
}

pub(crate) struct EvaluationState<'r> {
    registry: &'r SchemaRegistry,
    options: &'r EvaluationOptions,
    dynamic_scope: Vec<Arc<Url>>,
    depth: usize,
    short_circuit: bool,
}

impl EvaluationState<'_> {
    fn evaluate_node(
        &mut self,
        target: &SchemaHandle,
        instance: &Value,
        evaluation_path: JsonPointer,
        instance_location: JsonPointer,
    ) -> Result<EvaluationNode, EvaluationError> {
        if let Some(limit) = self.options.max_recursion_depth {
            if self.depth >= limit {
                return Err(EvaluationDepthExceededError {
                    limit,
                    evaluation_path: evaluation_path.to_string(),
                    instance_location: instance_location.to_string(),
                }
                .into());
            }
        }
        self.depth += 1;
        let base = &target.meta().base;
        let entered = self.dynamic_scope.last() != Some(base);
        if entered {
            self.dynamic_scope.push(Arc::clone(base));
        }
        let result = self.evaluate_keywords(target, instance, evaluation_path, instance_location);
        if entered {
            self.dynamic_scope.pop();
        }
        self.depth -= 1;
        result
    }

    fn evaluate_keywords(
        &mut self,
        target: &SchemaHandle,
        instance: &Value,
        evaluation_path: JsonPointer,
        instance_location: JsonPointer,
    ) -> Result<EvaluationNode, EvaluationError> {
        let meta = target.meta();
        let mut result = EvaluationNode::new(
            evaluation_path,
            Arc::clone(&meta.canonical),
            instance_location,
        );
        let schema = match &target.node().body {
            NodeBody::Boolean(true) => return Ok(result),
            NodeBody::Boolean(false) => {
                result.record(
                    "false",
                    KeywordResult::fail(format!(
                        "{} is not allowed by the false schema",
                        crate::json::preview(instance)
                    )),
                );
                return Ok(result);
            }
            NodeBody::Keywords(schema) => schema,
        };

        for compiled in &schema.keywords {
            if !meta.dialect.is_active(&compiled.vocabulary) {
                if self.options.annotate_unknown_keywords {
                    if let Some(raw) = target.keyword_value(&compiled.name) {
                        result.annotations.insert(compiled.name.clone(), raw.clone());
                    }
                }
                continue;
            }
            if self.short_circuit && !result.valid {
                break;
            }
            let outcome = {
                let mut cx = KeywordContext {
                    state: self,
                    current: target,
                    result: &mut result,
                    keyword: &compiled.name,
                };
                compiled.keyword.evaluate(instance, &mut cx)?
            };
            result.record(&compiled.name, outcome);
        }

        if self.options.annotate_unknown_keywords {
            for name in &schema.unknown {
                if let Some(raw) = target.keyword_value(name) {
                    result.annotations.insert(name.clone(), raw.clone());
                }
            }
        }
        Ok(result)
    }
}

/// Items of an array already evaluated by sibling and in-place keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCoverage {
    all: bool,
    prefix: usize,
    indices: BTreeSet<usize>,
}

impl ItemCoverage {
    /// Whether the item at `index` has been evaluated.
    pub fn covers(&self, index: usize) -> bool {
        self.all || index < self.prefix || self.indices.contains(&index)
    }

    fn absorb(&mut self, keyword: &str, annotation: &Value) {
        match (keyword, annotation) {
            (_, Value::Bool(true)) => self.all = true,
            ("prefixItems", Value::Number(n)) => {
                if let Some(largest) = n.as_u64() {
                    self.prefix = self.prefix.max(largest as usize + 1);
                }
            }
            ("contains", Value::Array(indices)) => {
                self.indices
                    .extend(indices.iter().filter_map(Value::as_u64).map(|i| i as usize));
            }
            _ => {}
        }
    }
}

/// Evaluation-time view handed to a keyword.
pub struct KeywordContext<'c, 'r> {
    state: &'c mut EvaluationState<'r>,
    current: &'c SchemaHandle,
    result: &'c mut EvaluationNode,
    keyword: &'c str,
}

impl KeywordContext<'_, '_> {
    /// The keyword being evaluated.
    pub fn keyword(&self) -> &str {
        self.keyword
    }

    /// Options of the current call.
    pub fn options(&self) -> &EvaluationOptions {
        self.state.options
    }

    /// Location of the instance being evaluated.
    pub fn instance_location(&self) -> &JsonPointer {
        &self.result.instance_location
    }

    /// Base URI of the current schema node.
    pub fn base_uri(&self) -> &Url {
        &self.current.meta().base
    }

    /// Dialect of the current schema node.
    pub fn dialect(&self) -> &Dialect {
        &self.current.meta().dialect
    }

    /// Whether `format` is an assertion here.
    pub fn asserts_format(&self) -> bool {
        self.state.options.require_format_assertions || self.dialect().asserts_format()
    }

    /// Whether an applicator may stop once its failure is certain.
    pub fn short_circuit(&self) -> bool {
        self.state.short_circuit
    }

    /// Raw value of a keyword in the current schema object.
    pub fn schema_value(&self, keyword: &str) -> Option<&Value> {
        self.current.keyword_value(keyword)
    }

    /// Annotation produced by an earlier keyword of the current node.
    pub fn sibling_annotation(&self, keyword: &str) -> Option<&Value> {
        self.result.annotations.get(keyword)
    }

    /// Validity of the subschema applied by an earlier keyword of the
    /// current node (for example `if`), when it was evaluated.
    pub fn subschema_outcome(&self, keyword: &str) -> Option<bool> {
        let path = self.result.evaluation_path.join(keyword);
        self.result
            .children
            .iter()
            .find(|child| child.evaluation_path == path)
            .map(|child| child.valid)
    }

    /// Evaluate a subschema of the current document. `schema_path` is
    /// appended to the evaluation path after the keyword name and
    /// `instance_segment` to the instance location.
    ///
    /// # Errors
    ///
    /// Propagates aborting failures of the nested evaluation.
    pub fn evaluate_subschema(
        &mut self,
        schema: SchemaIndex,
        instance: &Value,
        schema_path: &[&str],
        instance_segment: Option<&str>,
    ) -> Result<bool, EvaluationError> {
        let target = self.current.at(schema);
        self.evaluate_target(&target, instance, schema_path, instance_segment)
    }

    /// Evaluate a resolved reference target at the current instance
    /// location, reporting under the keyword.
    ///
    /// # Errors
    ///
    /// Propagates aborting failures of the nested evaluation.
    pub fn evaluate_reference(
        &mut self,
        target: &SchemaHandle,
        instance: &Value,
    ) -> Result<bool, EvaluationError> {
        self.evaluate_target(target, instance, &[], None)
    }

    fn evaluate_target(
        &mut self,
        target: &SchemaHandle,
        instance: &Value,
        schema_path: &[&str],
        instance_segment: Option<&str>,
    ) -> Result<bool, EvaluationError> {
        let mut path = self.result.evaluation_path.join(self.keyword);
        for segment in schema_path {
            path.push(*segment);
        }
        let location = match instance_segment {
            Some(segment) => self.result.instance_location.join(segment),
            None => self.result.instance_location.clone(),
        };
        let child = self.state.evaluate_node(target, instance, path, location)?;
        let valid = child.valid;
        self.result.children.push(child);
        Ok(valid)
    }

    /// Resolve a `$ref` value against the current base URI.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::RefResolution` if the target is unknown
    /// and cannot be fetched.
    pub fn resolve_static(&self, reference: &str) -> Result<SchemaHandle, EvaluationError> {
        Ok(self
            .state
            .registry
            .resolve_reference(self.base_uri(), reference, self.state.options)?)
    }

    /// Resolve a `$dynamicRef` value against the current dynamic scope.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::RefResolution` if the static target is
    /// unknown and cannot be fetched.
    pub fn resolve_dynamic(&self, reference: &str) -> Result<SchemaHandle, EvaluationError> {
        Ok(self.state.registry.resolve_dynamic_reference(
            self.base_uri(),
            reference,
            &self.state.dynamic_scope,
            self.state.options,
        )?)
    }

    /// Names of properties of the current object evaluated so far by this
    /// node's keywords and by valid in-place subschemas.
    pub fn evaluated_properties(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect(self.result, &self.result.instance_location, &mut |keyword, value| {
            if PROPERTY_ANNOTATIONS.contains(&keyword) {
                if let Value::Array(list) = value {
                    names.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
                }
            }
        });
        names
    }

    /// Items of the current array evaluated so far by this node's keywords
    /// and by valid in-place subschemas.
    pub fn evaluated_items(&self) -> ItemCoverage {
        let mut coverage = ItemCoverage::default();
        collect(self.result, &self.result.instance_location, &mut |keyword, value| {
            if matches!(
                keyword,
                "prefixItems" | "items" | "contains" | "unevaluatedItems"
            ) {
                coverage.absorb(keyword, value);
            }
        });
        coverage
    }
}

/// Visit annotations of `node` and of every valid descendant at the same
/// instance location.
fn collect(node: &EvaluationNode, location: &JsonPointer, visit: &mut dyn FnMut(&str, &Value)) {
    for (keyword, value) in &node.annotations {
        visit(keyword, value);
    }
    for child in &node.children {
        if child.valid && child.instance_location == *location {
            collect(child, location, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_coverage() {
        let mut coverage = ItemCoverage::default();
        coverage.absorb("prefixItems", &json!(1));
        coverage.absorb("contains", &json!([4]));
        assert!(coverage.covers(0));
        assert!(coverage.covers(1));
        assert!(!coverage.covers(2));
        assert!(coverage.covers(4));
        coverage.absorb("items", &json!(true));
        assert!(coverage.covers(99));
    }

    #[test]
    fn test_collect_skips_invalid_and_foreign_locations() {
        let root = JsonPointer::root();
        let mut node = EvaluationNode::new(root.clone(), Arc::from("json-schema:///"), root.clone());
        node.annotations.insert("properties".into(), json!(["a"]));

        let mut valid_branch =
            EvaluationNode::new(root.join("allOf").join("0"), Arc::from("x"), root.clone());
        valid_branch.annotations.insert("properties".into(), json!(["b"]));

        let mut failed_branch =
            EvaluationNode::new(root.join("allOf").join("1"), Arc::from("y"), root.clone());
        failed_branch.valid = false;
        failed_branch.annotations.insert("properties".into(), json!(["c"]));

        let mut nested =
            EvaluationNode::new(root.join("properties").join("a"), Arc::from("z"), root.join("a"));
        nested.annotations.insert("properties".into(), json!(["d"]));

        node.children = vec![valid_branch, failed_branch, nested];

        let mut seen = Vec::new();
        collect(&node, &root, &mut |_, value| seen.push(value.clone()));
        assert_eq!(seen, vec![json!(["a"]), json!(["b"])]);
    }
}
