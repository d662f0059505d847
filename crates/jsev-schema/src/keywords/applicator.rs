//! # Applicator Vocabulary
//!
//! Keywords that apply subschemas to the instance or its members and
//! combine the child verdicts.
//!
//! | Keyword                | Combination                                  |
//! |------------------------|----------------------------------------------|
//! | `allOf`                | every branch valid                           |
//! | `anyOf`                | at least one branch valid                    |
//! | `oneOf`                | exactly one branch valid                     |
//! | `not`                  | the branch invalid                           |
//! | `if`/`then`/`else`     | `then` when `if` holds, else `else`          |
//! | `properties` & co.     | every applied member valid                   |
//! | `contains`             | at least `minContains` items valid           |
//!
//! Failure messages are only raised where the children do not already
//! explain the failure (`anyOf`, `oneOf`, `not`, `contains`).
//!
//! ## Annotations
//!
//! `properties`, `patternProperties` and `additionalProperties` annotate
//! with the names they applied to; `prefixItems` with the largest index it
//! applied to (or `true` for all); `items` with `true`; `contains` with the
//! matching indices (or `true` for all). The unevaluated keywords read them.

use std::sync::Arc;

use jsev_core::{EvaluationError, MalformedSchemaError};
use regex::Regex;
use serde_json::Value;

use super::{
    expect_count, expect_schema_array, expect_schema_map, handler, CompileContext, Keyword,
    KeywordContext, KeywordHandler, KeywordResult, SchemaIndex,
};

/// Handlers of the applicator vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![
        handler("allOf", &[], compile_all_of),
        handler("anyOf", &[], compile_any_of),
        handler("oneOf", &[], compile_one_of),
        handler("not", &[], compile_not),
        handler("if", &[], compile_if),
        handler("then", &["if"], compile_then),
        handler("else", &["if"], compile_else),
        handler("dependentSchemas", &[], compile_dependent_schemas),
        handler("prefixItems", &[], compile_prefix_items),
        handler("items", &["prefixItems"], compile_items),
        handler("contains", &[], compile_contains),
        handler("properties", &[], compile_properties),
        handler("patternProperties", &[], compile_pattern_properties),
        handler(
            "additionalProperties",
            &["properties", "patternProperties"],
            compile_additional_properties,
        ),
        handler("propertyNames", &[], compile_property_names),
    ]
}

// In-place combinators.

#[derive(Debug)]
struct AllOf(Vec<SchemaIndex>);

impl Keyword for AllOf {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let mut valid = true;
        for (i, branch) in self.0.iter().enumerate() {
            if !cx.evaluate_subschema(*branch, instance, &[i.to_string().as_str()], None)? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        Ok(KeywordResult::from_children(valid))
    }
}

#[derive(Debug)]
struct AnyOf(Vec<SchemaIndex>);

impl Keyword for AnyOf {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        // Every branch runs: annotations of all passing branches feed the
        // unevaluated keywords.
        let mut any = false;
        for (i, branch) in self.0.iter().enumerate() {
            any |= cx.evaluate_subschema(*branch, instance, &[i.to_string().as_str()], None)?;
        }
        if any {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "{} is not valid against any of the {} subschemas",
                crate::json::preview(instance),
                self.0.len()
            )))
        }
    }
}

#[derive(Debug)]
struct OneOf(Vec<SchemaIndex>);

impl Keyword for OneOf {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let mut matched = Vec::new();
        for (i, branch) in self.0.iter().enumerate() {
            if cx.evaluate_subschema(*branch, instance, &[i.to_string().as_str()], None)? {
                matched.push(i);
                if matched.len() > 1 && cx.short_circuit() {
                    break;
                }
            }
        }
        Ok(match matched.as_slice() {
            [_] => KeywordResult::pass(),
            [] => KeywordResult::fail(format!(
                "{} is not valid against any of the {} subschemas",
                crate::json::preview(instance),
                self.0.len()
            )),
            [first, second, ..] => KeywordResult::fail(format!(
                "{} is valid against more than one subschema (indices {first} and {second})",
                crate::json::preview(instance)
            )),
        })
    }
}

#[derive(Debug)]
struct Not(SchemaIndex);

impl Keyword for Not {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        if cx.evaluate_subschema(self.0, instance, &[], None)? {
            Ok(KeywordResult::fail(format!(
                "{} must not be valid against the subschema",
                crate::json::preview(instance)
            )))
        } else {
            Ok(KeywordResult::pass())
        }
    }
}

/// `if` records its verdict as a child node and never fails.
#[derive(Debug)]
struct If(SchemaIndex);

impl Keyword for If {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        cx.evaluate_subschema(self.0, instance, &[], None)?;
        Ok(KeywordResult::pass())
    }
}

/// `then` (`when == true`) or `else` (`when == false`).
#[derive(Debug)]
struct Branch {
    schema: SchemaIndex,
    when: bool,
}

impl Keyword for Branch {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        if cx.subschema_outcome("if") != Some(self.when) {
            return Ok(KeywordResult::pass());
        }
        let valid = cx.evaluate_subschema(self.schema, instance, &[], None)?;
        Ok(KeywordResult::from_children(valid))
    }
}

#[derive(Debug)]
struct DependentSchemas(Vec<(String, SchemaIndex)>);

impl Keyword for DependentSchemas {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut valid = true;
        for (name, schema) in &self.0 {
            if !map.contains_key(name) {
                continue;
            }
            if !cx.evaluate_subschema(*schema, instance, &[name.as_str()], None)? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        Ok(KeywordResult::from_children(valid))
    }
}

// Arrays.

#[derive(Debug)]
struct PrefixItems(Vec<SchemaIndex>);

impl Keyword for PrefixItems {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut valid = true;
        for (i, (schema, item)) in self.0.iter().zip(items).enumerate() {
            let index = i.to_string();
            if !cx.evaluate_subschema(*schema, item, &[index.as_str()], Some(index.as_str()))? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        if !valid {
            return Ok(KeywordResult::fail_silently());
        }
        Ok(match items.len() {
            0 => KeywordResult::pass(),
            n if n <= self.0.len() => KeywordResult::annotate(Value::Bool(true)),
            _ => KeywordResult::annotate(Value::from(self.0.len() - 1)),
        })
    }
}

#[derive(Debug)]
struct Items {
    schema: SchemaIndex,
    prefix: usize,
}

impl Keyword for Items {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        if items.len() <= self.prefix {
            return Ok(KeywordResult::pass());
        }
        let mut valid = true;
        for (i, item) in items.iter().enumerate().skip(self.prefix) {
            let index = i.to_string();
            if !cx.evaluate_subschema(self.schema, item, &[], Some(index.as_str()))? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        if valid {
            Ok(KeywordResult::annotate(Value::Bool(true)))
        } else {
            Ok(KeywordResult::fail_silently())
        }
    }
}

#[derive(Debug)]
struct Contains {
    schema: SchemaIndex,
    min: u64,
}

impl Keyword for Contains {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut matched = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let index = i.to_string();
            if cx.evaluate_subschema(self.schema, item, &[], Some(index.as_str()))? {
                matched.push(i);
            }
        }
        if (matched.len() as u64) < self.min {
            let message = if matched.is_empty() {
                "no items match the contains subschema".to_string()
            } else {
                format!(
                    "{} items match the contains subschema, fewer than the minimum of {}",
                    matched.len(),
                    self.min
                )
            };
            return Ok(KeywordResult::fail(message));
        }
        if matched.len() == items.len() {
            Ok(KeywordResult::annotate(Value::Bool(true)))
        } else {
            Ok(KeywordResult::annotate(Value::Array(
                matched.into_iter().map(Value::from).collect(),
            )))
        }
    }
}

// Objects.

#[derive(Debug)]
struct Properties(Vec<(String, SchemaIndex)>);

impl Keyword for Properties {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut valid = true;
        let mut applied = Vec::new();
        for (name, schema) in &self.0 {
            let Some(member) = map.get(name) else {
                continue;
            };
            applied.push(Value::String(name.clone()));
            if !cx.evaluate_subschema(*schema, member, &[name.as_str()], Some(name.as_str()))? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        if valid {
            Ok(KeywordResult::annotate(Value::Array(applied)))
        } else {
            Ok(KeywordResult::fail_silently())
        }
    }
}

#[derive(Debug)]
struct PatternProperties(Vec<(String, Regex, SchemaIndex)>);

impl Keyword for PatternProperties {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut valid = true;
        let mut applied = Vec::new();
        'members: for (name, member) in map {
            let mut matched = false;
            for (pattern, regex, schema) in &self.0 {
                if !regex.is_match(name) {
                    continue;
                }
                matched = true;
                if !cx.evaluate_subschema(*schema, member, &[pattern.as_str()], Some(name.as_str()))? {
                    valid = false;
                    if cx.short_circuit() {
                        break 'members;
                    }
                }
            }
            if matched {
                applied.push(Value::String(name.clone()));
            }
        }
        if valid {
            Ok(KeywordResult::annotate(Value::Array(applied)))
        } else {
            Ok(KeywordResult::fail_silently())
        }
    }
}

#[derive(Debug)]
struct AdditionalProperties {
    schema: SchemaIndex,
    properties: Vec<String>,
    patterns: Vec<Regex>,
}

impl AdditionalProperties {
    fn is_additional(&self, name: &str) -> bool {
        !self.properties.iter().any(|p| p == name) && !self.patterns.iter().any(|r| r.is_match(name))
    }
}

impl Keyword for AdditionalProperties {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut valid = true;
        let mut applied = Vec::new();
        for (name, member) in map.iter().filter(|(name, _)| self.is_additional(name)) {
            applied.push(Value::String(name.clone()));
            if !cx.evaluate_subschema(self.schema, member, &[], Some(name.as_str()))? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        if valid {
            Ok(KeywordResult::annotate(Value::Array(applied)))
        } else {
            Ok(KeywordResult::fail_silently())
        }
    }
}

#[derive(Debug)]
struct PropertyNames(SchemaIndex);

impl Keyword for PropertyNames {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut valid = true;
        for name in map.keys() {
            let as_instance = Value::String(name.clone());
            if !cx.evaluate_subschema(self.0, &as_instance, &[], Some(name.as_str()))? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        Ok(KeywordResult::from_children(valid))
    }
}

// Compilation.

fn compile_all_of(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(AllOf(expect_schema_array(value, cx)?)))
}

fn compile_any_of(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(AnyOf(expect_schema_array(value, cx)?)))
}

fn compile_one_of(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(OneOf(expect_schema_array(value, cx)?)))
}

fn compile_not(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Not(cx.subschema(value, &[])?)))
}

fn compile_if(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(If(cx.subschema(value, &[])?)))
}

fn compile_then(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Branch {
        schema: cx.subschema(value, &[])?,
        when: true,
    }))
}

fn compile_else(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Branch {
        schema: cx.subschema(value, &[])?,
        when: false,
    }))
}

fn compile_dependent_schemas(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(DependentSchemas(expect_schema_map(value, cx)?)))
}

fn compile_prefix_items(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(PrefixItems(expect_schema_array(value, cx)?)))
}

fn compile_items(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let prefix = cx
        .sibling("prefixItems")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    Ok(Box::new(Items {
        schema: cx.subschema(value, &[])?,
        prefix,
    }))
}

fn compile_contains(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let min = match cx.sibling("minContains").cloned() {
        Some(min) => expect_count(&min, cx)?,
        None => 1,
    };
    Ok(Box::new(Contains {
        schema: cx.subschema(value, &[])?,
        min,
    }))
}

fn compile_properties(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Properties(expect_schema_map(value, cx)?)))
}

fn compile_pattern_properties(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let map = value
        .as_object()
        .ok_or_else(|| cx.malformed("expected an object of schemas"))?;
    let mut compiled = Vec::with_capacity(map.len());
    for (pattern, schema) in map {
        let regex = cx.regex(pattern)?;
        compiled.push((pattern.clone(), regex, cx.subschema(schema, &[pattern.as_str()])?));
    }
    Ok(Box::new(PatternProperties(compiled)))
}

fn compile_additional_properties(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let properties = cx
        .sibling("properties")
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    let patterns: Vec<String> = cx
        .sibling("patternProperties")
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    let patterns = patterns
        .iter()
        .map(|pattern| cx.regex(pattern))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Box::new(AdditionalProperties {
        schema: cx.subschema(value, &[])?,
        properties,
        patterns,
    }))
}

fn compile_property_names(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(PropertyNames(cx.subschema(value, &[])?)))
}
