//! # Validation Vocabulary
//!
//! Assertions on a single instance value. None of them apply subschemas;
//! each either passes silently or fails with a message naming the bound
//! that was violated. Keywords that constrain one JSON type pass for
//! instances of every other type.
//!
//! Numbers are compared by mathematical value through
//! [`crate::json::compare_numbers`], so `1` and `1.0` are interchangeable
//! in both schemas and instances. String lengths count Unicode scalar
//! values.

use std::cmp::Ordering;
use std::sync::Arc;

use jsev_core::{EvaluationError, MalformedSchemaError};
use regex::Regex;
use serde_json::{Number, Value};

use super::{
    expect_count, expect_number, expect_object, expect_string, expect_string_array, handler,
    CompileContext, Inert, Keyword, KeywordContext, KeywordHandler, KeywordResult,
};
use crate::json::{self, PRIMITIVE_TYPES};

/// Handlers of the validation vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![
        handler("type", &[], compile_type),
        handler("enum", &[], compile_enum),
        handler("const", &[], compile_const),
        handler("multipleOf", &[], compile_multiple_of),
        handler("maximum", &[], compile_maximum),
        handler("exclusiveMaximum", &[], compile_exclusive_maximum),
        handler("minimum", &[], compile_minimum),
        handler("exclusiveMinimum", &[], compile_exclusive_minimum),
        handler("maxLength", &[], compile_max_length),
        handler("minLength", &[], compile_min_length),
        handler("pattern", &[], compile_pattern),
        handler("maxItems", &[], compile_max_items),
        handler("minItems", &[], compile_min_items),
        handler("uniqueItems", &[], compile_unique_items),
        handler("maxContains", &["contains"], compile_max_contains),
        handler("minContains", &[], compile_min_contains),
        handler("maxProperties", &[], compile_max_properties),
        handler("minProperties", &[], compile_min_properties),
        handler("required", &[], compile_required),
        handler("dependentRequired", &[], compile_dependent_required),
    ]
}

// Any instance type.

#[derive(Debug)]
struct Type(Vec<String>);

impl Keyword for Type {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        if self.0.iter().any(|name| json::has_type(instance, name)) {
            return Ok(KeywordResult::pass());
        }
        let expected = match self.0.as_slice() {
            [single] => format!("'{single}'"),
            names => format!("one of {}", names.join(", ")),
        };
        Ok(KeywordResult::fail(format!(
            "{} is of type '{}', expected {expected}",
            json::preview(instance),
            json::type_name(instance)
        )))
    }
}

#[derive(Debug)]
struct Enum(Vec<Value>);

impl Keyword for Enum {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        if self.0.iter().any(|allowed| json::equal(allowed, instance)) {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "{} is not one of the {} allowed values",
                json::preview(instance),
                self.0.len()
            )))
        }
    }
}

#[derive(Debug)]
struct Const(Value);

impl Keyword for Const {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        if json::equal(&self.0, instance) {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "{} does not equal {}",
                json::preview(instance),
                json::preview(&self.0)
            )))
        }
    }
}

// Numbers.

#[derive(Debug)]
struct MultipleOf(Number);

impl Keyword for MultipleOf {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Number(n) = instance else {
            return Ok(KeywordResult::pass());
        };
        if json::is_multiple_of(n, &self.0) {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!("{n} is not a multiple of {}", self.0)))
        }
    }
}

/// One numeric bound. `accepts` lists the orderings of `instance` against
/// `limit` that satisfy the keyword.
#[derive(Debug)]
struct Bound {
    limit: Number,
    accepts: &'static [Ordering],
    relation: &'static str,
}

impl Keyword for Bound {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Number(n) = instance else {
            return Ok(KeywordResult::pass());
        };
        match json::compare_numbers(n, &self.limit) {
            Some(ordering) if self.accepts.contains(&ordering) => Ok(KeywordResult::pass()),
            _ => Ok(KeywordResult::fail(format!(
                "{n} is not {} {}",
                self.relation, self.limit
            ))),
        }
    }
}

// Strings.

#[derive(Debug)]
struct Length {
    limit: u64,
    max: bool,
}

impl Keyword for Length {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::String(s) = instance else {
            return Ok(KeywordResult::pass());
        };
        let length = s.chars().count() as u64;
        Ok(check_count(length, self.limit, self.max, "characters"))
    }
}

#[derive(Debug)]
struct Pattern {
    source: String,
    regex: Regex,
}

impl Keyword for Pattern {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::String(s) = instance else {
            return Ok(KeywordResult::pass());
        };
        if self.regex.is_match(s) {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "{} does not match '{}'",
                json::preview(instance),
                self.source
            )))
        }
    }
}

// Arrays.

#[derive(Debug)]
struct ItemCount {
    limit: u64,
    max: bool,
}

impl Keyword for ItemCount {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        Ok(check_count(items.len() as u64, self.limit, self.max, "items"))
    }
}

#[derive(Debug)]
struct UniqueItems;

impl Keyword for UniqueItems {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        for (i, a) in items.iter().enumerate() {
            if let Some(j) = items[i + 1..].iter().position(|b| json::equal(a, b)) {
                return Ok(KeywordResult::fail(format!(
                    "items at indices {i} and {} are equal",
                    i + 1 + j
                )));
            }
        }
        Ok(KeywordResult::pass())
    }
}

/// Upper bound on the number of items `contains` matched.
#[derive(Debug)]
struct MaxContains(u64);

impl Keyword for MaxContains {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        let matched = match cx.sibling_annotation("contains") {
            Some(Value::Bool(true)) => items.len() as u64,
            Some(Value::Array(indices)) => indices.len() as u64,
            _ => return Ok(KeywordResult::pass()),
        };
        if matched <= self.0 {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "{matched} items match the contains subschema, more than the maximum of {}",
                self.0
            )))
        }
    }
}

// Objects.

#[derive(Debug)]
struct PropertyCount {
    limit: u64,
    max: bool,
}

impl Keyword for PropertyCount {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        Ok(check_count(map.len() as u64, self.limit, self.max, "properties"))
    }
}

#[derive(Debug)]
struct Required(Vec<String>);

impl Keyword for Required {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let missing: Vec<&str> = self
            .0
            .iter()
            .filter(|name| !map.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "missing required properties: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug)]
struct DependentRequired(Vec<(String, Vec<String>)>);

impl Keyword for DependentRequired {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let mut problems = Vec::new();
        for (trigger, dependents) in &self.0 {
            if !map.contains_key(trigger) {
                continue;
            }
            for dependent in dependents {
                if !map.contains_key(dependent) {
                    problems.push(format!("'{dependent}' (required by '{trigger}')"));
                }
            }
        }
        if problems.is_empty() {
            Ok(KeywordResult::pass())
        } else {
            Ok(KeywordResult::fail(format!(
                "missing dependent properties: {}",
                problems.join(", ")
            )))
        }
    }
}

fn check_count(actual: u64, limit: u64, max: bool, unit: &str) -> KeywordResult {
    if max && actual > limit {
        KeywordResult::fail(format!("has {actual} {unit}, more than the maximum of {limit}"))
    } else if !max && actual < limit {
        KeywordResult::fail(format!("has {actual} {unit}, fewer than the minimum of {limit}"))
    } else {
        KeywordResult::pass()
    }
}

// Compilation.

fn compile_type(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let names = match value {
        Value::String(name) => vec![name.clone()],
        Value::Array(_) => {
            let names = expect_string_array(value, cx)?;
            if names.is_empty() {
                return Err(cx.malformed("expected at least one type name"));
            }
            for (i, name) in names.iter().enumerate() {
                if names[..i].contains(name) {
                    return Err(cx.malformed(format!("type '{name}' is listed twice")));
                }
            }
            names
        }
        _ => return Err(cx.malformed("expected a type name or an array of type names")),
    };
    if let Some(unknown) = names.iter().find(|n| !PRIMITIVE_TYPES.contains(&n.as_str())) {
        return Err(cx.malformed(format!("'{unknown}' is not a JSON Schema type")));
    }
    Ok(Box::new(Type(names)))
}

fn compile_enum(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let values = value
        .as_array()
        .ok_or_else(|| cx.malformed("expected an array"))?;
    Ok(Box::new(Enum(values.clone())))
}

fn compile_const(
    value: &Value,
    _cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Const(value.clone())))
}

fn compile_multiple_of(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let divisor = expect_number(value, cx)?;
    if !divisor.as_f64().is_some_and(|d| d > 0.0) {
        return Err(cx.malformed("expected a number strictly greater than 0"));
    }
    Ok(Box::new(MultipleOf(divisor.clone())))
}

fn bound(
    value: &Value,
    cx: &CompileContext<'_, '_>,
    accepts: &'static [Ordering],
    relation: &'static str,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Bound {
        limit: expect_number(value, cx)?.clone(),
        accepts,
        relation,
    }))
}

fn compile_maximum(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    bound(value, cx, &[Ordering::Less, Ordering::Equal], "less than or equal to")
}

fn compile_exclusive_maximum(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    bound(value, cx, &[Ordering::Less], "less than")
}

fn compile_minimum(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    bound(value, cx, &[Ordering::Greater, Ordering::Equal], "greater than or equal to")
}

fn compile_exclusive_minimum(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    bound(value, cx, &[Ordering::Greater], "greater than")
}

fn compile_max_length(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Length {
        limit: expect_count(value, cx)?,
        max: true,
    }))
}

fn compile_min_length(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Length {
        limit: expect_count(value, cx)?,
        max: false,
    }))
}

fn compile_pattern(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let source = expect_string(value, cx)?;
    Ok(Box::new(Pattern {
        regex: cx.regex(source)?,
        source: source.to_string(),
    }))
}

fn compile_max_items(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(ItemCount {
        limit: expect_count(value, cx)?,
        max: true,
    }))
}

fn compile_min_items(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(ItemCount {
        limit: expect_count(value, cx)?,
        max: false,
    }))
}

fn compile_unique_items(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    if super::expect_bool(value, cx)? {
        Ok(Box::new(UniqueItems))
    } else {
        Ok(Box::new(Inert))
    }
}

fn compile_max_contains(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(MaxContains(expect_count(value, cx)?)))
}

/// Read by `contains` at compile time.
fn compile_min_contains(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    expect_count(value, cx)?;
    Ok(Box::new(Inert))
}

fn compile_max_properties(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(PropertyCount {
        limit: expect_count(value, cx)?,
        max: true,
    }))
}

fn compile_min_properties(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(PropertyCount {
        limit: expect_count(value, cx)?,
        max: false,
    }))
}

fn compile_required(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Required(expect_string_array(value, cx)?)))
}

fn compile_dependent_required(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let map = expect_object(value, cx)?;
    let mut dependencies = Vec::with_capacity(map.len());
    for (trigger, dependents) in map {
        dependencies.push((trigger.clone(), expect_string_array(dependents, cx)?));
    }
    Ok(Box::new(DependentRequired(dependencies)))
}

#[cfg(test)]
mod tests {
    use crate::model::Schema;
    use serde_json::json;

    #[test]
    fn test_shapes() {
        assert!(Schema::build(json!({"type": "float"})).is_err());
        assert!(Schema::build(json!({"type": []})).is_err());
        assert!(Schema::build(json!({"type": ["string", "string"]})).is_err());
        assert!(Schema::build(json!({"type": ["string", "null"]})).is_ok());
        assert!(Schema::build(json!({"enum": 1})).is_err());
        assert!(Schema::build(json!({"multipleOf": 0})).is_err());
        assert!(Schema::build(json!({"multipleOf": -2})).is_err());
        assert!(Schema::build(json!({"multipleOf": 0.5})).is_ok());
        assert!(Schema::build(json!({"minimum": "1"})).is_err());
        assert!(Schema::build(json!({"maxLength": 1.5})).is_err());
        assert!(Schema::build(json!({"maxLength": 2.0})).is_ok());
        assert!(Schema::build(json!({"pattern": "["})).is_err());
        assert!(Schema::build(json!({"uniqueItems": "yes"})).is_err());
        assert!(Schema::build(json!({"required": [1]})).is_err());
        assert!(Schema::build(json!({"dependentRequired": {"a": "b"}})).is_err());
    }
}
