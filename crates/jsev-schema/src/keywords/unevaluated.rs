//! Unevaluated vocabulary: `unevaluatedItems` and `unevaluatedProperties`.
//!
//! Both run after every other keyword of their schema object and apply to
//! the members no sibling keyword or valid in-place subschema has
//! evaluated. Coverage is read from annotations, so a failing `anyOf`
//! branch contributes nothing.

use std::sync::Arc;

use jsev_core::{EvaluationError, MalformedSchemaError};
use serde_json::Value;

use super::{
    handler, CompileContext, Keyword, KeywordContext, KeywordHandler, KeywordResult, SchemaIndex,
};

/// Handlers of the unevaluated vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![
        handler("unevaluatedItems", &["*"], compile_unevaluated_items),
        handler("unevaluatedProperties", &["*"], compile_unevaluated_properties),
    ]
}

#[derive(Debug)]
struct UnevaluatedItems(SchemaIndex);

impl Keyword for UnevaluatedItems {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Array(items) = instance else {
            return Ok(KeywordResult::pass());
        };
        let coverage = cx.evaluated_items();
        let mut valid = true;
        let mut applied = false;
        for (i, item) in items.iter().enumerate() {
            if coverage.covers(i) {
                continue;
            }
            applied = true;
            let index = i.to_string();
            if !cx.evaluate_subschema(self.0, item, &[], Some(index.as_str()))? {
                valid = false;
                if cx.short_circuit() {
                    break;
                }
            }
        }
        Ok(match (valid, applied) {
            (false, _) => KeywordResult::fail_silently(),
            (true, true) => KeywordResult::annotate(Value::Bool(true)),
            (true, false) => KeywordResult::pass(),
        })
    }
}

#[derive(Debug)]
struct UnevaluatedProperties(SchemaIndex);

impl Keyword for UnevaluatedProperties {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let Value::Object(map) = instance else {
            return Ok(KeywordResult::pass());
        };
        let evaluated = cx.evaluated_properties();
        let mut valid = true;
        let mut applied = Vec::new();
        for (name, member) in map.iter().filter(|(name, _)| !evaluated.contains(*name)) {
            applied.push(Value::String(name.clone()));
            if !cx.evaluate_subschema(self.0, member, &[], Some(name.as_str()))? {
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

fn compile_unevaluated_items(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(UnevaluatedItems(cx.subschema(value, &[])?)))
}

fn compile_unevaluated_properties(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(UnevaluatedProperties(cx.subschema(value, &[])?)))
}
