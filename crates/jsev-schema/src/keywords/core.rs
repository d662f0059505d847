//! Core vocabulary: `$ref`, `$dynamicRef`, `$defs`, `$comment` and
//! `$vocabulary`. The identity keywords (`$id`, `$schema`, `$anchor`,
//! `$dynamicAnchor`) are consumed by the schema model.

use std::sync::Arc;

use jsev_core::{EvaluationError, MalformedSchemaError};
use serde_json::Value;
use url::Url;

use super::{
    expect_object, expect_schema_map, expect_string, handler, CompileContext, Inert, Keyword,
    KeywordContext, KeywordHandler, KeywordResult,
};

/// Handlers of the core vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![
        handler("$ref", &[], compile_ref),
        handler("$dynamicRef", &[], compile_dynamic_ref),
        handler("$defs", &[], compile_defs),
        handler("$comment", &[], compile_comment),
        handler("$vocabulary", &[], compile_vocabulary),
    ]
}

#[derive(Debug)]
struct Ref {
    reference: String,
}

impl Keyword for Ref {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let target = cx.resolve_static(&self.reference)?;
        let valid = cx.evaluate_reference(&target, instance)?;
        Ok(KeywordResult::from_children(valid))
    }
}

#[derive(Debug)]
struct DynamicRef {
    reference: String,
}

impl Keyword for DynamicRef {
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        let target = cx.resolve_dynamic(&self.reference)?;
        let valid = cx.evaluate_reference(&target, instance)?;
        Ok(KeywordResult::from_children(valid))
    }
}

fn reference(value: &Value, cx: &CompileContext<'_, '_>) -> Result<String, MalformedSchemaError> {
    let reference = expect_string(value, cx)?;
    let scratch = Url::parse("json-schema:///").map_err(|e| cx.malformed(e.to_string()))?;
    scratch
        .join(reference)
        .map_err(|e| cx.malformed(format!("'{reference}' is not a valid URI reference: {e}")))?;
    Ok(reference.to_string())
}

fn compile_ref(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Ref {
        reference: reference(value, cx)?,
    }))
}

fn compile_dynamic_ref(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(DynamicRef {
        reference: reference(value, cx)?,
    }))
}

fn compile_defs(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    expect_schema_map(value, cx)?;
    Ok(Box::new(Inert))
}

fn compile_comment(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    expect_string(value, cx)?;
    Ok(Box::new(Inert))
}

fn compile_vocabulary(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    let declaration = expect_object(value, cx)?;
    for (uri, required) in declaration {
        if Url::parse(uri).is_err() {
            return Err(cx.malformed(format!("vocabulary '{uri}' is not an absolute URI")));
        }
        if !required.is_boolean() {
            return Err(cx.malformed(format!("vocabulary '{uri}' must map to a boolean")));
        }
    }
    Ok(Box::new(Inert))
}
