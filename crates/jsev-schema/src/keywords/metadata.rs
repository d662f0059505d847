//! Meta-data vocabulary. Every keyword annotates with its own value.

use std::sync::Arc;

use jsev_core::MalformedSchemaError;
use serde_json::Value;

use super::{
    expect_bool, expect_string, handler, Annotation, CompileContext, Keyword, KeywordHandler,
};

/// Handlers of the meta-data vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![
        handler("title", &[], compile_text),
        handler("description", &[], compile_text),
        handler("default", &[], compile_any),
        handler("deprecated", &[], compile_flag),
        handler("readOnly", &[], compile_flag),
        handler("writeOnly", &[], compile_flag),
        handler("examples", &[], compile_examples),
    ]
}

fn compile_text(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    expect_string(value, cx)?;
    Ok(Box::new(Annotation(value.clone())))
}

fn compile_any(
    value: &Value,
    _cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    Ok(Box::new(Annotation(value.clone())))
}

fn compile_flag(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    expect_bool(value, cx)?;
    Ok(Box::new(Annotation(value.clone())))
}

fn compile_examples(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    if !value.is_array() {
        return Err(cx.malformed("expected an array"));
    }
    Ok(Box::new(Annotation(value.clone())))
}

#[cfg(test)]
mod tests {
    use crate::model::Schema;
    use serde_json::json;

    #[test]
    fn test_shapes() {
        assert!(Schema::build(json!({"title": 1})).is_err());
        assert!(Schema::build(json!({"readOnly": "no"})).is_err());
        assert!(Schema::build(json!({"examples": {}})).is_err());
        assert!(Schema::build(json!({"default": null, "examples": [1, "a"]})).is_ok());
    }
}
