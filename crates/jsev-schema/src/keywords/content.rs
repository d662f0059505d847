//! Content vocabulary: `contentEncoding`, `contentMediaType` and
//! `contentSchema`. All three are annotations only; the decoded content
//! is never validated.

use std::sync::Arc;

use jsev_core::{EvaluationError, MalformedSchemaError};
use serde_json::Value;

use super::{
    expect_string, handler, CompileContext, Inert, Keyword, KeywordContext,
    KeywordHandler, KeywordResult,
};

/// Handlers of the content vocabulary.
pub fn handlers() -> Vec<Arc<dyn KeywordHandler>> {
    vec![
        handler("contentEncoding", &[], compile_text),
        handler("contentMediaType", &[], compile_text),
        handler("contentSchema", &["contentMediaType"], compile_content_schema),
    ]
}

/// The string annotations apply to string instances only.
#[derive(Debug)]
struct StringAnnotation(Value);

impl Keyword for StringAnnotation {
    fn evaluate(
        &self,
        instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        if instance.is_string() {
            Ok(KeywordResult::annotate(self.0.clone()))
        } else {
            Ok(KeywordResult::pass())
        }
    }
}

fn compile_text(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    expect_string(value, cx)?;
    Ok(Box::new(StringAnnotation(value.clone())))
}

/// The subschema is compiled so its identifiers are indexed, but it only
/// annotates, and only next to `contentMediaType`.
fn compile_content_schema(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
    cx.subschema(value, &[])?;
    if cx.sibling("contentMediaType").is_none() {
        return Ok(Box::new(Inert));
    }
    Ok(Box::new(StringAnnotation(value.clone())))
}

#[cfg(test)]
mod tests {
    use crate::model::Schema;
    use serde_json::json;

    #[test]
    fn test_shapes() {
        assert!(Schema::build(json!({"contentEncoding": 64})).is_err());
        assert!(Schema::build(json!({"contentMediaType": "application/json"})).is_ok());
        assert!(Schema::build(json!({"contentSchema": 1})).is_err());
    }

    #[test]
    fn test_content_schema_is_indexed() {
        let schema = Schema::build(json!({
            "contentMediaType": "application/json",
            "contentSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(schema.len(), 2);
    }
}
