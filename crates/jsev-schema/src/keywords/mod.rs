//! # Keywords
//!
//! The extension point of the engine. A [`KeywordHandler`] compiles the
//! raw value of one keyword into a [`Keyword`]; the keyword is evaluated
//! against instances through a [`KeywordContext`] that exposes sibling
//! annotations, subschema evaluation and reference resolution.
//!
//! Handlers are grouped into vocabularies and registered in the
//! [`VocabularyRegistry`](crate::vocabulary::VocabularyRegistry). The
//! built-in 2020-12 vocabularies live in the submodules.

use std::fmt;
use std::sync::Arc;

use jsev_core::{EvaluationError, MalformedSchemaError};
use serde_json::{Map, Number, Value};

pub use crate::evaluator::{ItemCoverage, KeywordContext};
pub use crate::model::{CompileContext, SchemaIndex};

pub mod applicator;
pub mod content;
pub mod core;
pub mod format;
pub mod metadata;
pub mod unevaluated;
pub mod validation;

/// Compiles one keyword name.
pub trait KeywordHandler: Send + Sync {
    /// The keyword name as it appears in schemas.
    fn name(&self) -> &str;

    /// Keywords that must be evaluated before this one when present in the
    /// same schema object. `"*"` orders this keyword after every keyword
    /// that does not itself use `"*"`.
    fn depends_on(&self) -> &[&'static str] {
        &[]
    }

    /// Validate the keyword's value and compile it.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSchemaError` when the value has the wrong shape.
    fn compile(
        &self,
        value: &Value,
        cx: &mut CompileContext<'_, '_>,
    ) -> Result<Box<dyn Keyword>, MalformedSchemaError>;
}

/// A compiled keyword.
pub trait Keyword: Send + Sync + fmt::Debug {
    /// Apply the keyword to `instance`.
    ///
    /// Constraint violations are returned as [`KeywordResult::Fail`];
    /// `Err` is reserved for failures that abort the whole evaluation.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` when a reference cannot be resolved or the
    /// recursion guard trips in a nested evaluation.
    fn evaluate(
        &self,
        instance: &Value,
        cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError>;
}

/// Outcome of one keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordResult {
    /// The keyword holds, optionally producing an annotation.
    Pass(Option<Value>),
    /// The keyword does not hold. `None` means the failure is already
    /// explained by invalid child nodes.
    Fail(Option<String>),
}

impl KeywordResult {
    /// Pass without annotation.
    pub fn pass() -> Self {
        Self::Pass(None)
    }

    /// Pass with an annotation.
    pub fn annotate(value: Value) -> Self {
        Self::Pass(Some(value))
    }

    /// Fail with a message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(Some(message.into()))
    }

    /// Fail without a message of its own.
    pub fn fail_silently() -> Self {
        Self::Fail(None)
    }

    /// Pass or fail silently depending on child validity.
    pub fn from_children(valid: bool) -> Self {
        if valid {
            Self::pass()
        } else {
            Self::fail_silently()
        }
    }

    /// Whether the keyword holds.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Pass(_))
    }
}

/// Signature of a handler's compile step.
pub type CompileFn =
    fn(&Value, &mut CompileContext<'_, '_>) -> Result<Box<dyn Keyword>, MalformedSchemaError>;

/// A handler built from a name, a dependency list and a compile function.
///
/// All built-in keywords are declared this way; extension vocabularies
/// may use it too.
pub struct FnKeywordHandler {
    name: &'static str,
    depends_on: &'static [&'static str],
    compile: CompileFn,
}

impl FnKeywordHandler {
    /// Declare a handler.
    pub const fn new(
        name: &'static str,
        depends_on: &'static [&'static str],
        compile: CompileFn,
    ) -> Self {
        Self {
            name,
            depends_on,
            compile,
        }
    }
}

impl fmt::Debug for FnKeywordHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnKeywordHandler")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

impl KeywordHandler for FnKeywordHandler {
    fn name(&self) -> &str {
        self.name
    }

    fn depends_on(&self) -> &[&'static str] {
        self.depends_on
    }

    fn compile(
        &self,
        value: &Value,
        cx: &mut CompileContext<'_, '_>,
    ) -> Result<Box<dyn Keyword>, MalformedSchemaError> {
        (self.compile)(value, cx)
    }
}

/// A keyword with no evaluation-time behaviour.
#[derive(Debug)]
pub(crate) struct Inert;

impl Keyword for Inert {
    fn evaluate(
        &self,
        _instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        Ok(KeywordResult::pass())
    }
}

/// A keyword that annotates with a fixed value.
#[derive(Debug)]
pub(crate) struct Annotation(pub(crate) Value);

impl Keyword for Annotation {
    fn evaluate(
        &self,
        _instance: &Value,
        _cx: &mut KeywordContext<'_, '_>,
    ) -> Result<KeywordResult, EvaluationError> {
        Ok(KeywordResult::annotate(self.0.clone()))
    }
}

/// Wrap a compile function as a registrable handler.
pub(crate) fn handler(
    name: &'static str,
    depends_on: &'static [&'static str],
    compile: CompileFn,
) -> Arc<dyn KeywordHandler> {
    Arc::new(FnKeywordHandler::new(name, depends_on, compile))
}

// Shape checks shared by the built-in handlers.

pub(crate) fn expect_object<'a>(
    value: &'a Value,
    cx: &CompileContext<'_, '_>,
) -> Result<&'a Map<String, Value>, MalformedSchemaError> {
    value
        .as_object()
        .ok_or_else(|| cx.malformed("expected an object"))
}

pub(crate) fn expect_string<'a>(
    value: &'a Value,
    cx: &CompileContext<'_, '_>,
) -> Result<&'a str, MalformedSchemaError> {
    value.as_str().ok_or_else(|| cx.malformed("expected a string"))
}

pub(crate) fn expect_bool(
    value: &Value,
    cx: &CompileContext<'_, '_>,
) -> Result<bool, MalformedSchemaError> {
    value.as_bool().ok_or_else(|| cx.malformed("expected a boolean"))
}

pub(crate) fn expect_number<'a>(
    value: &'a Value,
    cx: &CompileContext<'_, '_>,
) -> Result<&'a Number, MalformedSchemaError> {
    match value {
        Value::Number(n) => Ok(n),
        _ => Err(cx.malformed("expected a number")),
    }
}

/// Non-negative integers, accepting integral floats such as `2.0`.
pub(crate) fn expect_count(
    value: &Value,
    cx: &CompileContext<'_, '_>,
) -> Result<u64, MalformedSchemaError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(cx.malformed("expected a non-negative integer")),
    }
}

pub(crate) fn expect_string_array(
    value: &Value,
    cx: &CompileContext<'_, '_>,
) -> Result<Vec<String>, MalformedSchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| cx.malformed("expected an array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| cx.malformed("expected an array of strings"))
        })
        .collect()
}

/// A non-empty array of schemas, compiled in order.
pub(crate) fn expect_schema_array(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Vec<SchemaIndex>, MalformedSchemaError> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| cx.malformed("expected a non-empty array of schemas"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| cx.subschema(item, &[i.to_string().as_str()]))
        .collect()
}

/// An object of schemas, compiled in key order.
pub(crate) fn expect_schema_map(
    value: &Value,
    cx: &mut CompileContext<'_, '_>,
) -> Result<Vec<(String, SchemaIndex)>, MalformedSchemaError> {
    let map = value
        .as_object()
        .ok_or_else(|| cx.malformed("expected an object of schemas"))?;
    map.iter()
        .map(|(name, schema)| Ok((name.clone(), cx.subschema(schema, &[name.as_str()])?)))
        .collect()
}
