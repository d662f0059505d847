//! # Schema Model
//!
//! `Schema` is the compiled, immutable form of one schema document. Nodes
//! live in an arena (`Vec<SchemaNode>`) addressed by [`SchemaIndex`];
//! parents list their direct subschemas by index and `$ref` keywords hold
//! only the reference text. Nothing in the arena points at another
//! document, so cyclic references never create ownership cycles.
//!
//! ## Build
//!
//! [`Schema::build_with`] walks the raw JSON depth-first. Each object node
//! has its identity keywords (`$id`, `$schema`, `$anchor`,
//! `$dynamicAnchor`) checked and extracted, and every other keyword is
//! compiled through the handler registered for it in the
//! [`VocabularyRegistry`]. Handlers compile nested schemas through
//! [`CompileContext::subschema`], so the arena is filled in pre-order:
//! a parent always has a lower index than its children.
//!
//! Keywords with no registered handler are kept by name (their raw value
//! stays reachable through the document) unless unknown keywords are
//! disallowed, in which case the build fails.

use std::collections::HashSet;
use std::sync::Arc;

use jsev_core::{JsonPointer, MalformedSchemaError};
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::json::type_name;
use crate::keywords::Keyword;
use crate::vocabulary::VocabularyRegistry;

/// Keywords consumed by the model itself rather than a handler.
pub const IDENTITY_KEYWORDS: [&str; 4] = ["$id", "$schema", "$anchor", "$dynamicAnchor"];

/// Position of a node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaIndex(pub(crate) usize);

impl SchemaIndex {
    /// The document root.
    pub const ROOT: SchemaIndex = SchemaIndex(0);

    /// The arena slot.
    pub fn get(self) -> usize {
        self.0
    }
}

/// A compiled schema document.
#[derive(Debug)]
pub struct Schema {
    raw: Value,
    nodes: Vec<SchemaNode>,
}

/// One schema node.
#[derive(Debug)]
pub struct SchemaNode {
    pub(crate) location: JsonPointer,
    pub(crate) parent: Option<SchemaIndex>,
    pub(crate) children: Vec<SchemaIndex>,
    pub(crate) body: NodeBody,
}

/// Boolean schemas versus keyword schemas.
#[derive(Debug)]
pub enum NodeBody {
    /// `true` accepts everything, `false` rejects everything.
    Boolean(bool),
    /// An object schema.
    Keywords(KeywordSchema),
}

/// The compiled contents of an object schema.
#[derive(Debug, Default)]
pub struct KeywordSchema {
    pub(crate) id: Option<String>,
    pub(crate) meta_schema: Option<String>,
    pub(crate) anchor: Option<String>,
    pub(crate) dynamic_anchor: Option<String>,
    /// In evaluation order.
    pub(crate) keywords: Vec<CompiledKeyword>,
    /// Keywords with no registered handler, in document order.
    pub(crate) unknown: Vec<String>,
}

/// A keyword bound to its compiled implementation.
#[derive(Debug)]
pub struct CompiledKeyword {
    pub(crate) name: String,
    pub(crate) vocabulary: Arc<str>,
    pub(crate) keyword: Box<dyn Keyword>,
}

impl Schema {
    /// Build with the built-in vocabularies, tolerating unknown keywords.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSchemaError` if the document is not a schema.
    pub fn build(raw: Value) -> Result<Self, MalformedSchemaError> {
        Self::build_with(raw, &VocabularyRegistry::default(), true)
    }

    /// Build against an explicit vocabulary set.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSchemaError` if the root (or any subschema) is
    /// neither a boolean nor an object, a known keyword has a value of the
    /// wrong shape, an identifier keyword is invalid, or an unknown keyword
    /// is present while `allow_unknown` is false.
    pub fn build_with(
        raw: Value,
        vocabularies: &VocabularyRegistry,
        allow_unknown: bool,
    ) -> Result<Self, MalformedSchemaError> {
        let mut builder = Builder {
            nodes: Vec::new(),
            vocabularies,
            allow_unknown,
        };
        builder.compile(&raw, JsonPointer::root(), None)?;
        let nodes = builder.nodes;
        tracing::trace!(nodes = nodes.len(), "schema built");
        Ok(Self { raw, nodes })
    }

    /// The source document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Number of schema nodes in the document.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a built schema has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root's `$id`, if declared.
    pub fn id(&self) -> Option<&str> {
        match &self.nodes.first()?.body {
            NodeBody::Keywords(k) => k.id.as_deref(),
            NodeBody::Boolean(_) => None,
        }
    }

    /// The root's `$schema`, if declared.
    pub fn meta_schema(&self) -> Option<&str> {
        match &self.nodes.first()?.body {
            NodeBody::Keywords(k) => k.meta_schema.as_deref(),
            NodeBody::Boolean(_) => None,
        }
    }

    pub(crate) fn node(&self, index: SchemaIndex) -> &SchemaNode {
        &self.nodes[index.0]
    }

    pub(crate) fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    /// The raw JSON of a node.
    pub(crate) fn raw_at(&self, index: SchemaIndex) -> Option<&Value> {
        self.nodes.get(index.0)?.location.resolve(&self.raw)
    }
}

impl SchemaNode {
    /// Location from the document root.
    pub fn location(&self) -> &JsonPointer {
        &self.location
    }

    pub(crate) fn keywords(&self) -> Option<&KeywordSchema> {
        match &self.body {
            NodeBody::Keywords(k) => Some(k),
            NodeBody::Boolean(_) => None,
        }
    }
}

struct Builder<'v> {
    nodes: Vec<SchemaNode>,
    vocabularies: &'v VocabularyRegistry,
    allow_unknown: bool,
}

impl<'v> Builder<'v> {
    fn compile(
        &mut self,
        value: &Value,
        location: JsonPointer,
        parent: Option<SchemaIndex>,
    ) -> Result<SchemaIndex, MalformedSchemaError> {
        let index = SchemaIndex(self.nodes.len());
        self.nodes.push(SchemaNode {
            location: location.clone(),
            parent,
            children: Vec::new(),
            body: NodeBody::Boolean(true),
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(index);
        }

        let body = match value {
            Value::Bool(b) => NodeBody::Boolean(*b),
            Value::Object(map) => NodeBody::Keywords(self.compile_object(map, &location, index)?),
            other => {
                return Err(MalformedSchemaError::new(
                    location.to_string(),
                    format!(
                        "expected a schema (object or boolean), found {}",
                        type_name(other)
                    ),
                ))
            }
        };
        self.nodes[index.0].body = body;
        Ok(index)
    }

    fn compile_object(
        &mut self,
        map: &Map<String, Value>,
        location: &JsonPointer,
        index: SchemaIndex,
    ) -> Result<KeywordSchema, MalformedSchemaError> {
        let mut schema = KeywordSchema {
            id: identifier(map, "$id", location, check_id)?,
            meta_schema: identifier(map, "$schema", location, check_absolute_uri)?,
            anchor: identifier(map, "$anchor", location, check_anchor)?,
            dynamic_anchor: identifier(map, "$dynamicAnchor", location, check_anchor)?,
            ..KeywordSchema::default()
        };

        let vocabularies = self.vocabularies;
        let mut pending = Vec::new();
        for (name, keyword_value) in map {
            if IDENTITY_KEYWORDS.contains(&name.as_str()) {
                continue;
            }
            let Some(entry) = vocabularies.lookup(name) else {
                if !self.allow_unknown {
                    return Err(MalformedSchemaError::new(
                        location.join(name.as_str()).to_string(),
                        format!("unknown keyword '{name}'"),
                    ));
                }
                schema.unknown.push(name.clone());
                continue;
            };
            let mut cx = CompileContext {
                builder: self,
                parent: index,
                location: location.join(name.as_str()),
                siblings: map,
            };
            let keyword = entry.handler.compile(keyword_value, &mut cx)?;
            pending.push((
                CompiledKeyword {
                    name: name.clone(),
                    vocabulary: Arc::clone(&entry.vocabulary),
                    keyword,
                },
                entry.handler.depends_on(),
            ));
        }
        schema.keywords = order_keywords(pending);
        Ok(schema)
    }
}

/// Compile-time view handed to keyword handlers.
pub struct CompileContext<'c, 'v> {
    builder: &'c mut Builder<'v>,
    parent: SchemaIndex,
    location: JsonPointer,
    siblings: &'c Map<String, Value>,
}

impl CompileContext<'_, '_> {
    /// Location of the keyword being compiled.
    pub fn location(&self) -> &JsonPointer {
        &self.location
    }

    /// Raw value of another keyword in the same schema object.
    pub fn sibling(&self, name: &str) -> Option<&Value> {
        self.siblings.get(name)
    }

    /// Compile a nested schema at `path` below the keyword.
    ///
    /// # Errors
    ///
    /// Propagates build failures of the nested schema.
    pub fn subschema(
        &mut self,
        value: &Value,
        path: &[&str],
    ) -> Result<SchemaIndex, MalformedSchemaError> {
        let mut location = self.location.clone();
        for segment in path {
            location.push(*segment);
        }
        self.builder.compile(value, location, Some(self.parent))
    }

    /// An error located at this keyword.
    pub fn malformed(&self, reason: impl Into<String>) -> MalformedSchemaError {
        MalformedSchemaError::new(self.location.to_string(), reason)
    }

    /// Compile an ECMA-262 style pattern.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSchemaError` if the pattern uses syntax the regex
    /// engine does not support (look-around, back-references) or is invalid.
    pub fn regex(&self, pattern: &str) -> Result<Regex, MalformedSchemaError> {
        compile_pattern(pattern)
            .map_err(|e| self.malformed(format!("invalid regular expression '{pattern}': {e}")))
    }
}

/// Compile a pattern, translating the ECMA-262 escapes that differ from
/// the `regex` crate's syntax.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut translated = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            translated.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => translated.push_str("[0-9]"),
            Some('D') => translated.push_str("[^0-9]"),
            Some('w') => translated.push_str("[A-Za-z0-9_]"),
            Some('W') => translated.push_str("[^A-Za-z0-9_]"),
            Some('c') => match chars.next() {
                Some(letter) if letter.is_ascii_alphabetic() => {
                    translated.push_str(&format!("\\x{:02X}", (letter as u8) % 32));
                }
                Some(other) => {
                    translated.push_str("\\\\c");
                    translated.push(other);
                }
                None => translated.push_str("\\\\c"),
            },
            Some(other) => {
                translated.push('\\');
                translated.push(other);
            }
            None => translated.push('\\'),
        }
    }
    Regex::new(&translated)
}

/// Stable topological order: a keyword runs after every keyword it depends
/// on that is present; `"*"` means after all keywords that do not
/// themselves depend on `"*"`. Ties keep document order.
fn order_keywords(mut pending: Vec<(CompiledKeyword, &[&'static str])>) -> Vec<CompiledKeyword> {
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let waiting: HashSet<&str> = pending.iter().map(|(k, _)| k.name.as_str()).collect();
        let ordinary_waiting = pending.iter().any(|(_, deps)| !deps.contains(&"*"));
        let ready = pending
            .iter()
            .position(|(keyword, deps)| {
                deps.iter().all(|dep| {
                    if *dep == "*" {
                        !ordinary_waiting
                    } else {
                        *dep == keyword.name || !waiting.contains(dep)
                    }
                })
            })
            .unwrap_or(0);
        ordered.push(pending.remove(ready).0);
    }
    ordered
}

fn identifier(
    map: &Map<String, Value>,
    keyword: &str,
    location: &JsonPointer,
    check: fn(&str) -> Result<(), String>,
) -> Result<Option<String>, MalformedSchemaError> {
    let Some(value) = map.get(keyword) else {
        return Ok(None);
    };
    let text = value.as_str().ok_or_else(|| {
        MalformedSchemaError::new(
            location.join(keyword).to_string(),
            format!("{keyword} must be a string"),
        )
    })?;
    check(text).map_err(|reason| MalformedSchemaError::new(location.join(keyword).to_string(), reason))?;
    Ok(Some(text.to_string()))
}

fn check_id(id: &str) -> Result<(), String> {
    if let Some((_, fragment)) = id.split_once('#') {
        if !fragment.is_empty() {
            return Err(format!("$id '{id}' must not contain a non-empty fragment"));
        }
    }
    check_uri_reference(id)
}

fn check_uri_reference(reference: &str) -> Result<(), String> {
    if reference.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(format!("'{reference}' is not a valid URI reference"));
    }
    let base = Url::parse("json-schema:///").map_err(|e| e.to_string())?;
    base.join(reference)
        .map(|_| ())
        .map_err(|e| format!("'{reference}' is not a valid URI reference: {e}"))
}

fn check_absolute_uri(uri: &str) -> Result<(), String> {
    Url::parse(uri)
        .map(|_| ())
        .map_err(|e| format!("'{uri}' is not an absolute URI: {e}"))
}

/// Anchor names follow the XML NCName-like production of 2020-12:
/// `^[A-Za-z_][-A-Za-z0-9._]*$`.
pub(crate) fn check_anchor(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(format!("'{name}' is not a valid anchor name"))
    }
}
