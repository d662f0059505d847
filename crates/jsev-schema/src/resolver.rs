//! # Reference Resolver
//!
//! Two halves. At registration, [`index_document`] walks a compiled
//! [`Schema`] in arena order and computes, for every node, its base URI,
//! canonical URI and dialect, collecting the keys under which the node can
//! be addressed. At evaluation time,
//! [`SchemaRegistry::resolve_reference`] and
//! [`SchemaRegistry::resolve_dynamic_reference`] turn `$ref` and
//! `$dynamicRef` values into [`SchemaHandle`]s.
//!
//! ## Keys
//!
//! Every key is an absolute URI string:
//!
//! - `base` for a resource root (a document root or a node with `$id`);
//! - `base#/json/pointer` for every node, once per enclosing resource;
//! - `base#name` for `$anchor` and `$dynamicAnchor` names.
//!
//! Pointer fragments never start with a name character, so the three forms
//! share one map. Dynamic anchors are also kept on their own, since only
//! they take part in the dynamic-scope search.
//!
//! ## Dynamic scope
//!
//! A `$dynamicRef` first resolves like `$ref`. If the target declares a
//! `$dynamicAnchor` with the fragment's name, the dynamic scope is searched
//! from the outermost resource inward, and the first resource declaring the
//! same dynamic anchor wins. Otherwise the static target is used.
//!
//! The resolver never recurses through references, so cyclic `$ref`
//! chains resolve like any other; unbounded recursion is the evaluator's
//! concern.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jsev_core::{
    ContentDigest, DuplicateIdError, JsonPointer, MalformedSchemaError, RefResolutionError,
    SchemaError,
};
use serde_json::Value;
use url::Url;

use crate::model::{Schema, SchemaIndex, SchemaNode};
use crate::options::EvaluationOptions;
use crate::registry::SchemaRegistry;
use crate::vocabulary::Dialect;

static NULL: Value = Value::Null;

/// Identity of one schema node, computed at registration.
#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub(crate) base: Arc<Url>,
    pub(crate) canonical: Arc<str>,
    pub(crate) dialect: Arc<Dialect>,
}

impl NodeMeta {
    /// Base URI for resolving references inside the node.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The node's canonical URI: its innermost resource plus a pointer
    /// fragment when the node is not itself a resource root.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Vocabularies in effect for the node.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }
}

/// A compiled document with per-node identity.
#[derive(Debug)]
pub(crate) struct Document {
    pub(crate) schema: Schema,
    pub(crate) metas: Vec<NodeMeta>,
    pub(crate) digest: ContentDigest,
    pub(crate) uri: Arc<Url>,
}

/// Cheap, clonable reference to one node of a registered document.
#[derive(Clone)]
pub struct SchemaHandle {
    pub(crate) doc: Arc<Document>,
    pub(crate) index: SchemaIndex,
}

impl fmt::Debug for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHandle")
            .field("uri", &self.uri())
            .field("index", &self.index)
            .finish()
    }
}

impl PartialEq for SchemaHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc) && self.index == other.index
    }
}

impl Eq for SchemaHandle {}

impl SchemaHandle {
    pub(crate) fn new(doc: Arc<Document>, index: SchemaIndex) -> Self {
        Self { doc, index }
    }

    /// Canonical URI of the node.
    pub fn uri(&self) -> &str {
        &self.meta().canonical
    }

    /// URI the enclosing document was registered or fetched under.
    pub fn document_uri(&self) -> &Url {
        &self.doc.uri
    }

    /// Fingerprint of the enclosing document.
    pub fn digest(&self) -> &ContentDigest {
        &self.doc.digest
    }

    /// The compiled enclosing document.
    pub fn schema(&self) -> &Schema {
        &self.doc.schema
    }

    /// Arena position within the enclosing document.
    pub fn index(&self) -> SchemaIndex {
        self.index
    }

    /// Raw JSON of the node.
    pub fn raw(&self) -> &Value {
        self.doc.schema.raw_at(self.index).unwrap_or(&NULL)
    }

    /// Identity of the node.
    pub fn meta(&self) -> &NodeMeta {
        &self.doc.metas[self.index.0]
    }

    pub(crate) fn node(&self) -> &SchemaNode {
        self.doc.schema.node(self.index)
    }

    pub(crate) fn keyword_value(&self, name: &str) -> Option<&Value> {
        self.raw().get(name)
    }

    pub(crate) fn at(&self, index: SchemaIndex) -> Self {
        Self::new(Arc::clone(&self.doc), index)
    }
}

/// Addressing keys produced by [`index_document`].
#[derive(Debug, Default)]
pub(crate) struct IndexEntries {
    pub(crate) uris: Vec<(String, SchemaIndex)>,
    pub(crate) dynamic_anchors: Vec<(String, SchemaIndex)>,
}

/// Compute node identities and addressing keys for a compiled document.
///
/// `retrieval_uri` is the URI the document was registered or fetched
/// under and `offset` the pointer of the document root within that
/// resource (non-empty only for subschemas compiled on demand). Nodes that
/// declare `$schema` take their dialect from `dialect_for(meta_schema,
/// own_base, raw)`; all others inherit their parent's, the root inheriting
/// `inherited`.
pub(crate) fn index_document<F>(
    schema: Schema,
    retrieval_uri: &Url,
    offset: &JsonPointer,
    inherited: Arc<Dialect>,
    mut dialect_for: F,
) -> Result<(Document, IndexEntries), SchemaError>
where
    F: FnMut(&str, &Url, &Value) -> Result<Arc<Dialect>, SchemaError>,
{
    let digest = ContentDigest::of_value(schema.raw())
        .map_err(|e| MalformedSchemaError::new("", e.to_string()))?;
    let root_base = Arc::new(without_fragment(retrieval_uri));

    let mut metas: Vec<NodeMeta> = Vec::with_capacity(schema.len());
    let mut scopes: Vec<Vec<(Arc<Url>, JsonPointer)>> = Vec::with_capacity(schema.len());
    let mut entries = IndexEntries::default();
    let mut seen: HashMap<String, SchemaIndex> = HashMap::new();

    for (slot, node) in schema.nodes().iter().enumerate() {
        let index = SchemaIndex(slot);
        let (mut node_scopes, parent_dialect) = match node.parent {
            Some(parent) => {
                let relative = node
                    .location
                    .strip_prefix(&schema.node(parent).location)
                    .unwrap_or_default();
                let extended: Vec<(Arc<Url>, JsonPointer)> = scopes[parent.0]
                    .iter()
                    .map(|(base, pointer)| (Arc::clone(base), pointer.concat(&relative)))
                    .collect();
                (extended, Arc::clone(&metas[parent.0].dialect))
            }
            None => (
                vec![(Arc::clone(&root_base), offset.clone())],
                Arc::clone(&inherited),
            ),
        };

        let identity = node.keywords();
        let current_base = node_scopes
            .last()
            .map(|(base, _)| Arc::clone(base))
            .unwrap_or_else(|| Arc::clone(&root_base));

        if let Some(id) = identity.and_then(|k| k.id.as_deref()) {
            let joined = Arc::new(without_fragment(&join_reference(&current_base, id)?));
            let already_root = node_scopes
                .last()
                .is_some_and(|(base, pointer)| *base == joined && pointer.is_empty());
            if !already_root {
                node_scopes.push((joined, JsonPointer::root()));
            }
        }

        let (base, pointer) = match node_scopes.last() {
            Some((base, pointer)) => (Arc::clone(base), pointer.clone()),
            None => (Arc::clone(&root_base), JsonPointer::root()),
        };
        let raw = schema.raw_at(index).unwrap_or(&NULL);
        let dialect = match identity.and_then(|k| k.meta_schema.as_deref()) {
            Some(meta_schema) => dialect_for(meta_schema, &base, raw)?,
            None => parent_dialect,
        };

        let mut add = |key: String| -> Result<(), SchemaError> {
            match seen.get(&key) {
                Some(existing) if *existing == index => Ok(()),
                Some(existing) => {
                    let existing_raw = schema.raw_at(*existing).unwrap_or(&NULL);
                    if existing_raw == raw {
                        Ok(())
                    } else {
                        Err(DuplicateIdError { uri: key }.into())
                    }
                }
                None => {
                    seen.insert(key.clone(), index);
                    entries.uris.push((key, index));
                    Ok(())
                }
            }
        };
        for (scope_base, scope_pointer) in &node_scopes {
            add(canonical_key(scope_base, scope_pointer))?;
        }
        if let Some(anchor) = identity.and_then(|k| k.anchor.as_deref()) {
            add(anchor_key(&base, anchor))?;
        }
        if let Some(anchor) = identity.and_then(|k| k.dynamic_anchor.as_deref()) {
            let key = anchor_key(&base, anchor);
            add(key.clone())?;
            entries.dynamic_anchors.push((key, index));
        }

        metas.push(NodeMeta {
            canonical: Arc::from(canonical_key(&base, &pointer)),
            base,
            dialect,
        });
        scopes.push(node_scopes);
    }

    let document = Document {
        schema,
        metas,
        digest,
        uri: root_base,
    };
    Ok((document, entries))
}

/// `base` for a resource root, `base#/pointer` below it.
pub(crate) fn canonical_key(base: &Url, pointer: &JsonPointer) -> String {
    if pointer.is_empty() {
        base.as_str().to_string()
    } else {
        format!("{}#{}", base.as_str(), pointer.to_uri_fragment())
    }
}

pub(crate) fn anchor_key(base: &Url, anchor: &str) -> String {
    format!("{}#{anchor}", base.as_str())
}

/// Resolve a URI reference against a base URI.
pub(crate) fn join_reference(base: &Url, reference: &str) -> Result<Url, RefResolutionError> {
    base.join(reference)
        .map_err(|e| RefResolutionError::InvalidReference {
            reference: reference.to_string(),
            base: base.to_string(),
            reason: e.to_string(),
        })
}

pub(crate) fn without_fragment(uri: &Url) -> Url {
    let mut uri = uri.clone();
    uri.set_fragment(None);
    uri
}

impl SchemaRegistry {
    /// Resolve a `$ref` value against `base`.
    ///
    /// Absolute, base-relative and fragment-only references are supported.
    /// Pointer fragments are looked up by canonical key and, when they land
    /// on a location that was never compiled as a schema, compiled on
    /// demand. Plain-name fragments are looked up as anchors. Unknown
    /// documents are fetched through the configured hook.
    ///
    /// # Errors
    ///
    /// Returns `RefResolutionError` if the reference is not a valid URI
    /// reference, the document is unknown and cannot be fetched, or the
    /// fragment does not exist in it.
    pub fn resolve_reference(
        &self,
        base: &Url,
        reference: &str,
        options: &EvaluationOptions,
    ) -> Result<SchemaHandle, RefResolutionError> {
        let cache_key = format!("{base}|{reference}");
        if let Some(hit) = self.cached_resolution(&cache_key) {
            return Ok(hit);
        }
        let target = join_reference(base, reference)?;
        let resolved = self.resolve_uri(&target, options)?;
        tracing::debug!(
            reference,
            base = %base,
            target = %resolved.uri(),
            "reference resolved"
        );
        self.cache_resolution(cache_key, resolved.clone());
        Ok(resolved)
    }

    /// Resolve a `$dynamicRef` value.
    ///
    /// `scope` lists the resources entered by the current evaluation,
    /// outermost first.
    ///
    /// # Errors
    ///
    /// Returns `RefResolutionError` if the static target cannot be
    /// resolved.
    pub fn resolve_dynamic_reference(
        &self,
        base: &Url,
        reference: &str,
        scope: &[Arc<Url>],
        options: &EvaluationOptions,
    ) -> Result<SchemaHandle, RefResolutionError> {
        let target = self.resolve_reference(base, reference, options)?;
        let joined = join_reference(base, reference)?;
        let Some(name) = joined
            .fragment()
            .filter(|f| !f.is_empty() && !f.starts_with('/'))
        else {
            return Ok(target);
        };
        let declares_anchor = target
            .node()
            .keywords()
            .and_then(|k| k.dynamic_anchor.as_deref())
            == Some(name);
        if !declares_anchor {
            return Ok(target);
        }
        for resource in scope {
            if let Some(found) = self.lookup_dynamic(&anchor_key(resource, name)) {
                tracing::trace!(
                    reference,
                    scope = %resource,
                    target = %found.uri(),
                    "dynamic anchor taken from scope"
                );
                return Ok(found);
            }
        }
        Ok(target)
    }

    /// Resolve an absolute URI, fragment included.
    pub(crate) fn resolve_uri(
        &self,
        target: &Url,
        options: &EvaluationOptions,
    ) -> Result<SchemaHandle, RefResolutionError> {
        let document = without_fragment(target);
        match target.fragment().filter(|f| !f.is_empty()) {
            None => self.ensure_resource(&document, options),
            Some(fragment) if fragment.starts_with('/') => {
                let pointer = JsonPointer::from_uri_fragment(fragment).map_err(|e| {
                    RefResolutionError::InvalidReference {
                        reference: target.to_string(),
                        base: document.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                let key = canonical_key(&document, &pointer);
                if let Some(found) = self.lookup(&key) {
                    return Ok(found);
                }
                let resource = self.ensure_resource(&document, options)?;
                if let Some(found) = self.lookup(&key) {
                    return Ok(found);
                }
                self.compile_subschema(&resource, &pointer, key, options)
            }
            Some(anchor) => {
                let key = anchor_key(&document, anchor);
                if let Some(found) = self.lookup(&key) {
                    return Ok(found);
                }
                self.ensure_resource(&document, options)?;
                self.lookup(&key)
                    .ok_or_else(|| RefResolutionError::AnchorNotFound {
                        uri: document.to_string(),
                        anchor: anchor.to_string(),
                    })
            }
        }
    }

    /// Compile the value at `pointer` inside `resource` as a schema and
    /// register it under `key`.
    fn compile_subschema(
        &self,
        resource: &SchemaHandle,
        pointer: &JsonPointer,
        key: String,
        options: &EvaluationOptions,
    ) -> Result<SchemaHandle, RefResolutionError> {
        let not_found = || RefResolutionError::PointerNotFound {
            uri: resource.uri().to_string(),
            pointer: pointer.to_string(),
        };
        let mut base = (*resource.meta().base).clone();
        let mut offset = JsonPointer::root();
        let mut current = resource.raw();
        let segments = pointer.segments();
        for (position, segment) in segments.iter().enumerate() {
            current = JsonPointer::root()
                .join(segment.as_str())
                .resolve(current)
                .ok_or_else(not_found)?;
            offset.push(segment.as_str());
            let is_target = position + 1 == segments.len();
            if let (false, Some(id)) = (is_target, current.get("$id").and_then(Value::as_str)) {
                base = without_fragment(&join_reference(&base, id)?);
                offset = JsonPointer::root();
            }
        }

        let invalid = |reason: String| RefResolutionError::InvalidDocument {
            uri: key.clone(),
            reason,
        };
        let schema = Schema::build_with(
            current.clone(),
            self.vocabularies(),
            options.allow_unknown_keywords,
        )
        .map_err(|e| invalid(e.to_string()))?;
        let (document, entries) = index_document(
            schema,
            &base,
            &offset,
            Arc::clone(&resource.meta().dialect),
            |meta_schema, own_base, raw| self.dialect_for(meta_schema, own_base, raw, options),
        )
        .map_err(|e| invalid(e.to_string()))?;
        let handle = self.insert_fetched(document, entries);
        self.insert_alias(key.clone(), handle.clone());
        tracing::debug!(uri = %key, "subschema compiled on demand");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyRegistry;
    use serde_json::json;

    fn index(raw: Value, uri: &str) -> Result<(Document, IndexEntries), SchemaError> {
        let vocabularies = VocabularyRegistry::default();
        let dialect = Arc::new(vocabularies.default_dialect());
        let schema = Schema::build(raw)?;
        let uri = Url::parse(uri).unwrap();
        index_document(schema, &uri, &JsonPointer::root(), Arc::clone(&dialect), |_, _, _| {
            Ok(Arc::clone(&dialect))
        })
    }

    fn keys(entries: &IndexEntries) -> Vec<&str> {
        entries.uris.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_base_uri_propagation() {
        let (doc, entries) = index(
            json!({
                "$id": "https://example.com/root.json",
                "$defs": {
                    "a": {"$id": "nested/a.json", "$anchor": "here"},
                    "b": {"type": "string"}
                }
            }),
            "json-schema:///ignored.json",
        )
        .unwrap();
        assert_eq!(doc.metas[0].canonical(), "https://example.com/root.json");
        assert_eq!(doc.metas[1].canonical(), "https://example.com/nested/a.json");
        assert_eq!(doc.metas[1].base().as_str(), "https://example.com/nested/a.json");
        assert_eq!(
            doc.metas[2].canonical(),
            "https://example.com/root.json#/$defs/b"
        );
        let keys = keys(&entries);
        assert!(keys.contains(&"json-schema:///ignored.json"));
        assert!(keys.contains(&"https://example.com/root.json#/$defs/a"));
        assert!(keys.contains(&"https://example.com/nested/a.json#here"));
    }

    #[test]
    fn test_dynamic_anchors_indexed_twice() {
        let (_, entries) = index(
            json!({"$id": "https://example.com/list", "$dynamicAnchor": "items"}),
            "https://example.com/list",
        )
        .unwrap();
        assert!(keys(&entries).contains(&"https://example.com/list#items"));
        assert_eq!(entries.dynamic_anchors.len(), 1);
        assert_eq!(entries.dynamic_anchors[0].0, "https://example.com/list#items");
    }

    #[test]
    fn test_conflicting_ids_in_one_document() {
        let err = index(
            json!({
                "$defs": {
                    "a": {"$id": "https://example.com/dup", "type": "string"},
                    "b": {"$id": "https://example.com/dup", "type": "integer"}
                }
            }),
            "json-schema:///doc.json",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateId(ref e) if e.uri == "https://example.com/dup"));
    }

    #[test]
    fn test_identical_ids_in_one_document_tolerated() {
        assert!(index(
            json!({
                "$defs": {
                    "a": {"$id": "https://example.com/same", "type": "string"},
                    "b": {"$id": "https://example.com/same", "type": "string"}
                }
            }),
            "json-schema:///doc.json",
        )
        .is_ok());
    }

    #[test]
    fn test_pointer_keys_are_percent_encoded() {
        let (_, entries) = index(
            json!({"properties": {"a b": {"type": "string"}, "c/d": true}}),
            "json-schema:///doc.json",
        )
        .unwrap();
        let keys = keys(&entries);
        assert!(keys.contains(&"json-schema:///doc.json#/properties/a%20b"));
        assert!(keys.contains(&"json-schema:///doc.json#/properties/c~1d"));
    }

    #[test]
    fn test_canonical_key_forms() {
        let base = Url::parse("https://example.com/s").unwrap();
        assert_eq!(canonical_key(&base, &JsonPointer::root()), "https://example.com/s");
        let pointer = JsonPointer::parse("/$defs/x").unwrap();
        assert_eq!(canonical_key(&base, &pointer), "https://example.com/s#/$defs/x");
        assert_eq!(anchor_key(&base, "n"), "https://example.com/s#n");
    }
}
