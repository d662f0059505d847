//! # Schema Registry
//!
//! Process-scoped store of compiled schema documents, addressed by
//! canonical URI, JSON-pointer fragment, anchor and dynamic anchor (see
//! [`resolver`](crate::resolver) for the key forms).
//!
//! ## Lifecycle
//!
//! Construct, register, share. Registration (`register_root`,
//! `register_vocabulary`) takes `&mut self`; resolution and evaluation take
//! `&self` and may run on any number of threads against the same registry.
//! Documents fetched or compiled on demand during evaluation go into
//! internally synchronized maps.
//!
//! ## Fetching
//!
//! An unknown document is requested from the per-call hook
//! (`EvaluationOptions::external_fetch`) or, failing that, the registry's
//! own retriever. Each URI owns a fetch slot: concurrent first requests
//! for the same URI wait for a single fetch and a single compile, while
//! different URIs proceed in parallel. Successes stay for the registry's
//! lifetime. A failure is memoized only for the rest of the call that
//! produced it: `evaluate`, `evaluate_async` and `resolve` each start by
//! retiring failed slots, so a later call (possibly with a different hook)
//! fetches again. Cancelled asynchronous fetches are never memoized.
//!
//! ## Invariants
//!
//! - Registering content identical to what a URI already holds is a no-op.
//! - Registering different content under a held URI is a
//!   `DuplicateIdError`, and nothing of the rejected document is kept.
//! - The embedded 2020-12 meta-schemas are always present.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use dashmap::{DashMap, DashSet};
use jsev_core::{
    DuplicateIdError, EvaluationError, JsonPointer, MalformedSchemaError, RefResolutionError,
    SchemaError,
};
use serde_json::Value;
use url::Url;

use crate::evaluator::Evaluator;
use crate::keywords::KeywordHandler;
use crate::metaschema::{CATALOG, DRAFT_2020_12};
use crate::model::{Schema, SchemaIndex};
use crate::options::EvaluationOptions;
use crate::output::{EvaluationNode, Output};
use crate::resolver::{
    index_document, join_reference, without_fragment, Document, IndexEntries, SchemaHandle,
};
use crate::retrieve::{AsyncRetrieve, CancellationSignal, Retrieve};
use crate::vocabulary::{Dialect, VocabularyRegistry};

static NULL: Value = Value::Null;

/// Single-flight state for one document URI.
#[derive(Default)]
struct FetchSlot {
    raw: tokio::sync::OnceCell<Result<Value, RefResolutionError>>,
    document: OnceLock<Result<SchemaHandle, RefResolutionError>>,
}

/// Compiled schemas and the vocabularies used to compile them.
pub struct SchemaRegistry {
    vocabularies: VocabularyRegistry,
    default_dialect: Arc<Dialect>,
    options: EvaluationOptions,
    retriever: Option<Arc<dyn Retrieve>>,
    index: HashMap<String, SchemaHandle>,
    dynamic: HashMap<String, SchemaHandle>,
    documents: usize,
    fetched: DashMap<String, SchemaHandle>,
    fetched_dynamic: DashMap<String, SchemaHandle>,
    resolutions: DashMap<String, SchemaHandle>,
    dialects: DashMap<String, Arc<Dialect>>,
    slots: DashMap<String, Arc<FetchSlot>>,
    loading: DashSet<(ThreadId, String)>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("documents", &self.documents)
            .field("fetched", &self.fetched.len())
            .field("retriever", &self.retriever.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// A registry with the built-in vocabularies and meta-schemas.
    pub fn new() -> Self {
        Self::with_vocabularies(VocabularyRegistry::default())
    }

    /// A registry compiling with an explicit vocabulary set. The embedded
    /// meta-schemas are registered with it.
    pub fn with_vocabularies(vocabularies: VocabularyRegistry) -> Self {
        let default_dialect = Arc::new(vocabularies.default_dialect());
        let mut registry = Self {
            vocabularies,
            default_dialect,
            options: EvaluationOptions::default(),
            retriever: None,
            index: HashMap::new(),
            dynamic: HashMap::new(),
            documents: 0,
            fetched: DashMap::new(),
            fetched_dynamic: DashMap::new(),
            resolutions: DashMap::new(),
            dialects: DashMap::new(),
            slots: DashMap::new(),
            loading: DashSet::new(),
        };
        for (uri, text) in CATALOG {
            if let Err(e) = registry.register_embedded(uri, text) {
                tracing::error!(uri, error = %e, "embedded meta-schema rejected");
            }
        }
        registry
    }

    /// Replace the options used for registration-time fetches and by the
    /// convenience methods that take no options.
    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    /// Install a retriever used when a call supplies none.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retrieve>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Options used when a call supplies none.
    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// The vocabularies schemas are compiled with.
    pub fn vocabularies(&self) -> &VocabularyRegistry {
        &self.vocabularies
    }

    /// Number of documents registered through `register_root`, meta-schemas
    /// included.
    pub fn len(&self) -> usize {
        self.documents
    }

    /// Always false: the meta-schemas are registered on construction.
    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    /// Whether a URI (with optional fragment) is already addressable
    /// without fetching.
    pub fn contains(&self, uri: &str) -> bool {
        self.lookup(uri).is_some()
    }

    /// Add a vocabulary. Schemas registered afterwards may use its
    /// keywords; already compiled documents are unaffected.
    pub fn register_vocabulary(&mut self, uri: &str, handlers: Vec<Arc<dyn KeywordHandler>>) {
        self.vocabularies.register(uri, handlers);
        self.default_dialect = Arc::new(self.vocabularies.default_dialect());
        self.dialects.clear();
    }

    /// Build a schema with this registry's vocabularies.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSchemaError` if the document is not a schema.
    pub fn build(&self, raw: Value) -> Result<Schema, MalformedSchemaError> {
        Schema::build_with(raw, &self.vocabularies, self.options.allow_unknown_keywords)
    }

    /// Register a built schema under `base`.
    ///
    /// Every node is indexed by canonical URI, by pointer fragment under
    /// each enclosing resource, and by its anchors.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdError` if a key is already held by different
    /// content, `UnsupportedVocabularyError` if a `$schema` requires a
    /// vocabulary that is not registered, and `RefResolutionError` if
    /// `base` or an `$id` is not a valid URI.
    pub fn register_root(&mut self, schema: Schema, base: &str) -> Result<SchemaHandle, SchemaError> {
        let base_url = Url::parse(base).map_err(|e| RefResolutionError::InvalidReference {
            reference: base.to_string(),
            base: String::new(),
            reason: e.to_string(),
        })?;
        let options = self.options.clone();
        let (document, entries) = index_document(
            schema,
            &base_url,
            &JsonPointer::root(),
            Arc::clone(&self.default_dialect),
            |meta_schema, own_base, raw| self.dialect_for(meta_schema, own_base, raw, &options),
        )?;

        let root_key = document.metas.first().map(|m| m.canonical.to_string());
        if let Some(existing) = root_key.as_deref().and_then(|key| self.index.get(key)) {
            if existing.index == SchemaIndex::ROOT && existing.doc.digest == document.digest {
                tracing::debug!(uri = %existing.uri(), "schema already registered");
                return Ok(existing.clone());
            }
        }
        for (key, index) in &entries.uris {
            if let Some(existing) = self.index.get(key) {
                if existing.raw() != document.schema.raw_at(*index).unwrap_or(&NULL) {
                    return Err(DuplicateIdError { uri: key.clone() }.into());
                }
            }
        }

        let digest = document.digest.to_hex();
        let nodes = document.schema.len();
        let doc = Arc::new(document);
        let IndexEntries {
            uris,
            dynamic_anchors,
        } = entries;
        for (key, index) in uris {
            self.index
                .entry(key)
                .or_insert_with(|| SchemaHandle::new(Arc::clone(&doc), index));
        }
        for (key, index) in dynamic_anchors {
            self.dynamic
                .entry(key)
                .or_insert_with(|| SchemaHandle::new(Arc::clone(&doc), index));
        }
        self.documents += 1;
        self.resolutions.clear();

        let handle = SchemaHandle::new(doc, SchemaIndex::ROOT);
        tracing::debug!(uri = %handle.uri(), nodes, digest = %digest, "schema registered");
        Ok(handle)
    }

    /// Build and register a raw schema. A schema with `$id` is placed at
    /// that URI, resolved against the default base; one without is placed
    /// under the default base, named by its content digest.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::build`] and [`SchemaRegistry::register_root`].
    pub fn register(&mut self, raw: Value) -> Result<SchemaHandle, SchemaError> {
        let base = self.default_base()?;
        let base = match raw.get("$id").and_then(Value::as_str) {
            Some(id) => without_fragment(&join_reference(&base, id)?),
            None => {
                let digest = jsev_core::ContentDigest::of_value(&raw)
                    .map_err(|e| MalformedSchemaError::new("", e.to_string()))?;
                join_reference(&base, &format!("{}.json", &digest.to_hex()[..16]))?
            }
        };
        let schema = self.build(raw)?;
        self.register_root(schema, base.as_str())
    }

    /// Build and register a raw schema under an explicit base URI.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::build`] and [`SchemaRegistry::register_root`].
    pub fn add(&mut self, base: &str, raw: Value) -> Result<SchemaHandle, SchemaError> {
        let schema = self.build(raw)?;
        self.register_root(schema, base)
    }

    /// Look up (or fetch) a schema by absolute URI, fragment included.
    ///
    /// # Errors
    ///
    /// Returns `RefResolutionError` if the URI is invalid or unresolvable.
    pub fn resolve(&self, uri: &str) -> Result<SchemaHandle, RefResolutionError> {
        self.retire_failed_fetches();
        let base = self.default_base()?;
        self.resolve_reference(&base, uri, &self.options)
    }

    /// The dialect of documents declaring `meta_schema` as their `$schema`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVocabularyError` if the meta-schema requires a
    /// vocabulary that is not registered.
    pub fn keywords_for(&self, meta_schema: &str) -> Result<Arc<Dialect>, SchemaError> {
        let uri = Url::parse(meta_schema).map_err(|e| RefResolutionError::InvalidReference {
            reference: meta_schema.to_string(),
            base: String::new(),
            reason: e.to_string(),
        })?;
        self.dialect_of(without_fragment(&uri), None, &self.options)
    }

    /// Evaluate an instance.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` if a reference cannot be resolved or the
    /// recursion guard trips.
    pub fn evaluate(
        &self,
        schema: &SchemaHandle,
        instance: &Value,
        options: &EvaluationOptions,
    ) -> Result<EvaluationNode, EvaluationError> {
        self.retire_failed_fetches();
        Evaluator::new(self, options).evaluate(schema, instance)
    }

    /// Evaluate and render in `options.output_format`.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::evaluate`].
    pub fn validate(
        &self,
        schema: &SchemaHandle,
        instance: &Value,
        options: &EvaluationOptions,
    ) -> Result<Output, EvaluationError> {
        let node = self.evaluate(schema, instance, options)?;
        Ok(node.format(options.output_format, options.retention()))
    }

    /// Fetch every external document reachable from `schema` through
    /// `retriever`, then evaluate synchronously.
    ///
    /// Fetches are single-flight per URI across concurrent calls. A fetch
    /// failure is remembered and reported only if evaluation reaches the
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns `RefResolutionError::Cancelled` if `cancel` fires during a
    /// fetch, otherwise as [`SchemaRegistry::evaluate`].
    pub async fn evaluate_async(
        &self,
        schema: &SchemaHandle,
        instance: &Value,
        options: &EvaluationOptions,
        retriever: &dyn AsyncRetrieve,
        cancel: &CancellationSignal,
    ) -> Result<EvaluationNode, EvaluationError> {
        self.retire_failed_fetches();
        self.prefetch(schema, options, retriever, cancel).await?;
        Evaluator::new(self, options).evaluate(schema, instance)
    }

    /// Evaluate a raw schema against its meta-schema (`$schema`, or the
    /// 2020-12 dialect when absent).
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the meta-schema cannot be resolved or
    /// evaluation aborts. An invalid schema is an invalid result, not an
    /// error.
    pub fn check_schema(&self, raw: &Value) -> Result<EvaluationNode, SchemaError> {
        let meta_schema = raw
            .get("$schema")
            .and_then(Value::as_str)
            .unwrap_or(DRAFT_2020_12);
        let base = self.default_base()?;
        let meta = self.resolve_reference(&base, meta_schema, &self.options)?;
        Ok(self.evaluate(&meta, raw, &self.options)?)
    }

    fn register_embedded(&mut self, uri: &str, text: &str) -> Result<SchemaHandle, SchemaError> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| MalformedSchemaError::new("", format!("invalid JSON: {e}")))?;
        let schema = Schema::build_with(raw, &self.vocabularies, true)?;
        self.register_root(schema, uri)
    }

    fn default_base(&self) -> Result<Url, RefResolutionError> {
        Url::parse(&self.options.default_base_uri).map_err(|e| {
            RefResolutionError::InvalidReference {
                reference: self.options.default_base_uri.clone(),
                base: String::new(),
                reason: e.to_string(),
            }
        })
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<SchemaHandle> {
        if let Some(found) = self.index.get(key) {
            return Some(found.clone());
        }
        self.fetched.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn lookup_dynamic(&self, key: &str) -> Option<SchemaHandle> {
        if let Some(found) = self.dynamic.get(key) {
            return Some(found.clone());
        }
        self.fetched_dynamic.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn cached_resolution(&self, key: &str) -> Option<SchemaHandle> {
        self.resolutions.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn cache_resolution(&self, key: String, handle: SchemaHandle) {
        self.resolutions.insert(key, handle);
    }

    pub(crate) fn insert_alias(&self, key: String, handle: SchemaHandle) {
        self.fetched.entry(key).or_insert(handle);
    }

    /// Make a document compiled after registration addressable. Keys
    /// already held keep their first owner.
    pub(crate) fn insert_fetched(&self, document: Document, entries: IndexEntries) -> SchemaHandle {
        let doc = Arc::new(document);
        for (key, index) in entries.uris {
            if !self.index.contains_key(&key) {
                self.fetched
                    .entry(key)
                    .or_insert_with(|| SchemaHandle::new(Arc::clone(&doc), index));
            }
        }
        for (key, index) in entries.dynamic_anchors {
            if !self.dynamic.contains_key(&key) {
                self.fetched_dynamic
                    .entry(key)
                    .or_insert_with(|| SchemaHandle::new(Arc::clone(&doc), index));
            }
        }
        SchemaHandle::new(doc, SchemaIndex::ROOT)
    }

    /// The dialect for a `$schema` value. A self-describing meta-schema
    /// (one whose `$schema` is its own URI) supplies its own `$vocabulary`.
    /// A meta-schema that cannot be loaded falls back to the default
    /// dialect with a warning.
    pub(crate) fn dialect_for(
        &self,
        meta_schema: &str,
        own_base: &Url,
        raw: &Value,
        options: &EvaluationOptions,
    ) -> Result<Arc<Dialect>, SchemaError> {
        let uri = match Url::parse(meta_schema) {
            Ok(uri) => without_fragment(&uri),
            Err(e) => {
                tracing::warn!(meta_schema, error = %e, "unparseable $schema, using default vocabularies");
                return Ok(Arc::clone(&self.default_dialect));
            }
        };
        let own_declaration = (uri == *own_base).then_some(raw);
        self.dialect_of(uri, own_declaration, options)
    }

    fn dialect_of(
        &self,
        uri: Url,
        own_declaration: Option<&Value>,
        options: &EvaluationOptions,
    ) -> Result<Arc<Dialect>, SchemaError> {
        if let Some(known) = self.dialects.get(uri.as_str()) {
            return Ok(Arc::clone(known.value()));
        }
        let declaring = match own_declaration {
            Some(raw) => raw.clone(),
            None => match self.ensure_resource(&uri, options) {
                Ok(meta) => meta.raw().clone(),
                Err(e) => {
                    tracing::warn!(
                        meta_schema = %uri,
                        error = %e,
                        "meta-schema unavailable, using default vocabularies"
                    );
                    return Ok(Arc::clone(&self.default_dialect));
                }
            },
        };
        let dialect = Arc::new(self.vocabularies.keywords_for(
            uri.as_str(),
            declaring.get("$vocabulary").and_then(Value::as_object),
        )?);
        self.dialects.insert(uri.to_string(), Arc::clone(&dialect));
        Ok(dialect)
    }

    /// The root of the document at `uri`, fetching and compiling it once if
    /// it is not known.
    pub(crate) fn ensure_resource(
        &self,
        uri: &Url,
        options: &EvaluationOptions,
    ) -> Result<SchemaHandle, RefResolutionError> {
        if let Some(found) = self.lookup(uri.as_str()) {
            return Ok(found);
        }
        let guard = (thread::current().id(), uri.to_string());
        if !self.loading.insert(guard.clone()) {
            return Err(RefResolutionError::FetchFailed {
                uri: uri.to_string(),
                reason: "document is required while it is being loaded".to_string(),
            });
        }
        let slot = self.slot(uri.as_str());
        if slot.document.get().is_none()
            && slot.raw.get().is_none()
            && self.retriever_for(options).is_none()
        {
            self.loading.remove(&guard);
            return Err(RefResolutionError::RetrieverUnavailable {
                uri: uri.to_string(),
            });
        }
        let result = slot
            .document
            .get_or_init(|| self.load(uri, &slot, options))
            .clone();
        self.loading.remove(&guard);
        result
    }

    /// Drop slots holding a failed fetch or compile, so the next attempt
    /// asks the hook again.
    fn retire_failed_fetches(&self) {
        self.slots.retain(|uri, slot| {
            let failed = matches!(slot.raw.get(), Some(Err(_)))
                || matches!(slot.document.get(), Some(Err(_)));
            if failed {
                tracing::debug!(uri = %uri, "retiring failed fetch");
            }
            !failed
        });
    }

    fn slot(&self, uri: &str) -> Arc<FetchSlot> {
        Arc::clone(self.slots.entry(uri.to_string()).or_default().value())
    }

    fn load(
        &self,
        uri: &Url,
        slot: &FetchSlot,
        options: &EvaluationOptions,
    ) -> Result<SchemaHandle, RefResolutionError> {
        let raw = match slot.raw.get() {
            Some(cached) => cached.clone()?,
            None => {
                let fetched = self.fetch(uri, options);
                // An async fetch racing this one keeps its own result.
                let _ = slot.raw.set(fetched.clone());
                fetched?
            }
        };
        let invalid = |reason: String| RefResolutionError::InvalidDocument {
            uri: uri.to_string(),
            reason,
        };
        let schema = Schema::build_with(raw, &self.vocabularies, options.allow_unknown_keywords)
            .map_err(|e| invalid(e.to_string()))?;
        let (document, entries) = index_document(
            schema,
            uri,
            &JsonPointer::root(),
            Arc::clone(&self.default_dialect),
            |meta_schema, own_base, raw| self.dialect_for(meta_schema, own_base, raw, options),
        )
        .map_err(|e| invalid(e.to_string()))?;
        let nodes = document.schema.len();
        let handle = self.insert_fetched(document, entries);
        tracing::debug!(uri = %uri, nodes, "fetched schema compiled");
        Ok(handle)
    }

    fn retriever_for<'a>(&'a self, options: &'a EvaluationOptions) -> Option<&'a Arc<dyn Retrieve>> {
        options.external_fetch.as_ref().or(self.retriever.as_ref())
    }

    fn fetch(&self, uri: &Url, options: &EvaluationOptions) -> Result<Value, RefResolutionError> {
        let retriever = self
            .retriever_for(options)
            .ok_or_else(|| RefResolutionError::RetrieverUnavailable {
                uri: uri.to_string(),
            })?;
        tracing::debug!(uri = %uri, "fetching schema document");
        retriever
            .retrieve(uri)
            .map_err(|e| RefResolutionError::FetchFailed {
                uri: uri.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_async(
        &self,
        uri: &Url,
        retriever: &dyn AsyncRetrieve,
        cancel: &CancellationSignal,
    ) -> Result<Value, RefResolutionError> {
        let slot = self.slot(uri.as_str());
        let outcome = slot
            .raw
            .get_or_try_init(|| async {
                tracing::debug!(uri = %uri, "fetching schema document");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(RefResolutionError::Cancelled {
                        uri: uri.to_string(),
                    }),
                    fetched = retriever.retrieve(uri, cancel) => Ok(fetched.map_err(|e| {
                        RefResolutionError::FetchFailed {
                            uri: uri.to_string(),
                            reason: e.to_string(),
                        }
                    })),
                }
            })
            .await?;
        outcome.clone()
    }

    /// Fetch, breadth of the reference graph first, every document that
    /// `schema` reaches through `$ref`, `$dynamicRef` or `$schema`.
    async fn prefetch(
        &self,
        schema: &SchemaHandle,
        options: &EvaluationOptions,
        retriever: &dyn AsyncRetrieve,
        cancel: &CancellationSignal,
    ) -> Result<(), RefResolutionError> {
        let mut visited = HashSet::new();
        let mut pending = vec![Arc::clone(&schema.doc)];
        while let Some(document) = pending.pop() {
            for uri in external_documents(&document) {
                if self.lookup(uri.as_str()).is_some() || !visited.insert(uri.to_string()) {
                    continue;
                }
                let raw = match self.fetch_async(&uri, retriever, cancel).await {
                    Ok(raw) => raw,
                    Err(e @ RefResolutionError::Cancelled { .. }) => return Err(e),
                    Err(e) => {
                        tracing::debug!(uri = %uri, error = %e, "pre-fetch failed");
                        continue;
                    }
                };
                let meta_schema = raw
                    .get("$schema")
                    .and_then(Value::as_str)
                    .and_then(|m| Url::parse(m).ok())
                    .map(|m| without_fragment(&m));
                if let Some(meta) = meta_schema {
                    if self.lookup(meta.as_str()).is_none() && visited.insert(meta.to_string()) {
                        if let Err(e @ RefResolutionError::Cancelled { .. }) =
                            self.fetch_async(&meta, retriever, cancel).await
                        {
                            return Err(e);
                        }
                    }
                }
                match self.ensure_resource(&uri, options) {
                    Ok(handle) => pending.push(Arc::clone(&handle.doc)),
                    Err(e) => tracing::debug!(uri = %uri, error = %e, "pre-fetched document rejected"),
                }
            }
        }
        Ok(())
    }
}

/// Documents referenced from `document`, without fragments.
fn external_documents(document: &Document) -> Vec<Url> {
    let mut found = Vec::new();
    for (slot, meta) in document.metas.iter().enumerate() {
        let Some(Value::Object(map)) = document.schema.raw_at(SchemaIndex(slot)) else {
            continue;
        };
        for keyword in ["$ref", "$dynamicRef", "$schema"] {
            let Some(reference) = map.get(keyword).and_then(Value::as_str) else {
                continue;
            };
            if let Ok(uri) = meta.base.join(reference) {
                let uri = without_fragment(&uri);
                if !found.contains(&uri) {
                    found.push(uri);
                }
            }
        }
    }
    found
}
