//! # Vocabulary Registry
//!
//! Maps keyword names to handlers and keyword sets to vocabulary URIs.
//! [`VocabularyRegistry::keywords_for`] turns a meta-schema's
//! `$vocabulary` declaration into a [`Dialect`]: the set of vocabularies
//! whose keywords are evaluated for documents using that meta-schema.
//!
//! ## Invariants
//!
//! - A required (`true`) vocabulary that is not registered is an
//!   `UnsupportedVocabularyError`; an optional one is ignored.
//! - The core vocabulary is always active.
//! - Registering a keyword name a second time replaces the earlier
//!   handler and logs a warning.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use jsev_core::UnsupportedVocabularyError;
use serde_json::{Map, Value};

use crate::keywords::{self, KeywordHandler};

/// `https://json-schema.org/draft/2020-12/vocab/core`
pub const CORE: &str = "https://json-schema.org/draft/2020-12/vocab/core";
/// `https://json-schema.org/draft/2020-12/vocab/applicator`
pub const APPLICATOR: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
/// `https://json-schema.org/draft/2020-12/vocab/unevaluated`
pub const UNEVALUATED: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
/// `https://json-schema.org/draft/2020-12/vocab/validation`
pub const VALIDATION: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
/// `https://json-schema.org/draft/2020-12/vocab/meta-data`
pub const META_DATA: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
/// `https://json-schema.org/draft/2020-12/vocab/format-annotation`
pub const FORMAT_ANNOTATION: &str = "https://json-schema.org/draft/2020-12/vocab/format-annotation";
/// `https://json-schema.org/draft/2020-12/vocab/format-assertion`
pub const FORMAT_ASSERTION: &str = "https://json-schema.org/draft/2020-12/vocab/format-assertion";
/// `https://json-schema.org/draft/2020-12/vocab/content`
pub const CONTENT: &str = "https://json-schema.org/draft/2020-12/vocab/content";

/// A registered keyword with the vocabulary that supplied it.
pub struct KeywordEntry {
    pub(crate) vocabulary: Arc<str>,
    pub(crate) handler: Arc<dyn KeywordHandler>,
}

impl std::fmt::Debug for KeywordEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordEntry")
            .field("vocabulary", &self.vocabulary)
            .field("keyword", &self.handler.name())
            .finish()
    }
}

/// The vocabularies active for one meta-schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    meta_schema: Option<String>,
    vocabularies: BTreeSet<Arc<str>>,
    format_assertion: bool,
}

impl Dialect {
    /// The meta-schema this dialect was computed from; `None` for the
    /// default dialect.
    pub fn meta_schema(&self) -> Option<&str> {
        self.meta_schema.as_deref()
    }

    /// Whether keywords of `vocabulary` are evaluated. The assertion
    /// vocabulary carries the `format` keyword of the annotation one.
    pub fn is_active(&self, vocabulary: &str) -> bool {
        vocabulary == CORE
            || self.vocabularies.contains(vocabulary)
            || (self.format_assertion && vocabulary == FORMAT_ANNOTATION)
    }

    /// Whether the format-assertion vocabulary is in effect.
    pub fn asserts_format(&self) -> bool {
        self.format_assertion
    }

    /// Active vocabulary URIs.
    pub fn vocabularies(&self) -> impl Iterator<Item = &str> {
        self.vocabularies.iter().map(|v| &**v)
    }
}

/// Keyword handlers indexed by name, grouped by vocabulary URI.
#[derive(Debug)]
pub struct VocabularyRegistry {
    keywords: HashMap<String, KeywordEntry>,
    vocabularies: BTreeSet<Arc<str>>,
}

impl Default for VocabularyRegistry {
    /// The built-in 2020-12 vocabularies.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(CORE, keywords::core::handlers());
        registry.register(APPLICATOR, keywords::applicator::handlers());
        registry.register(UNEVALUATED, keywords::unevaluated::handlers());
        registry.register(VALIDATION, keywords::validation::handlers());
        registry.register(META_DATA, keywords::metadata::handlers());
        registry.register(FORMAT_ANNOTATION, keywords::format::handlers());
        registry.register(FORMAT_ASSERTION, Vec::new());
        registry.register(CONTENT, keywords::content::handlers());
        registry
    }
}

impl VocabularyRegistry {
    /// A registry with no vocabularies at all.
    pub fn empty() -> Self {
        Self {
            keywords: HashMap::new(),
            vocabularies: BTreeSet::new(),
        }
    }

    /// Register a vocabulary and its keyword handlers.
    pub fn register(&mut self, uri: &str, handlers: Vec<Arc<dyn KeywordHandler>>) {
        let vocabulary: Arc<str> = Arc::from(uri);
        self.vocabularies.insert(Arc::clone(&vocabulary));
        for handler in handlers {
            let name = handler.name().to_string();
            let entry = KeywordEntry {
                vocabulary: Arc::clone(&vocabulary),
                handler,
            };
            if let Some(previous) = self.keywords.insert(name.clone(), entry) {
                tracing::warn!(
                    keyword = %name,
                    previous = %previous.vocabulary,
                    vocabulary = %uri,
                    "keyword handler replaced by a later vocabulary"
                );
            }
        }
        tracing::debug!(vocabulary = %uri, "vocabulary registered");
    }

    /// Whether `uri` names a registered vocabulary.
    pub fn is_registered(&self, uri: &str) -> bool {
        self.vocabularies.contains(uri)
    }

    /// The handler for a keyword name.
    pub fn lookup(&self, keyword: &str) -> Option<&KeywordEntry> {
        self.keywords.get(keyword)
    }

    /// The dialect used when a document names no meta-schema (or one
    /// without `$vocabulary`): every registered vocabulary except
    /// format-assertion.
    pub fn default_dialect(&self) -> Dialect {
        Dialect {
            meta_schema: None,
            vocabularies: self
                .vocabularies
                .iter()
                .filter(|v| &***v != FORMAT_ASSERTION)
                .cloned()
                .collect(),
            format_assertion: false,
        }
    }

    /// Compute the dialect of a meta-schema from its `$vocabulary` object.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVocabularyError` if a vocabulary marked `true`
    /// is not registered.
    pub fn keywords_for(
        &self,
        meta_schema: &str,
        declaration: Option<&Map<String, Value>>,
    ) -> Result<Dialect, UnsupportedVocabularyError> {
        let Some(declaration) = declaration else {
            let mut dialect = self.default_dialect();
            dialect.meta_schema = Some(meta_schema.to_string());
            return Ok(dialect);
        };
        let mut vocabularies = BTreeSet::new();
        for (uri, required) in declaration {
            match self.vocabularies.get(uri.as_str()) {
                Some(known) => {
                    vocabularies.insert(Arc::clone(known));
                }
                None if required.as_bool().unwrap_or(false) => {
                    return Err(UnsupportedVocabularyError {
                        meta_schema: meta_schema.to_string(),
                        vocabulary: uri.clone(),
                    });
                }
                None => {
                    tracing::warn!(
                        meta_schema = %meta_schema,
                        vocabulary = %uri,
                        "ignoring optional vocabulary that is not registered"
                    );
                }
            }
        }
        let format_assertion = vocabularies.contains(FORMAT_ASSERTION);
        Ok(Dialect {
            meta_schema: Some(meta_schema.to_string()),
            vocabularies,
            format_assertion,
        })
    }

    /// The handlers active in `dialect`, sorted by keyword name.
    pub fn active_keywords<'a>(
        &'a self,
        dialect: &'a Dialect,
    ) -> impl Iterator<Item = (&'a str, &'a Arc<dyn KeywordHandler>)> + 'a {
        let mut names: Vec<&String> = self
            .keywords
            .iter()
            .filter(|(_, entry)| dialect.is_active(&entry.vocabulary))
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names.into_iter().filter_map(move |name| {
            self.keywords
                .get(name.as_str())
                .map(|entry| (name.as_str(), &entry.handler))
        })
    }
}
