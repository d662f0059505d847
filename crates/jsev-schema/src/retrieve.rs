//! # Fetch Hooks
//!
//! The engine never performs I/O itself. Documents it does not know are
//! requested through a [`Retrieve`] hook during synchronous evaluation, or
//! through an [`AsyncRetrieve`] hook when pre-fetching for
//! `evaluate_async`. Both receive the absolute document URI (no fragment).
//!
//! [`DirectoryRetriever`] serves schemas from a local directory, indexed
//! by their `$id` and by file name, so cross-file `$ref`s resolve without
//! network access.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;
use url::Url;

use crate::loader::{load_document, LoadError};

/// Error type returned by fetch hooks.
pub type RetrieveError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous fetch hook.
pub trait Retrieve: Send + Sync {
    /// Fetch the raw JSON of the document at `uri`.
    ///
    /// # Errors
    ///
    /// Any failure; it is reported as `RefResolutionError::FetchFailed`.
    fn retrieve(&self, uri: &Url) -> Result<Value, RetrieveError>;
}

impl<F> Retrieve for F
where
    F: Fn(&Url) -> Result<Value, RetrieveError> + Send + Sync,
{
    fn retrieve(&self, uri: &Url) -> Result<Value, RetrieveError> {
        self(uri)
    }
}

/// Asynchronous fetch hook.
#[async_trait]
pub trait AsyncRetrieve: Send + Sync {
    /// Fetch the raw JSON of the document at `uri`. Implementations should
    /// stop early once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Any failure; it is reported as `RefResolutionError::FetchFailed`.
    async fn retrieve(&self, uri: &Url, cancel: &CancellationSignal)
        -> Result<Value, RetrieveError>;
}

/// Runs a synchronous hook on the async path.
#[derive(Debug, Clone)]
pub struct SyncRetriever<R>(pub R);

#[async_trait]
impl<R: Retrieve> AsyncRetrieve for SyncRetriever<R> {
    async fn retrieve(
        &self,
        uri: &Url,
        _cancel: &CancellationSignal,
    ) -> Result<Value, RetrieveError> {
        self.0.retrieve(uri)
    }
}

/// Cooperative cancellation for asynchronous fetches.
///
/// Clones share state: cancelling one cancels all.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationSignal {
    /// A signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal and wake every waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal fires.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Serves schema files from a directory.
///
/// Every `*.json`, `*.yaml` and `*.yml` file directly inside the directory
/// is loaded. A document is found by its `$id` or, failing that, by the
/// last path segment of the requested URI matching a file name.
#[derive(Debug, Clone)]
pub struct DirectoryRetriever {
    dir: PathBuf,
    by_id: HashMap<String, Value>,
    by_file: HashMap<String, Value>,
}

impl DirectoryRetriever {
    /// Load every schema file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the directory cannot be read or a schema file
    /// does not parse.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref().to_path_buf();
        let io_error = |source| LoadError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut by_id = HashMap::new();
        let mut by_file = HashMap::new();

        for entry in std::fs::read_dir(&dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let is_schema = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json" | "yaml" | "yml")
            );
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_schema || !path.is_file() {
                continue;
            }
            let value = load_document(&path)?;
            if let Some(id) = value.get("$id").and_then(Value::as_str) {
                by_id.insert(id.trim_end_matches('#').to_string(), value.clone());
            }
            by_file.insert(name.to_string(), value);
        }

        tracing::debug!(
            dir = %dir.display(),
            documents = by_file.len(),
            "schema directory loaded"
        );
        Ok(Self { dir, by_id, by_file })
    }

    /// The directory documents were loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of loaded documents.
    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    /// True if the directory held no schema files.
    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    /// Loaded file names, sorted.
    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_file.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The document stored under a file name.
    pub fn get(&self, file_name: &str) -> Option<&Value> {
        self.by_file.get(file_name)
    }
}

impl Retrieve for DirectoryRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, RetrieveError> {
        let mut key = uri.clone();
        key.set_fragment(None);
        if let Some(value) = self.by_id.get(key.as_str()) {
            return Ok(value.clone());
        }
        let file_name = key
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let candidates = [
            file_name.to_string(),
            format!("{file_name}.json"),
            format!("{file_name}.schema.json"),
        ];
        candidates
            .iter()
            .find_map(|name| self.by_file.get(name))
            .cloned()
            .ok_or_else(|| format!("'{uri}' not found in {}", self.dir.display()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_retriever() {
        let hook = |uri: &Url| -> Result<Value, RetrieveError> {
            Ok(json!({"$id": uri.as_str(), "type": "string"}))
        };
        let uri = Url::parse("https://example.com/s.json").unwrap();
        assert_eq!(hook.retrieve(&uri).unwrap()["type"], json!("string"));
    }

    #[test]
    fn test_directory_retriever_by_id_and_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("address.schema.json"),
            r#"{"$id": "https://schemas.example.com/address", "type": "object"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("port.yaml"), "type: integer\nminimum: 1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let retriever = DirectoryRetriever::new(dir.path()).unwrap();
        assert_eq!(retriever.len(), 2);
        assert_eq!(retriever.file_names(), vec!["address.schema.json", "port.yaml"]);

        let by_id = Url::parse("https://schemas.example.com/address#/properties").unwrap();
        assert_eq!(retriever.retrieve(&by_id).unwrap()["type"], json!("object"));

        let by_name = Url::parse("json-schema:///port.yaml").unwrap();
        assert_eq!(retriever.retrieve(&by_name).unwrap()["minimum"], json!(1));

        let by_stem = Url::parse("https://other.example.com/address").unwrap();
        assert!(retriever.retrieve(&by_stem).is_ok());

        let missing = Url::parse("https://schemas.example.com/none").unwrap();
        assert!(retriever.retrieve(&missing).is_err());
    }

    #[test]
    fn test_directory_retriever_rejects_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(matches!(
            DirectoryRetriever::new(dir.path()),
            Err(LoadError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_signal_wakes_waiters() {
        let signal = CancellationSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        tokio::task::yield_now().await;
        assert!(!signal.is_cancelled());
        signal.cancel();
        waiter.await.unwrap();
        assert!(signal.is_cancelled());
        signal.cancelled().await;
    }

    #[tokio::test]
    async fn test_sync_retriever_adapter() {
        let hook = |_: &Url| -> Result<Value, RetrieveError> { Ok(json!(true)) };
        let adapter = SyncRetriever(hook);
        let uri = Url::parse("https://example.com/x").unwrap();
        let value = adapter.retrieve(&uri, &CancellationSignal::new()).await.unwrap();
        assert_eq!(value, json!(true));
    }
}
