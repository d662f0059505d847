//! # Document Loading
//!
//! Reads JSON and YAML documents from disk into `serde_json::Value`.
//! The format is chosen by file extension: `.yaml`/`.yml` are parsed as
//! YAML and converted, everything else as JSON.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// A document could not be loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file (or directory) could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON or YAML.
    #[error("document load error for '{path}': {reason}")]
    Parse {
        /// Path of the document.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Whether the path names a YAML document.
pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Load a JSON or YAML document.
///
/// # Errors
///
/// Returns `LoadError::Io` if the file cannot be read and
/// `LoadError::Parse` if its content does not parse.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_document(&content, is_yaml(path)).map_err(|reason| LoadError::Parse {
        path: path.display().to_string(),
        reason,
    })
}

/// Parse document text as YAML or JSON.
///
/// # Errors
///
/// Returns the parser diagnostic.
pub fn parse_document(content: &str, yaml: bool) -> Result<Value, String> {
    if yaml {
        let yaml_value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {e}"))?;
        yaml_to_json_value(&yaml_value)
            .map_err(|e| format!("YAML-to-JSON conversion failed: {e}"))
    } else {
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Tags are dropped; scalar map keys are stringified.
///
/// # Errors
///
/// Fails on non-finite floats and on map keys that are sequences or maps.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
