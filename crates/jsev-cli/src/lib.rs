//! # jsev-cli — Command-line front end for the jsev engine
//!
//! Provides the `jsev` binary.
//!
//! ## Subcommands
//!
//! - `jsev validate` — evaluate JSON or YAML instances against a schema and
//!   print the result in flag, list, or hierarchical form.
//! - `jsev check` — evaluate schema documents against their meta-schema.
//!
//! ## Exit codes
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Every instance (or schema) is valid.                       |
//! | 1    | At least one instance (or schema) is invalid.              |
//! | 2    | Operational error: unreadable file, malformed schema, unresolvable reference. |
//!
//! ```bash
//! jsev validate --schema person.schema.json alice.json bob.yaml
//! jsev validate --schema api.yaml --schema-dir schemas/ --output hierarchical req.json
//! jsev check schemas/*.json
//! ```

pub mod check;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use jsev_schema::loader::load_document;

/// Exit code for a valid result.
pub const EXIT_VALID: u8 = 0;

/// Exit code for an invalid instance or schema.
pub const EXIT_INVALID: u8 = 1;

/// Exit code for an operational error.
pub const EXIT_ERROR: u8 = 2;

/// Load a JSON or YAML document, attaching the path to any error.
pub fn load(path: &Path) -> Result<Value> {
    load_document(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Fold per-document verdicts into an exit code.
pub fn exit_code(all_valid: bool) -> u8 {
    if all_valid {
        EXIT_VALID
    } else {
        EXIT_INVALID
    }
}
