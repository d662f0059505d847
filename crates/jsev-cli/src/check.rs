//! # Check Subcommand
//!
//! Evaluates schema documents against their meta-schema (`$schema`, or the
//! 2020-12 dialect) and then compiles them, so both meta-schema violations
//! and keyword shape errors the meta-schema cannot express are reported.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use jsev_schema::{EvaluationNode, SchemaRegistry};

use crate::{exit_code, load};

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema documents to check.
    #[arg(required = true)]
    pub schemas: Vec<PathBuf>,
}

/// Verdict for one schema document.
#[derive(Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Conforms to its meta-schema and compiles.
    Valid,
    /// Violations as `(instance location, keyword, message)`.
    Invalid(Vec<(String, String, String)>),
}

fn violations(node: &EvaluationNode) -> Vec<(String, String, String)> {
    node.errors()
        .map(|(n, keyword, message)| {
            (
                n.instance_location.to_string(),
                keyword.to_string(),
                message.to_string(),
            )
        })
        .collect()
}

/// Check one schema document.
pub fn check_schema(registry: &SchemaRegistry, path: &Path) -> Result<CheckOutcome> {
    let raw = load(path)?;
    let node = registry
        .check_schema(&raw)
        .with_context(|| format!("meta-schema evaluation of {} aborted", path.display()))?;
    if !node.valid {
        return Ok(CheckOutcome::Invalid(violations(&node)));
    }
    match registry.build(raw) {
        Ok(_) => Ok(CheckOutcome::Valid),
        Err(e) => Ok(CheckOutcome::Invalid(vec![(
            e.location.clone(),
            String::new(),
            e.reason.clone(),
        )])),
    }
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let registry = SchemaRegistry::new();
    let mut all_valid = true;

    for path in &args.schemas {
        match check_schema(&registry, path)? {
            CheckOutcome::Valid => println!("  OK    {}", path.display()),
            CheckOutcome::Invalid(found) => {
                all_valid = false;
                println!("  FAIL  {}", path.display());
                for (location, keyword, message) in found {
                    if keyword.is_empty() {
                        println!("        {location}: {message}");
                    } else {
                        println!("        {location} ({keyword}): {message}");
                    }
                }
            }
        }
    }

    tracing::info!(schemas = args.schemas.len(), all_valid, "check complete");
    Ok(exit_code(all_valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn check_valid_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "s.json",
            r#"{"type": "object", "properties": {"a": {"minimum": 1}}}"#,
        );
        let registry = SchemaRegistry::new();
        assert_eq!(check_schema(&registry, &path).unwrap(), CheckOutcome::Valid);
    }

    #[test]
    fn check_reports_meta_schema_violation_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "s.yaml",
            "properties:\n  a:\n    minimum: low\n",
        );
        let registry = SchemaRegistry::new();
        let CheckOutcome::Invalid(found) = check_schema(&registry, &path).unwrap() else {
            panic!("expected violations");
        };
        assert!(found
            .iter()
            .any(|(location, _, _)| location == "/properties/a/minimum"));
    }

    #[test]
    fn check_reports_compile_errors_the_meta_schema_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s.json", r#"{"pattern": "("}"#);
        let registry = SchemaRegistry::new();
        let CheckOutcome::Invalid(found) = check_schema(&registry, &path).unwrap() else {
            panic!("expected a compile error");
        };
        assert_eq!(found[0].0, "/pattern");
    }

    #[test]
    fn run_check_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.json", r#"{"type": "string"}"#);
        let bad = write(dir.path(), "bad.json", r#"{"type": 5}"#);

        let args = CheckArgs {
            schemas: vec![good.clone()],
        };
        assert_eq!(run_check(&args).unwrap(), 0);

        let args = CheckArgs {
            schemas: vec![good, bad],
        };
        assert_eq!(run_check(&args).unwrap(), 1);
    }

    #[test]
    fn run_check_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = CheckArgs {
            schemas: vec![dir.path().join("missing.json")],
        };
        assert!(run_check(&args).is_err());
    }
}
