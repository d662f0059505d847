//! # Validate Subcommand
//!
//! Evaluates one or more instance documents against a schema and prints
//! each result as JSON in the requested output format.
//!
//! Options come from three layers, later ones winning: the engine
//! defaults, an optional `--config` file (YAML or JSON, camelCase keys as
//! in [`EvaluationOptions`]), and individual flags.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use jsev_schema::loader::is_yaml;
use jsev_schema::{
    DirectoryRetriever, EvaluationOptions, Output, OutputFormat, SchemaHandle, SchemaRegistry,
};

use crate::{exit_code, load};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema document (JSON or YAML).
    #[arg(long)]
    pub schema: PathBuf,

    /// Directory of schema files used to resolve external `$ref`s.
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Output format: flag, list, or hierarchical.
    #[arg(long)]
    pub output: Option<OutputFormat>,

    /// Evaluation options file (YAML or JSON).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Treat `format` as an assertion.
    #[arg(long)]
    pub assert_format: bool,

    /// Maximum nesting of schema evaluations.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Instance documents to validate.
    #[arg(required = true)]
    pub instances: Vec<PathBuf>,
}

/// One instance's result as printed.
#[derive(Serialize)]
struct Report<'a> {
    instance: String,
    #[serde(flatten)]
    output: &'a Output,
}

/// Read an options file. YAML is chosen by extension, JSON otherwise.
pub fn load_options(path: &Path) -> Result<EvaluationOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let options = if is_yaml(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?
    };
    Ok(options)
}

/// Merge the config file and flags into the options for this run.
pub fn resolve_options(args: &ValidateArgs) -> Result<EvaluationOptions> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => EvaluationOptions::default(),
    };
    if let Some(format) = args.output {
        options.output_format = format;
    }
    if args.assert_format {
        options.require_format_assertions = true;
    }
    if let Some(depth) = args.max_depth {
        options.max_recursion_depth = Some(depth);
    }
    Ok(options)
}

/// Build the registry and register the schema under test.
fn prepare(
    args: &ValidateArgs,
    options: &EvaluationOptions,
) -> Result<(SchemaRegistry, SchemaHandle)> {
    let mut registry = SchemaRegistry::new().with_options(options.clone());
    if let Some(dir) = &args.schema_dir {
        let retriever = DirectoryRetriever::new(dir)
            .with_context(|| format!("failed to load schema directory {}", dir.display()))?;
        tracing::info!(
            dir = %dir.display(),
            documents = retriever.len(),
            "schema directory loaded"
        );
        registry = registry.with_retriever(Arc::new(retriever));
    }

    let raw = load(&args.schema)?;
    let handle = registry
        .register(raw)
        .with_context(|| format!("schema {} rejected", args.schema.display()))?;
    tracing::debug!(schema = %args.schema.display(), uri = handle.uri(), "schema registered");
    Ok((registry, handle))
}

/// Execute the validate subcommand.
///
/// Returns `0` when every instance is valid and `1` otherwise. Errors are
/// operational and map to exit code `2` in `main`.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let options = resolve_options(args)?;
    let (registry, handle) = prepare(args, &options)?;

    let mut all_valid = true;
    for path in &args.instances {
        let instance = load(path)?;
        let output = registry
            .validate(&handle, &instance, &options)
            .with_context(|| format!("evaluation of {} aborted", path.display()))?;

        tracing::info!(instance = %path.display(), valid = output.valid(), "evaluated");
        all_valid &= output.valid();

        let report = Report {
            instance: path.display().to_string(),
            output: &output,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(exit_code(all_valid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(schema: PathBuf, instances: Vec<PathBuf>) -> ValidateArgs {
        ValidateArgs {
            schema,
            schema_dir: None,
            output: None,
            config: None,
            assert_format: false,
            max_depth: None,
            instances,
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn validate_valid_instance_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "s.json", r#"{"type": "integer", "minimum": 0}"#);
        let instance = write(dir.path(), "i.json", "5");
        assert_eq!(run_validate(&args(schema, vec![instance])).unwrap(), 0);
    }

    #[test]
    fn validate_invalid_instance_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "s.json", r#"{"type": "integer", "minimum": 0}"#);
        let good = write(dir.path(), "good.json", "5");
        let bad = write(dir.path(), "bad.json", "-1");
        assert_eq!(run_validate(&args(schema, vec![good, bad])).unwrap(), 1);
    }

    #[test]
    fn validate_yaml_schema_and_instance() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(
            dir.path(),
            "s.yaml",
            "type: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n",
        );
        let instance = write(dir.path(), "i.yaml", "name: alice\n");
        assert_eq!(run_validate(&args(schema, vec![instance])).unwrap(), 0);
    }

    #[test]
    fn validate_malformed_schema_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "s.json", r#"{"minimum": "zero"}"#);
        let instance = write(dir.path(), "i.json", "5");
        let err = run_validate(&args(schema, vec![instance])).unwrap_err();
        assert!(format!("{err:#}").contains("rejected"));
    }

    #[test]
    fn validate_missing_instance_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "s.json", "true");
        let missing = dir.path().join("missing.json");
        assert!(run_validate(&args(schema, vec![missing])).is_err());
    }

    #[test]
    fn validate_resolves_refs_from_schema_dir() {
        let dir = tempfile::tempdir().unwrap();
        let defs = dir.path().join("defs");
        std::fs::create_dir(&defs).unwrap();
        write(
            &defs,
            "positive.json",
            r#"{"$id": "https://example.com/positive", "exclusiveMinimum": 0}"#,
        );
        let schema = write(
            dir.path(),
            "s.json",
            r#"{"properties": {"n": {"$ref": "https://example.com/positive"}}}"#,
        );
        let good = write(dir.path(), "good.json", r#"{"n": 1}"#);
        let bad = write(dir.path(), "bad.json", r#"{"n": 0}"#);

        let mut a = args(schema.clone(), vec![good]);
        a.schema_dir = Some(defs.clone());
        assert_eq!(run_validate(&a).unwrap(), 0);

        let mut a = args(schema, vec![bad]);
        a.schema_dir = Some(defs);
        assert_eq!(run_validate(&a).unwrap(), 1);
    }

    #[test]
    fn validate_unresolvable_ref_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(
            dir.path(),
            "s.json",
            r#"{"$ref": "https://example.com/nowhere"}"#,
        );
        let instance = write(dir.path(), "i.json", "1");
        assert!(run_validate(&args(schema, vec![instance])).is_err());
    }

    #[test]
    fn validate_assert_format_flag() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "s.json", r#"{"format": "ipv4"}"#);
        let instance = write(dir.path(), "i.json", r#""not-an-ip""#);

        let a = args(schema.clone(), vec![instance.clone()]);
        assert_eq!(run_validate(&a).unwrap(), 0);

        let mut a = args(schema, vec![instance]);
        a.assert_format = true;
        assert_eq!(run_validate(&a).unwrap(), 1);
    }

    #[test]
    fn resolve_options_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(
            dir.path(),
            "jsev.yaml",
            "outputFormat: hierarchical\nmaxRecursionDepth: 10\nannotateUnknownKeywords: true\n",
        );
        let mut a = args(PathBuf::from("s.json"), vec![PathBuf::from("i.json")]);
        a.config = Some(config);
        a.output = Some(OutputFormat::Flag);

        let options = resolve_options(&a).unwrap();
        assert_eq!(options.output_format, OutputFormat::Flag);
        assert_eq!(options.max_recursion_depth, Some(10));
        assert!(options.annotate_unknown_keywords);
        assert!(!options.require_format_assertions);
    }

    #[test]
    fn load_options_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(
            dir.path(),
            "jsev.json",
            r#"{"requireFormatAssertions": true, "maxRecursionDepth": null}"#,
        );
        let options = load_options(&config).unwrap();
        assert!(options.require_format_assertions);
        assert_eq!(options.max_recursion_depth, None);
        assert_eq!(options.output_format, OutputFormat::List);
    }

    #[test]
    fn load_options_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = write(dir.path(), "jsev.yaml", "outputFormat: fancy\n");
        assert!(load_options(&config).is_err());
    }

    #[test]
    fn report_flattens_output() {
        let output = Output::Flag(jsev_schema::output::FlagOutput { valid: true });
        let report = Report {
            instance: "i.json".to_string(),
            output: &output,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"instance": "i.json", "valid": true})
        );
    }
}
