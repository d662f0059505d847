//! Integration tests: end-to-end evaluation through the public API.
//!
//! Each section registers schemas in a fresh `SchemaRegistry` and checks
//! verdicts, error placement and annotations in the rendered output.

use jsev_schema::{
    EvaluationError, EvaluationOptions, OutputFormat, SchemaError, SchemaRegistry,
};
use serde_json::{json, Value};

fn options(format: OutputFormat) -> EvaluationOptions {
    EvaluationOptions::default().with_output_format(format)
}

fn is_valid(schema: Value, instance: Value) -> bool {
    let mut registry = SchemaRegistry::new();
    let handle = registry.register(schema).unwrap();
    registry
        .evaluate(&handle, &instance, &options(OutputFormat::List))
        .unwrap()
        .valid
}

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_minimum_violation_reported_at_root() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({"type": "integer", "minimum": 10}))
        .unwrap();
    let node = registry
        .evaluate(&handle, &json!(5), &options(OutputFormat::List))
        .unwrap();
    assert!(!node.valid);
    let errors: Vec<_> = node.errors().collect();
    assert_eq!(errors.len(), 1);
    let (at, keyword, _) = errors[0];
    assert_eq!(keyword, "minimum");
    assert!(at.instance_location.is_empty());

    let output = registry
        .validate(&handle, &json!(5), &options(OutputFormat::List))
        .unwrap()
        .to_value()
        .unwrap();
    assert_eq!(output["valid"], json!(false));
    assert_eq!(output["details"][0]["instanceLocation"], json!(""));
    assert!(output["details"][0]["errors"]["minimum"].is_string());
}

#[test]
fn test_dynamic_anchor_follows_outermost_override() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(json!({
            "$id": "https://example.com/list",
            "type": "array",
            "items": {"$dynamicRef": "#elements"},
            "$defs": {"elements": {"$dynamicAnchor": "elements"}}
        }))
        .unwrap();
    let strings = registry
        .register(json!({
            "$id": "https://example.com/strings",
            "$ref": "list",
            "$defs": {"elements": {"$dynamicAnchor": "elements", "type": "string"}}
        }))
        .unwrap();
    let numbers = registry
        .register(json!({
            "$id": "https://example.com/numbers",
            "$ref": "list",
            "$defs": {"elements": {"$dynamicAnchor": "elements", "type": "number"}}
        }))
        .unwrap();
    let list = registry.resolve("https://example.com/list").unwrap();
    let opts = options(OutputFormat::Flag);

    let words = json!(["a", "b"]);
    let figures = json!([1, 2.5]);
    assert!(registry.evaluate(&strings, &words, &opts).unwrap().valid);
    assert!(!registry.evaluate(&strings, &figures, &opts).unwrap().valid);
    assert!(registry.evaluate(&numbers, &figures, &opts).unwrap().valid);
    assert!(!registry.evaluate(&numbers, &words, &opts).unwrap().valid);
    // Without an override the list accepts anything.
    assert!(registry.evaluate(&list, &json!(["a", 1]), &opts).unwrap().valid);
}

#[test]
fn test_dynamic_ref_without_matching_anchor_is_static() {
    // The static target has no $dynamicAnchor, so the outer anchor is ignored.
    let mut registry = SchemaRegistry::new();
    registry
        .register(json!({
            "$id": "https://example.com/inner",
            "$dynamicRef": "#/$defs/strict",
            "$defs": {"strict": {"type": "integer"}}
        }))
        .unwrap();
    let outer = registry
        .register(json!({
            "$id": "https://example.com/outer",
            "$ref": "inner",
            "$defs": {"strict": {"$dynamicAnchor": "strict"}}
        }))
        .unwrap();
    let opts = options(OutputFormat::Flag);
    assert!(!registry.evaluate(&outer, &json!("x"), &opts).unwrap().valid);
}

#[test]
fn test_any_of_list_output() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({
            "anyOf": [
                {"title": "first", "type": "string"},
                {"title": "second", "type": "number"},
                {"title": "third", "minLength": 1}
            ]
        }))
        .unwrap();
    let output = registry
        .validate(&handle, &json!("abc"), &options(OutputFormat::List))
        .unwrap()
        .to_value()
        .unwrap();
    assert_eq!(output["valid"], json!(true));

    let details = output["details"].as_array().unwrap();
    let with_errors: Vec<&Value> = details
        .iter()
        .filter(|unit| unit.get("errors").is_some())
        .collect();
    assert_eq!(with_errors.len(), 1);
    assert_eq!(with_errors[0]["evaluationPath"], json!("/anyOf/1"));
    assert!(with_errors[0].get("annotations").is_none());

    let titles: Vec<&Value> = details
        .iter()
        .filter_map(|unit| unit.get("annotations").and_then(|a| a.get("title")))
        .collect();
    assert_eq!(titles, vec![&json!("first"), &json!("third")]);
}

#[test]
fn test_hierarchical_pass_has_no_errors() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({"type": "object", "properties": {"foo": {"type": "integer"}}}))
        .unwrap();
    let output = registry
        .validate(&handle, &json!({"foo": 1}), &options(OutputFormat::Hierarchical))
        .unwrap()
        .to_value()
        .unwrap();
    assert_eq!(output["valid"], json!(true));
    assert!(output.get("errors").is_none());
    assert_eq!(output["annotations"]["properties"], json!(["foo"]));
}

#[test]
fn test_idempotent_and_conflicting_registration() {
    let mut registry = SchemaRegistry::new();
    let schema = json!({"$id": "https://example.com/item", "type": "string"});
    registry.register(schema.clone()).unwrap();
    registry.register(schema).unwrap();
    let err = registry
        .register(json!({"$id": "https://example.com/item", "type": "number"}))
        .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateId(_)));
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[test]
fn test_recursive_ref_through_defs() {
    let tree = json!({
        "$id": "https://example.com/tree",
        "type": "object",
        "properties": {
            "value": {"type": "integer"},
            "children": {"type": "array", "items": {"$ref": "#"}}
        },
        "required": ["value"]
    });
    assert!(is_valid(
        tree.clone(),
        json!({"value": 1, "children": [{"value": 2, "children": []}]})
    ));
    assert!(!is_valid(tree, json!({"value": 1, "children": [{"children": []}]})));
}

#[test]
fn test_anchor_and_pointer_refs() {
    let schema = json!({
        "$defs": {
            "positive": {"$anchor": "positive", "exclusiveMinimum": 0},
            "small": {"maximum": 10}
        },
        "allOf": [{"$ref": "#positive"}, {"$ref": "#/$defs/small"}]
    });
    assert!(is_valid(schema.clone(), json!(5)));
    assert!(!is_valid(schema.clone(), json!(0)));
    assert!(!is_valid(schema, json!(11)));
}

#[test]
fn test_ref_reports_under_referencing_path() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({
            "$id": "https://example.com/root",
            "properties": {"age": {"$ref": "#/$defs/age"}},
            "$defs": {"age": {"minimum": 0}}
        }))
        .unwrap();
    let node = registry
        .evaluate(&handle, &json!({"age": -1}), &options(OutputFormat::List))
        .unwrap();
    let (at, keyword, _) = node.errors().next().unwrap();
    assert_eq!(keyword, "minimum");
    assert_eq!(at.evaluation_path.to_string(), "/properties/age/$ref");
    assert_eq!(&*at.schema_location, "https://example.com/root#/$defs/age");
    assert_eq!(at.instance_location.to_string(), "/age");
}

#[test]
fn test_unresolvable_ref_aborts_evaluation() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({"$ref": "https://example.com/nowhere"}))
        .unwrap();
    let err = registry
        .evaluate(&handle, &json!(1), &options(OutputFormat::Flag))
        .unwrap_err();
    assert!(matches!(err, EvaluationError::RefResolution(_)));
}

#[test]
fn test_self_reference_with_recursive_instance_hits_depth_guard() {
    let mut registry = SchemaRegistry::new();
    let handle = registry.register(json!({"$ref": "#"})).unwrap();
    let opts = options(OutputFormat::Flag).with_max_recursion_depth(Some(32));
    let err = registry.evaluate(&handle, &json!(1), &opts).unwrap_err();
    match err {
        EvaluationError::DepthExceeded(e) => assert_eq!(e.limit, 32),
        other => panic!("expected depth error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Applicators and unevaluated keywords
// ---------------------------------------------------------------------------

#[test]
fn test_if_then_else() {
    let schema = json!({
        "if": {"properties": {"kind": {"const": "circle"}}, "required": ["kind"]},
        "then": {"required": ["radius"]},
        "else": {"required": ["width"]}
    });
    assert!(is_valid(schema.clone(), json!({"kind": "circle", "radius": 1})));
    assert!(!is_valid(schema.clone(), json!({"kind": "circle", "width": 1})));
    assert!(is_valid(schema.clone(), json!({"kind": "square", "width": 1})));
    assert!(!is_valid(schema, json!({"kind": "square"})));
}

#[test]
fn test_one_of_exactly_one() {
    let schema = json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]});
    assert!(is_valid(schema.clone(), json!(1)));
    assert!(is_valid(schema.clone(), json!(2.5)));
    assert!(!is_valid(schema.clone(), json!(3)));
    assert!(!is_valid(schema, json!(1.5)));
}

#[test]
fn test_items_contains_family() {
    let tuple = json!({"prefixItems": [{"type": "string"}], "items": {"type": "integer"}});
    assert!(is_valid(tuple.clone(), json!(["a", 1, 2])));
    assert!(!is_valid(tuple, json!(["a", "b"])));

    let contains = json!({"contains": {"type": "integer"}, "minContains": 2, "maxContains": 3});
    assert!(!is_valid(contains.clone(), json!([1, "a"])));
    assert!(is_valid(contains.clone(), json!([1, "a", 2])));
    assert!(!is_valid(contains.clone(), json!([1, 2, 3, 4])));
    assert!(is_valid(json!({"contains": false, "minContains": 0}), json!([1])));
}

#[test]
fn test_additional_and_pattern_properties() {
    let schema = json!({
        "properties": {"id": true},
        "patternProperties": {"^x-": {"type": "string"}},
        "additionalProperties": false
    });
    assert!(is_valid(schema.clone(), json!({"id": 1, "x-note": "ok"})));
    assert!(!is_valid(schema.clone(), json!({"id": 1, "x-note": 2})));
    assert!(!is_valid(schema, json!({"id": 1, "other": 0})));
}

#[test]
fn test_unevaluated_properties_sees_valid_branches_only() {
    let schema = json!({
        "anyOf": [
            {"properties": {"a": {"type": "string"}}},
            {"properties": {"b": {"type": "string"}}}
        ],
        "unevaluatedProperties": false
    });
    assert!(is_valid(schema.clone(), json!({"a": "x", "b": "y"})));
    // "b" is only covered by a failing branch.
    assert!(!is_valid(schema.clone(), json!({"a": "x", "b": 1})));
    assert!(!is_valid(schema, json!({"a": "x", "c": "z"})));
}

#[test]
fn test_unevaluated_items_through_ref() {
    let schema = json!({
        "$defs": {"head": {"prefixItems": [{"type": "string"}]}},
        "$ref": "#/$defs/head",
        "unevaluatedItems": {"type": "integer"}
    });
    assert!(is_valid(schema.clone(), json!(["a", 1, 2])));
    assert!(!is_valid(schema, json!(["a", "b"])));
}

#[test]
fn test_unevaluated_properties_with_if_then() {
    let schema = json!({
        "if": {"properties": {"kind": {"const": "a"}}},
        "then": {"properties": {"extra": true}},
        "unevaluatedProperties": false
    });
    assert!(is_valid(schema.clone(), json!({"kind": "a", "extra": 1})));
    assert!(!is_valid(schema, json!({"kind": "b", "extra": 1})));
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn test_format_asserts_only_when_requested() {
    let mut registry = SchemaRegistry::new();
    let handle = registry.register(json!({"format": "ipv4"})).unwrap();
    let annotate = options(OutputFormat::Flag);
    let assert = options(OutputFormat::Flag).with_format_assertions(true);
    assert!(registry.evaluate(&handle, &json!("999.1.1.1"), &annotate).unwrap().valid);
    assert!(!registry.evaluate(&handle, &json!("999.1.1.1"), &assert).unwrap().valid);
    assert!(registry.evaluate(&handle, &json!("10.0.0.1"), &assert).unwrap().valid);
}

#[test]
fn test_format_assertion_vocabulary_in_dialect() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(json!({
            "$id": "https://example.com/meta/format-assert",
            "$vocabulary": {
                "https://json-schema.org/draft/2020-12/vocab/core": true,
                "https://json-schema.org/draft/2020-12/vocab/format-assertion": true
            }
        }))
        .unwrap();
    let handle = registry
        .register(json!({"$schema": "https://example.com/meta/format-assert", "format": "date"}))
        .unwrap();
    let opts = options(OutputFormat::Flag);
    assert!(!registry.evaluate(&handle, &json!("2024-13-01"), &opts).unwrap().valid);
    assert!(registry.evaluate(&handle, &json!("2024-12-01"), &opts).unwrap().valid);
}

#[test]
fn test_unknown_keywords_tolerated_and_optionally_annotated() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({"x-owner": "team-a", "type": "string"}))
        .unwrap();
    let mut opts = options(OutputFormat::List);
    let plain = registry.evaluate(&handle, &json!("s"), &opts).unwrap();
    assert!(plain.annotations.is_empty());
    opts.annotate_unknown_keywords = true;
    let annotated = registry.evaluate(&handle, &json!("s"), &opts).unwrap();
    assert_eq!(annotated.annotations.get("x-owner"), Some(&json!("team-a")));
}

#[test]
fn test_preserve_dropped_annotations() {
    let mut registry = SchemaRegistry::new();
    let handle = registry
        .register(json!({"allOf": [{"title": "kept?"}, false]}))
        .unwrap();
    let mut opts = options(OutputFormat::List);
    let dropped = registry
        .validate(&handle, &json!(1), &opts)
        .unwrap()
        .to_value()
        .unwrap();
    let has_title = |output: &Value| {
        output["details"]
            .as_array()
            .unwrap()
            .iter()
            .any(|unit| unit.pointer("/annotations/title").is_some())
    };
    assert!(!has_title(&dropped));
    opts.preserve_dropped_annotations = true;
    let kept = registry
        .validate(&handle, &json!(1), &opts)
        .unwrap()
        .to_value()
        .unwrap();
    assert!(has_title(&kept));
}

#[test]
fn test_options_deserialize_from_camel_case() {
    let opts: EvaluationOptions = serde_json::from_value(json!({
        "outputFormat": "hierarchical",
        "requireFormatAssertions": true,
        "maxRecursionDepth": 64
    }))
    .unwrap();
    assert_eq!(opts.output_format, OutputFormat::Hierarchical);
    assert!(opts.require_format_assertions);
    assert_eq!(opts.max_recursion_depth, Some(64));
    assert_eq!(opts.default_base_uri, "json-schema:///");
}

// ---------------------------------------------------------------------------
// Meta-schema self-check
// ---------------------------------------------------------------------------

#[test]
fn test_check_schema_against_dialect() {
    let registry = SchemaRegistry::new();
    let good = registry
        .check_schema(&json!({"type": "object", "properties": {"a": {"minimum": 1}}}))
        .unwrap();
    assert!(good.valid);
    let bad = registry
        .check_schema(&json!({"properties": {"a": {"minimum": "one"}}}))
        .unwrap();
    assert!(!bad.valid);
    let (at, _, _) = bad.errors().next().unwrap();
    assert_eq!(at.instance_location.to_string(), "/properties/a/minimum");
}

#[test]
fn test_meta_schema_validates_itself() {
    let registry = SchemaRegistry::new();
    let meta = registry
        .resolve("https://json-schema.org/draft/2020-12/schema")
        .unwrap();
    let node = registry
        .evaluate(&meta, meta.raw(), &options(OutputFormat::Flag))
        .unwrap();
    assert!(node.valid);
}
