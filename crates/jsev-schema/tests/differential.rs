//! Differential test: verdicts must agree with the `jsonschema` crate on a
//! curated corpus covering every applicator and assertion family.

use jsev_schema::{EvaluationOptions, OutputFormat, SchemaRegistry};
use serde_json::{json, Value};

/// `(schema, instances)` pairs. Formats are left out: both engines treat
/// them as annotations under the default dialect.
fn corpus() -> Vec<(Value, Vec<Value>)> {
    vec![
        (
            json!({"type": ["integer", "null"], "minimum": 0, "maximum": 100}),
            vec![json!(0), json!(100), json!(101), json!(-1), json!(null), json!(5.5), json!(5.0)],
        ),
        (
            json!({"type": "string", "minLength": 2, "maxLength": 3, "pattern": "^[a-z]+$"}),
            vec![json!("ab"), json!("abcd"), json!("a"), json!("AB"), json!("日本"), json!(1)],
        ),
        (
            json!({"multipleOf": 0.5, "exclusiveMinimum": 0, "exclusiveMaximum": 2}),
            vec![json!(0), json!(0.5), json!(1.5), json!(2), json!(0.75), json!("1")],
        ),
        (
            json!({"enum": [1, "a", [1, 2], {"k": null}], "const": 1}),
            vec![json!(1), json!(1.0), json!("a"), json!([1, 2])],
        ),
        (
            json!({"uniqueItems": true, "minItems": 1, "maxItems": 3}),
            vec![json!([]), json!([1]), json!([1, 1.0]), json!([{"a": 1}, {"a": 2}]), json!([1, 2, 3, 4])],
        ),
        (
            json!({
                "type": "object",
                "required": ["id"],
                "properties": {"id": {"type": "integer"}, "tags": {"type": "array", "items": {"type": "string"}}},
                "patternProperties": {"^x-": true},
                "additionalProperties": false,
                "dependentRequired": {"tags": ["id"]},
                "minProperties": 1,
                "maxProperties": 3
            }),
            vec![
                json!({"id": 1}),
                json!({"id": 1, "tags": ["a"]}),
                json!({"id": 1, "tags": [1]}),
                json!({"id": 1, "x-a": 0}),
                json!({"id": 1, "other": 0}),
                json!({"tags": []}),
                json!({"id": 1, "x-a": 0, "x-b": 0, "x-c": 0}),
            ],
        ),
        (
            json!({"propertyNames": {"maxLength": 2}, "dependentSchemas": {"a": {"required": ["b"]}}}),
            vec![json!({"ab": 1}), json!({"abc": 1}), json!({"a": 1}), json!({"a": 1, "b": 2})],
        ),
        (
            json!({"anyOf": [{"type": "string"}, {"minimum": 3}], "not": {"const": 4}}),
            vec![json!("s"), json!(3), json!(4), json!(2), json!(null)],
        ),
        (
            json!({"oneOf": [{"multipleOf": 2}, {"multipleOf": 3}]}),
            vec![json!(2), json!(3), json!(6), json!(5)],
        ),
        (
            json!({"if": {"minimum": 10}, "then": {"multipleOf": 5}, "else": {"maximum": 3}}),
            vec![json!(15), json!(12), json!(2), json!(5), json!("x")],
        ),
        (
            json!({"prefixItems": [{"type": "string"}, {"type": "integer"}], "items": false}),
            vec![json!([]), json!(["a"]), json!(["a", 1]), json!(["a", 1, 2]), json!([1])],
        ),
        (
            json!({"contains": {"type": "string"}, "minContains": 2, "maxContains": 2}),
            vec![json!(["a", "b"]), json!(["a"]), json!(["a", "b", "c"]), json!([1, "a", "b"]), json!({})],
        ),
        (
            json!({
                "allOf": [{"properties": {"a": true}}],
                "anyOf": [{"properties": {"b": true}, "required": ["b"]}, {"properties": {"c": true}, "required": ["c"]}],
                "unevaluatedProperties": false
            }),
            vec![json!({"a": 1, "b": 2}), json!({"a": 1, "c": 2}), json!({"a": 1, "b": 2, "d": 3}), json!({"a": 1})],
        ),
        (
            json!({
                "prefixItems": [true],
                "anyOf": [{"contains": {"const": "x"}}, true],
                "unevaluatedItems": {"type": "integer"}
            }),
            vec![json!([1, 2]), json!([1, "x"]), json!([1, "y"]), json!(["x", "x", 3])],
        ),
        (
            json!({
                "$id": "https://example.com/node",
                "type": "object",
                "properties": {"next": {"$ref": "#"}, "v": {"$ref": "#/$defs/v"}},
                "$defs": {"v": {"$anchor": "value", "type": "integer"}}
            }),
            vec![json!({"v": 1, "next": {"v": 2}}), json!({"v": 1, "next": {"v": "x"}}), json!({"next": 1})],
        ),
    ]
}

#[test]
fn test_verdicts_match_reference_implementation() {
    let options = EvaluationOptions::default().with_output_format(OutputFormat::Flag);
    for (schema, instances) in corpus() {
        let reference = jsonschema::draft202012::new(&schema)
            .unwrap_or_else(|e| panic!("reference rejected {schema}: {e}"));
        let mut registry = SchemaRegistry::new();
        let handle = registry.register(schema.clone()).unwrap();
        for instance in instances {
            let ours = registry.evaluate(&handle, &instance, &options).unwrap().valid;
            assert_eq!(
                ours,
                reference.is_valid(&instance),
                "schema {schema} instance {instance}"
            );
        }
    }
}
