//! Property tests for the algebraic laws of evaluation.
//!
//! Schemas are drawn from a small grammar of assertions and applicators so
//! that every generated schema is well-formed; instances are arbitrary
//! JSON values of bounded depth.

use jsev_schema::{EvaluationOptions, OutputFormat, SchemaRegistry};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn instance_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-20i64..20).prop_map(|n| json!(n)),
        (-20i64..20).prop_map(|n| json!(n as f64 / 2.0)),
        "[a-c]{0,4}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]", inner, 0..3)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn assertion() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        prop::sample::select(vec!["null", "boolean", "integer", "number", "string", "array", "object"])
            .prop_map(|t| json!({"type": t})),
        (-10i64..10).prop_map(|n| json!({"minimum": n})),
        (-10i64..10).prop_map(|n| json!({"exclusiveMaximum": n})),
        (0u64..4).prop_map(|n| json!({"maxLength": n})),
        (0u64..3).prop_map(|n| json!({"minItems": n})),
        "[a-c]".prop_map(|k| json!({"required": [k]})),
        (1i64..4).prop_map(|n| json!({"multipleOf": n})),
        Just(json!({"uniqueItems": true})),
        Just(json!({"const": "a"})),
    ]
}

fn schema() -> impl Strategy<Value = Value> {
    assertion().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(|s| json!({"allOf": s})),
            prop::collection::vec(inner.clone(), 1..3).prop_map(|s| json!({"anyOf": s})),
            prop::collection::vec(inner.clone(), 1..3).prop_map(|s| json!({"oneOf": s})),
            inner.clone().prop_map(|s| json!({"not": s})),
            ("[a-c]", inner.clone()).prop_map(|(k, s)| json!({"properties": {k: s}})),
            inner.clone().prop_map(|s| json!({"items": s})),
            (inner.clone(), inner).prop_map(|(c, t)| json!({"if": c, "then": t})),
        ]
    })
}

fn verdict(schema: &Value, instance: &Value, format: OutputFormat) -> bool {
    let mut registry = SchemaRegistry::new();
    let handle = registry.register(schema.clone()).unwrap();
    let options = EvaluationOptions::default().with_output_format(format);
    registry.validate(&handle, instance, &options).unwrap().valid()
}

proptest! {
    /// The verdict does not depend on the output format.
    #[test]
    fn verdict_invariant_under_output_format(s in schema(), i in instance_value()) {
        let flag = verdict(&s, &i, OutputFormat::Flag);
        prop_assert_eq!(flag, verdict(&s, &i, OutputFormat::List));
        prop_assert_eq!(flag, verdict(&s, &i, OutputFormat::Hierarchical));
    }

    /// `not not S` agrees with `S`.
    #[test]
    fn double_negation(s in schema(), i in instance_value()) {
        let wrapped = json!({"not": {"not": s.clone()}});
        prop_assert_eq!(
            verdict(&s, &i, OutputFormat::Flag),
            verdict(&wrapped, &i, OutputFormat::Flag)
        );
    }

    /// `allOf(A, B)` holds exactly when both `A` and `B` hold.
    #[test]
    fn all_of_is_conjunction(a in schema(), b in schema(), i in instance_value()) {
        let both = json!({"allOf": [a.clone(), b.clone()]});
        prop_assert_eq!(
            verdict(&both, &i, OutputFormat::List),
            verdict(&a, &i, OutputFormat::List) && verdict(&b, &i, OutputFormat::List)
        );
    }

    /// A `$ref` to a definition behaves like the definition inlined.
    #[test]
    fn ref_equivalent_to_inlining(s in schema(), i in instance_value()) {
        let referenced = json!({
            "$defs": {"target": s.clone()},
            "properties": {"a": {"$ref": "#/$defs/target"}},
            "items": {"$ref": "#/$defs/target"}
        });
        let inlined = json!({
            "properties": {"a": s.clone()},
            "items": s
        });
        prop_assert_eq!(
            verdict(&referenced, &i, OutputFormat::Flag),
            verdict(&inlined, &i, OutputFormat::Flag)
        );
    }
}
