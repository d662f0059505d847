//! # Meta-Schema Catalog
//!
//! The draft 2020-12 dialect meta-schema and its eight vocabulary
//! meta-schemas, embedded at compile time. Every
//! [`SchemaRegistry`](crate::registry::SchemaRegistry) registers them on
//! construction, so `$schema` and `$vocabulary` processing never needs a
//! fetch.

/// The draft 2020-12 dialect meta-schema URI.
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// `(uri, document)` pairs, dialect meta-schema first.
pub const CATALOG: [(&str, &str); 9] = [
    (DRAFT_2020_12, include_str!("../metaschemas/schema.json")),
    (
        "https://json-schema.org/draft/2020-12/meta/core",
        include_str!("../metaschemas/meta/core.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/applicator",
        include_str!("../metaschemas/meta/applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/unevaluated",
        include_str!("../metaschemas/meta/unevaluated.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/validation",
        include_str!("../metaschemas/meta/validation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/meta-data",
        include_str!("../metaschemas/meta/meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-annotation",
        include_str!("../metaschemas/meta/format-annotation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-assertion",
        include_str!("../metaschemas/meta/format-assertion.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/content",
        include_str!("../metaschemas/meta/content.json"),
    ),
];
