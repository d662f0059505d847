//! # jsev-core — Foundational Types
//!
//! The leaf crate of the jsev workspace. It defines the types every other
//! crate agrees on and depends on nothing internal.
//!
//! ## Contents
//!
//! 1. **Error taxonomy** ([`error`]). One type per setup failure
//!    (`MalformedSchemaError`, `UnsupportedVocabularyError`,
//!    `DuplicateIdError`, `RefResolutionError`,
//!    `EvaluationDepthExceededError`), the umbrella [`SchemaError`], and
//!    [`EvaluationError`], the subset that can abort an evaluation.
//!
//! 2. **`JsonPointer`** ([`pointer`]). Schema locations, evaluation paths
//!    and instance locations, with URI-fragment encoding.
//!
//! 3. **`CanonicalBytes` / `ContentDigest`** ([`canonical`], [`digest`]).
//!    JCS canonicalization and SHA-256 fingerprints of schema documents.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jsev-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod pointer;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{
    CanonicalizationError, DuplicateIdError, EvaluationDepthExceededError, EvaluationError,
    MalformedSchemaError, PointerError, RefResolutionError, SchemaError,
    UnsupportedVocabularyError,
};
pub use pointer::JsonPointer;
