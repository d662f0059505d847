//! # Content Digest — Document Fingerprints
//!
//! Defines `ContentDigest`. Registered schema
//! documents carry a digest of their canonical bytes so that registering
//! the same content twice is recognised without a structural comparison.
//!
//! ## Invariant
//!
//! `ContentDigest` can only be computed from `CanonicalBytes`, so every
//! fingerprint in the system is independent of key order and whitespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;

/// A SHA-256 digest of a document's canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Wrap a raw SHA-256 digest.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Fingerprint a JSON value: canonicalize, then hash.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures.
    pub fn of_value(value: &Value) -> Result<Self, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(value)?))
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}
