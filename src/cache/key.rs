//! Cache key derivation.
//!
//! A [`CacheKey`] is the SHA-256 of a canonical JSON encoding of every
//! input that affects a prediction. Field order is fixed by the struct
//! declaration and the kind list is sorted and deduplicated, so the same
//! request always hashes identically regardless of how the kinds were
//! ordered. Unlike `DefaultHasher`, the digest is stable across processes,
//! which the on-disk cache depends on.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;
use crate::types::{Variant, normalize_kinds};

/// Deterministic fingerprint of a prediction request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an arbitrary string as a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key for a variant and an unnormalised kind list.
    pub fn for_request<S: AsRef<str>>(variant: &Variant, kinds: &[S]) -> Result<Self> {
        let kinds = normalize_kinds(kinds)?;
        Ok(Self::from_normalized(variant, &kinds))
    }

    /// Derive the key when `kinds` is already sorted and deduplicated.
    pub(crate) fn from_normalized(variant: &Variant, kinds: &[String]) -> Self {
        let canonical = Canonical {
            chrom: &variant.chrom,
            pos: variant.pos,
            reference: &variant.reference,
            alternate: &variant.alternate,
            sequence: &variant.sequence,
            predictions: kinds,
        };
        // Serializing borrowed strings and integers cannot fail.
        let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
        Self(hex_digest(&encoded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[derive(Serialize)]
struct Canonical<'a> {
    chrom: &'a str,
    pos: u64,
    reference: &'a str,
    alternate: &'a str,
    sequence: &'a str,
    predictions: &'a [String],
}

/// Lowercase hex SHA-256 of `bytes`.
pub(crate) fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_hex_chars() {
        let key = CacheKey::for_request(&Variant::new("chr1", 1, "A", "C", "ACGT"), &["x"])
            .unwrap();
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        // "chr1" + "1" vs "chr" + "11" must not collide.
        let a = CacheKey::for_request(&Variant::new("chr1", 1, "A", "C", "ACGT"), &["x"]);
        let b = CacheKey::for_request(&Variant::new("chr", 11, "A", "C", "ACGT"), &["x"]);
        assert_ne!(a.unwrap(), b.unwrap());
    }
}
