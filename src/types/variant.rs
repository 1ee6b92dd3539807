//! Variant descriptions and prediction results.
//!
//! A [`Variant`] is what the sequence-extraction stage hands over: a
//! position on a chromosome, the reference and alternate alleles, and the
//! sequence window around the site. It carries no identity beyond its
//! fields and is consumed by a single prediction call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GenoscoreError, Result};

/// Scores keyed by prediction kind (e.g. `"expression"`, `"splicing"`).
///
/// Scores are expected in `[0, 1]`; the service is authoritative and values
/// are passed through unchanged.
pub type Predictions = BTreeMap<String, f64>;

/// A single variant with its sequence context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Chromosome name as used by the reference (e.g. `"chr1"`).
    pub chrom: String,
    /// 1-based position of the first reference base.
    pub pos: u64,
    /// Reference allele.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Alternate allele.
    #[serde(rename = "alt")]
    pub alternate: String,
    /// DNA window centred on the variant.
    pub sequence: String,
}

impl Variant {
    /// Create a new variant.
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            reference: reference.into(),
            alternate: alternate.into(),
            sequence: sequence.into(),
        }
    }

    /// Check that every field required by the service is present.
    pub fn validate(&self) -> Result<()> {
        if self.chrom.trim().is_empty() {
            return Err(GenoscoreError::Validation("chromosome is empty".into()));
        }
        if self.pos == 0 {
            return Err(GenoscoreError::Validation(
                "position must be 1-based (got 0)".into(),
            ));
        }
        if self.reference.is_empty() {
            return Err(GenoscoreError::Validation("reference allele is empty".into()));
        }
        if self.alternate.is_empty() {
            return Err(GenoscoreError::Validation("alternate allele is empty".into()));
        }
        if self.sequence.is_empty() {
            return Err(GenoscoreError::Validation("sequence context is empty".into()));
        }
        Ok(())
    }

    /// Short `chrom:pos ref>alt` label for log lines.
    pub fn label(&self) -> String {
        format!(
            "{}:{} {}>{}",
            self.chrom, self.pos, self.reference, self.alternate
        )
    }
}

/// Normalise a list of requested prediction kinds: sorted, deduplicated.
///
/// Returns a validation error if the list is empty or contains a blank kind.
pub fn normalize_kinds<S: AsRef<str>>(kinds: &[S]) -> Result<Vec<String>> {
    if kinds.is_empty() {
        return Err(GenoscoreError::Validation(
            "at least one prediction kind is required".into(),
        ));
    }
    let mut normalized = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let kind = kind.as_ref().trim();
        if kind.is_empty() {
            return Err(GenoscoreError::Validation("prediction kind is empty".into()));
        }
        normalized.push(kind.to_string());
    }
    normalized.sort();
    normalized.dedup();
    Ok(normalized)
}
