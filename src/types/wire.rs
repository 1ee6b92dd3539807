//! JSON bodies exchanged with the prediction service.

use serde::{Deserialize, Serialize};

use super::{Predictions, Variant};

/// Body of `POST /predict`.
///
/// One variant per request; batching happens client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub sequence: String,
    pub variants: Vec<WireVariant>,
    pub predictions: Vec<String>,
}

impl PredictionRequest {
    /// Build the request for a single variant and a normalised kind list.
    pub fn single(variant: &Variant, kinds: &[String]) -> Self {
        Self {
            sequence: variant.sequence.clone(),
            variants: vec![WireVariant {
                chromosome: variant.chrom.clone(),
                position: variant.pos,
                reference: variant.reference.clone(),
                alternate: variant.alternate.clone(),
            }],
            predictions: kinds.to_vec(),
        }
    }
}

/// Variant coordinates as the service expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireVariant {
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
}

/// Successful response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub variants: Vec<VariantScores>,
}

/// Per-variant scores in a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantScores {
    #[serde(default)]
    pub predictions: Predictions,
}

impl PredictionResponse {
    /// Wrap a single score map (convenient for fake transports).
    pub fn single(predictions: Predictions) -> Self {
        Self {
            variants: vec![VariantScores { predictions }],
        }
    }

    /// Scores for the first variant, keeping only the requested kinds.
    ///
    /// Returns `None` if the response carries no variant at all.
    pub fn first_filtered(self, kinds: &[String]) -> Option<Predictions> {
        let first = self.variants.into_iter().next()?;
        Some(
            first
                .predictions
                .into_iter()
                .filter(|(kind, _)| kinds.iter().any(|k| k == kind))
                .collect(),
        )
    }
}
