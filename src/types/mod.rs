//! Public types for the Genoscore API.

mod variant;
mod wire;

pub use variant::{Predictions, Variant, normalize_kinds};
pub use wire::{PredictionRequest, PredictionResponse, VariantScores, WireVariant};
