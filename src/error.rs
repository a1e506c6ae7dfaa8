//! Ranking errors
//!
//! Only failures that stop a ranking call live here. Malformed descriptor
//! fields are not errors; they surface as `ParseWarning`s on the result.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    /// Catalog failed to load; every ranking call short-circuits
    #[error("Crop data or scaler not initialized: {0}")]
    NotInitialized(String),

    #[error("Invalid input: climate descriptor must be a JSON object")]
    InvalidDescriptor,

    /// Every climate field defaulted and no soil label was supplied
    #[error("Failed to parse climate data: descriptor has no usable climate or soil fields")]
    NoUsableSignal,
}
