//! Crop Ranker
//!
//! Crop-suitability ranking engine: scores a fixed catalog of crops against a
//! location's climate/soil descriptor and returns the top-K crops.
//!
//! Module layout:
//! - `utils/`: Range parsing and the min-max scaling transform
//! - `data`: Catalog loading with Polars
//! - `query`: Descriptor parsing and vectorization
//! - `metrics/`: Climate similarity and soil compatibility
//! - `scorer`: Blending, sorting, top-K (sequential and Rayon)
//! - `assessment`: Rank/score lookup for a named crop
//! - `tool`: JSON adapter for the orchestrating agent

pub mod utils;
pub mod config;
pub mod error;
pub mod data;
pub mod query;
pub mod metrics;
pub mod scorer;
pub mod assessment;
pub mod tool;

// Re-export commonly used types
pub use utils::{parse_range, parse_range_value, ScalingTransform};
pub use config::{EngineConfig, ScoringWeights};
pub use error::RankError;
pub use data::{Catalog, CropRecord};
pub use query::{ParseWarning, QueryDescriptor, QueryVector, SoilMoisture};
pub use metrics::*;
pub use scorer::{CropScore, CropScorer, Ranking, ScoreRecord};
pub use assessment::{assess_crop, CropSuitability};
pub use tool::{recommend_and_assess, recommend_crops};
