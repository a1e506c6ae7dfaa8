//! Metric modules for crop ranking
//!
//! Each scoring criterion is implemented in its own module:
//! - Climate similarity: cosine similarity over scaled climate features
//! - Soil compatibility: synonym-aware soil label overlap per taxonomy

pub mod climate_similarity;
pub mod soil_compatibility;

// Re-export metric functions
pub use climate_similarity::cosine_similarity;
pub use soil_compatibility::{
    calculate_soil_subscore, normalize_soil_label, soil_type_match, SoilLabelSet, SoilResult,
    SOIL_SYNONYMS,
};
