//! SOIL COMPATIBILITY
//!
//! Token-overlap compatibility between the query's soil classifications and a
//! crop's listed soil types, computed independently for the local (Indian)
//! and international (FAO/WRB) taxonomies.
//!
//! Both sides are case-folded and passed through the same synonym map before
//! comparison, so "Regur" in a query matches "Black" in the catalog.

use crate::config::ScoringWeights;
use crate::data::CropRecord;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Soil label synonyms: raw (lowercase) -> canonical
pub const SOIL_SYNONYMS: &[(&str, &str)] = &[
    ("regur", "black/regur"),
    ("black", "black/regur"),
    ("clay", "clay"),
    ("alluvial", "alluvial"),
];

/// Case-fold a soil label and map it to its canonical form
pub fn normalize_soil_label(label: &str) -> String {
    let folded = label.trim().to_lowercase();
    SOIL_SYNONYMS
        .iter()
        .find(|(raw, _)| *raw == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(folded)
}

/// Normalized query soil labels for one taxonomy, built once per query
#[derive(Debug, Clone, Default)]
pub struct SoilLabelSet {
    labels: FxHashSet<String>,
}

impl SoilLabelSet {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let labels = labels
            .iter()
            .map(|label| normalize_soil_label(label.as_ref()))
            .filter(|label| !label.is_empty())
            .collect();
        Self { labels }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fraction of a crop's listed soil types present in the query's label set
///
/// Returns 0 when the crop lists no soil types for this taxonomy.
pub fn soil_type_match(query: &SoilLabelSet, crop_soils: Option<&str>) -> f64 {
    let Some(crop_soils) = crop_soils else {
        return 0.0;
    };

    let crop_labels: SmallVec<[String; 8]> = crop_soils
        .split(',')
        .map(normalize_soil_label)
        .filter(|label| !label.is_empty())
        .collect();

    if crop_labels.is_empty() {
        return 0.0;
    }

    let matched = crop_labels.iter().filter(|label| query.contains(label)).count();
    matched as f64 / crop_labels.len() as f64
}

/// Result of soil scoring for one crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilResult {
    /// Local taxonomy match fraction (0-1)
    pub local_match: f64,
    /// International taxonomy match fraction (0-1)
    pub international_match: f64,
    /// Weighted sum, in [0, weights.max_soil_subscore()]
    pub subscore: f64,
}

/// Calculate the combined soil subscore for one crop
pub fn calculate_soil_subscore(
    local: &SoilLabelSet,
    international: &SoilLabelSet,
    crop: &CropRecord,
    weights: &ScoringWeights,
) -> SoilResult {
    let local_match = soil_type_match(local, crop.local_soil.as_deref());
    let international_match = soil_type_match(international, crop.international_soil.as_deref());

    SoilResult {
        local_match,
        international_match,
        subscore: weights.local_soil * local_match
            + weights.international_soil * international_match,
    }
}
