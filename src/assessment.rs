//! Crop Suitability Assessment
//!
//! Answers "is this crop a good choice here?" from an existing ranking: the
//! crop's position and score among the recommendations, plus the leading
//! alternatives when the crop scores poorly.

use crate::data::crop_key;
use crate::scorer::Ranking;
use serde::{Serialize, Serializer};

/// Scores at or below this suggest alternatives
pub const ALTERNATIVES_THRESHOLD: f64 = 0.5;
pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSuitability {
    pub crop_name: String,
    /// 0 when the crop is not among the recommendations
    pub score: f64,
    /// 1-based; serialized as "N/A" when absent
    #[serde(serialize_with = "serialize_rank")]
    pub rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
}

impl CropSuitability {
    pub fn is_recommended(&self) -> bool {
        self.rank.is_some()
    }
}

fn serialize_rank<S: Serializer>(rank: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
    match rank {
        Some(r) => serializer.serialize_u64(*r as u64),
        None => serializer.serialize_str("N/A"),
    }
}

/// Assess a named crop against a ranking (case-insensitive name match)
pub fn assess_crop(ranking: &Ranking, crop_name: &str) -> CropSuitability {
    let wanted = crop_name.trim();
    let key = crop_key(wanted);
    let found = ranking
        .crops
        .iter()
        .enumerate()
        .find(|(_, c)| crop_key(&c.crop) == key);

    let (rank, score) = match found {
        Some((idx, c)) => (Some(idx + 1), c.score),
        None => (None, 0.0),
    };

    let alternatives = (score <= ALTERNATIVES_THRESHOLD).then(|| {
        ranking
            .crops
            .iter()
            .filter(|c| crop_key(&c.crop) != key)
            .take(MAX_ALTERNATIVES)
            .map(|c| c.crop.clone())
            .collect()
    });

    CropSuitability {
        crop_name: wanted.to_string(),
        score,
        rank,
        alternatives,
    }
}
