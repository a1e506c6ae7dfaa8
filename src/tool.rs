//! Tool Interface
//!
//! JSON-in/JSON-out adapter for the orchestrating agent. Success is
//! `{"recommended_crops": [{"Crop": .., "similarity": ..}, ..]}`, failure is
//! `{"error": ..}`. Degraded queries additionally carry `"parse_warnings"`.

use crate::assessment::assess_crop;
use crate::scorer::{CropScorer, Ranking};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Recommend the best crops for a climate descriptor
pub fn recommend_crops(scorer: &CropScorer, climate_json: &Value, top_k: Option<usize>) -> Value {
    recommend_and_assess(scorer, climate_json, top_k, None)
}

/// Recommend crops and, when `assess` names a crop, add its
/// `"cropSuitability"` from the same ranking
pub fn recommend_and_assess(
    scorer: &CropScorer,
    climate_json: &Value,
    top_k: Option<usize>,
    assess: Option<&str>,
) -> Value {
    debug!("Received climate_json: {}", climate_json);

    match scorer.rank_json(climate_json, top_k) {
        Ok(ranking) => {
            let mut out = ranking_to_json(&ranking);
            if let Some(crop) = assess {
                out["cropSuitability"] = json!(assess_crop(&ranking, crop));
            }
            out
        }
        Err(e) => {
            warn!("Crop recommendation failed: {}", e);
            json!({ "error": e.to_string() })
        }
    }
}

/// Serialize a ranking into the tool's success shape
pub fn ranking_to_json(ranking: &Ranking) -> Value {
    let mut out = json!({ "recommended_crops": ranking.score_records() });

    if ranking.is_degraded() {
        out["parse_warnings"] = json!(ranking
            .warnings
            .iter()
            .map(|w| json!({ "field": w.field, "issue": w.issue, "message": w.to_string() }))
            .collect::<Vec<_>>());
    }

    out
}
