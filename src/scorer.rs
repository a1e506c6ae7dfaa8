//! Crop Scorer - Main coordinator for ranking crops against a location
//!
//! Integrates climate similarity and soil compatibility into one blended
//! score per crop and returns the top-K crops. Includes both sequential and
//! parallel (Rayon) implementations.
//!
//! The catalog is shared read-only behind an `Arc`. Every call scores into
//! its own private buffer, so concurrent queries never observe each other.

use crate::config::{EngineConfig, ScoringWeights, DEFAULT_TOP_K};
use crate::data::{Catalog, CropRecord};
use crate::error::RankError;
use crate::metrics::{calculate_soil_subscore, cosine_similarity, SoilLabelSet, SoilResult};
use crate::query::{ParseWarning, QueryDescriptor, QueryVector};
use crate::utils::FeatureRow;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Catalog availability
#[derive(Debug, Clone)]
enum CatalogState {
    Ready(Arc<Catalog>),
    /// Load failed; holds the reason reported on every ranking call
    Uninitialized(String),
}

/// Main crop scorer
#[derive(Debug, Clone)]
pub struct CropScorer {
    state: CatalogState,
    weights: ScoringWeights,
    default_top_k: usize,
}

/// Ranked output entry, serialized as `{"Crop": .., "similarity": ..}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    #[serde(rename = "Crop")]
    pub crop: String,
    pub similarity: f64,
}

/// Per-crop score with its components
#[derive(Debug, Clone, PartialEq)]
pub struct CropScore {
    /// Position in the catalog (tie-break order)
    pub catalog_index: usize,
    pub crop: String,
    pub climate_similarity: f64,
    pub soil: SoilResult,
    /// `climate * climate_similarity + soil * soil.subscore`
    pub score: f64,
}

/// Result of one ranking call
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Descending by score, ties in catalog order, at most K entries
    pub crops: Vec<CropScore>,
    pub query: QueryVector,
    /// Descriptor fields that fell back to defaults
    pub warnings: Vec<ParseWarning>,
}

impl Ranking {
    pub fn score_records(&self) -> Vec<ScoreRecord> {
        self.crops
            .iter()
            .map(|c| ScoreRecord {
                crop: c.crop.clone(),
                similarity: c.score,
            })
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Per-query state shared by every crop evaluation
struct PreparedQuery {
    vector: QueryVector,
    local: SoilLabelSet,
    international: SoilLabelSet,
    warnings: Vec<ParseWarning>,
}

impl CropScorer {
    /// Scorer over an already-built catalog
    ///
    /// Weights are taken as given; run [`ScoringWeights::validate`] on
    /// untrusted values first. [`CropScorer::from_config`] does this itself.
    pub fn new(catalog: Catalog, weights: ScoringWeights) -> Self {
        Self::with_shared(Arc::new(catalog), weights)
    }

    /// Scorer over a catalog shared with other scorers
    pub fn with_shared(catalog: Arc<Catalog>, weights: ScoringWeights) -> Self {
        Self {
            state: CatalogState::Ready(catalog),
            weights,
            default_top_k: DEFAULT_TOP_K,
        }
    }

    /// Scorer that rejects every ranking call
    pub fn uninitialized(reason: impl Into<String>) -> Self {
        Self {
            state: CatalogState::Uninitialized(reason.into()),
            weights: ScoringWeights::default(),
            default_top_k: DEFAULT_TOP_K,
        }
    }

    /// Initialize from configuration
    ///
    /// Invalid weights or a catalog that fails to load do not abort startup:
    /// the scorer comes up uninitialized and reports the failure on every
    /// ranking call.
    pub fn from_config(config: &EngineConfig) -> Self {
        info!("Initializing Crop Scorer...");
        info!("  Catalog: {:?}", config.data_path);
        info!("  Weights: {:?}", config.weights);

        if let Err(e) = config.weights.validate() {
            error!("Invalid scoring weights: {:#}", e);
            return Self::uninitialized(format!("{:#}", e)).with_default_top_k(config.default_top_k);
        }

        let scorer = match Catalog::load(&config.data_path) {
            Ok(catalog) => Self::new(catalog, config.weights),
            Err(e) => {
                error!("Error loading crop data: {:#}", e);
                let mut scorer = Self::uninitialized(format!("{:#}", e));
                scorer.weights = config.weights;
                scorer
            }
        };

        scorer.with_default_top_k(config.default_top_k)
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, CatalogState::Ready(_))
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Access the catalog, failing fast if it never loaded
    pub fn catalog(&self) -> Result<&Catalog, RankError> {
        match &self.state {
            CatalogState::Ready(catalog) => Ok(catalog.as_ref()),
            CatalogState::Uninitialized(reason) => Err(RankError::NotInitialized(reason.clone())),
        }
    }

    fn prepare(&self, catalog: &Catalog, descriptor: &QueryDescriptor) -> PreparedQuery {
        PreparedQuery {
            vector: descriptor.vectorize(catalog.transform()),
            local: SoilLabelSet::new(&descriptor.local_soil),
            international: SoilLabelSet::new(&descriptor.international_soil),
            warnings: descriptor.effective_warnings(),
        }
    }

    /// Score one crop against a prepared query
    fn score_crop(
        &self,
        query: &PreparedQuery,
        catalog_index: usize,
        crop: &CropRecord,
        scaled: &FeatureRow,
    ) -> CropScore {
        let climate_similarity = cosine_similarity(&query.vector.features, scaled);
        let soil = calculate_soil_subscore(&query.local, &query.international, crop, &self.weights);

        CropScore {
            catalog_index,
            crop: crop.name.clone(),
            climate_similarity,
            soil,
            score: self.weights.climate * climate_similarity + self.weights.soil * soil.subscore,
        }
    }

    /// Score every crop sequentially, in catalog order
    fn score_catalog(&self, catalog: &Catalog, query: &PreparedQuery) -> Vec<CropScore> {
        catalog
            .records()
            .iter()
            .zip(catalog.scaled_features())
            .enumerate()
            .map(|(idx, (crop, scaled))| self.score_crop(query, idx, crop, scaled))
            .collect()
    }

    /// Sort descending (stable, so ties keep catalog order) and keep top K
    fn finish(&self, mut scores: Vec<CropScore>, query: PreparedQuery, top_k: Option<usize>) -> Ranking {
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores.truncate(top_k.unwrap_or(self.default_top_k));

        debug!(
            "Ranked {} crops, top: {:?}, warnings: {}",
            scores.len(),
            scores.first().map(|s| (&s.crop, s.score)),
            query.warnings.len()
        );

        Ranking {
            crops: scores,
            query: query.vector,
            warnings: query.warnings,
        }
    }

    /// Score every crop in catalog order, without sorting or truncation
    pub fn score_all(&self, descriptor: &QueryDescriptor) -> Result<Vec<CropScore>, RankError> {
        let catalog = self.catalog()?;
        let query = self.prepare(catalog, descriptor);

        Ok(self.score_catalog(catalog, &query))
    }

    /// Rank the catalog for one descriptor
    ///
    /// `top_k` defaults to the scorer's configured value (5 unless overridden).
    /// A K larger than the catalog returns the whole catalog.
    pub fn rank(&self, descriptor: &QueryDescriptor, top_k: Option<usize>) -> Result<Ranking, RankError> {
        let catalog = self.catalog()?;
        let query = self.prepare(catalog, descriptor);

        let scores = self.score_catalog(catalog, &query);

        Ok(self.finish(scores, query, top_k))
    }

    /// Rank the catalog for one descriptor IN PARALLEL
    ///
    /// Crops are scored across Rayon's pool; collection preserves catalog
    /// order, so results are identical to [`CropScorer::rank`].
    pub fn rank_parallel(
        &self,
        descriptor: &QueryDescriptor,
        top_k: Option<usize>,
    ) -> Result<Ranking, RankError> {
        let catalog = self.catalog()?;
        let query = self.prepare(catalog, descriptor);

        let scores = catalog
            .records()
            .par_iter()
            .zip(catalog.scaled_features().par_iter())
            .enumerate()
            .map(|(idx, (crop, scaled))| self.score_crop(&query, idx, crop, scaled))
            .collect();

        Ok(self.finish(scores, query, top_k))
    }

    /// Rank many descriptors concurrently, one result per descriptor in input order
    pub fn rank_batch(
        &self,
        descriptors: &[QueryDescriptor],
        top_k: Option<usize>,
    ) -> Vec<Result<Ranking, RankError>> {
        descriptors
            .par_iter()
            .map(|descriptor| self.rank(descriptor, top_k))
            .collect()
    }

    /// Rank a loosely structured JSON descriptor
    ///
    /// Fails for an uninitialized catalog, a non-object descriptor, or a
    /// descriptor that leaves no usable signal. Individually malformed
    /// fields only add parse warnings.
    pub fn rank_json(&self, climate_json: &Value, top_k: Option<usize>) -> Result<Ranking, RankError> {
        self.catalog()?;

        if !climate_json.is_object() {
            return Err(RankError::InvalidDescriptor);
        }

        let descriptor = QueryDescriptor::from_json(climate_json);
        if !descriptor.has_usable_signal() {
            return Err(RankError::NoUsableSignal);
        }

        self.rank(&descriptor, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SoilMoisture;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn crop(name: &str, t: (f64, f64), rain: f64, rh: f64, local: Option<&str>) -> CropRecord {
        CropRecord {
            name: name.to_string(),
            temperature_min: t.0,
            temperature_max: t.1,
            precipitation: rain,
            humidity: rh,
            local_soil: local.map(str::to_string),
            international_soil: None,
        }
    }

    fn rice_millet() -> CropScorer {
        let catalog = Catalog::from_records(vec![
            crop("Rice", (20.0, 35.0), 150.0, 80.0, Some("Clay,Alluvial")),
            crop("Millet", (25.0, 40.0), 50.0, 40.0, Some("Black/Regur")),
        ])
        .unwrap();
        CropScorer::new(catalog, ScoringWeights::default())
    }

    fn six_crops() -> CropScorer {
        let catalog = Catalog::from_records(vec![
            crop("Rice", (20.0, 35.0), 150.0, 80.0, Some("Clay,Alluvial")),
            crop("Millet", (25.0, 40.0), 50.0, 40.0, Some("Black/Regur")),
            crop("Wheat", (10.0, 25.0), 75.0, 55.0, Some("Alluvial,Loamy")),
            crop("Cotton", (21.0, 30.0), 80.0, 60.0, Some("Black")),
            crop("Tea", (13.0, 28.0), 200.0, 85.0, Some("Laterite")),
            crop("Maize", (18.0, 27.0), 65.0, 60.0, Some("Alluvial")),
        ])
        .unwrap();
        CropScorer::new(catalog, ScoringWeights::default())
    }

    fn rice_query() -> QueryDescriptor {
        QueryDescriptor::new((22.0, 34.0), 140.0, 78.0)
            .with_soil_moisture(SoilMoisture::High)
            .with_local_soil(["Clay"])
    }

    #[test]
    fn test_rice_ranks_above_millet() {
        let ranking = rice_millet().rank(&rice_query(), None).unwrap();
        assert_eq!(ranking.crops.len(), 2);
        assert_eq!(ranking.crops[0].crop, "Rice");
        assert_eq!(ranking.crops[1].crop, "Millet");

        // Clay matches one of Rice's two local soils; Millet has no match
        assert_relative_eq!(ranking.crops[0].soil.local_match, 0.5);
        assert_relative_eq!(ranking.crops[0].soil.subscore, 0.125);
        assert_eq!(ranking.crops[1].soil.subscore, 0.0);
        assert!(ranking.crops[0].score > ranking.crops[1].score);
    }

    #[test]
    fn test_final_score_blend() {
        let ranking = rice_millet().rank(&rice_query(), None).unwrap();
        for c in &ranking.crops {
            assert_relative_eq!(
                c.score,
                0.7 * c.climate_similarity + 0.3 * c.soil.subscore,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_top_k_lengths() {
        let scorer = six_crops();
        let query = rice_query();
        assert_eq!(scorer.rank(&query, None).unwrap().crops.len(), 5);
        assert_eq!(scorer.rank(&query, Some(5)).unwrap().crops.len(), 5);
        assert_eq!(scorer.rank(&query, Some(2)).unwrap().crops.len(), 2);
        assert_eq!(scorer.rank(&query, Some(50)).unwrap().crops.len(), 6);
        assert!(scorer.rank(&query, Some(0)).unwrap().crops.is_empty());
    }

    #[test]
    fn test_sorted_descending() {
        let ranking = six_crops().rank(&rice_query(), Some(10)).unwrap();
        for pair in ranking.crops.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        // Identical conditions, no soil: every crop ties
        let catalog = Catalog::from_records(vec![
            crop("Zeta", (20.0, 30.0), 100.0, 60.0, None),
            crop("Alpha", (20.0, 30.0), 100.0, 60.0, None),
            crop("Mid", (20.0, 30.0), 100.0, 60.0, None),
        ])
        .unwrap();
        let scorer = CropScorer::new(catalog, ScoringWeights::default());
        let ranking = scorer
            .rank(&QueryDescriptor::new((20.0, 30.0), 100.0, 60.0), None)
            .unwrap();

        let names: Vec<&str> = ranking.crops.iter().map(|c| c.crop.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        let indices: Vec<usize> = ranking.crops.iter().map(|c| c.catalog_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_degenerate_single_crop_catalog() {
        let catalog =
            Catalog::from_records(vec![crop("Rice", (20.0, 35.0), 150.0, 80.0, Some("Clay"))]).unwrap();
        let scorer = CropScorer::new(catalog, ScoringWeights::default());

        for query in [
            QueryDescriptor::new((0.0, 0.0), 0.0, 0.0),
            QueryDescriptor::new((30.0, 45.0), 10.0, 5.0).with_local_soil(["clay"]),
        ] {
            let ranking = scorer.rank(&query, None).unwrap();
            assert_eq!(ranking.crops.len(), 1);
            // Every column is degenerate: both vectors are zero, similarity 0
            assert_eq!(ranking.crops[0].climate_similarity, 0.0);
            assert!(ranking.crops[0].score.is_finite());
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let scorer = six_crops();
        let query = rice_query();
        assert_eq!(
            scorer.rank(&query, Some(6)).unwrap(),
            scorer.rank_parallel(&query, Some(6)).unwrap()
        );
    }

    #[test]
    fn test_rank_batch_preserves_order() {
        let scorer = six_crops();
        let queries = vec![
            rice_query(),
            QueryDescriptor::new((10.0, 25.0), 75.0, 55.0),
        ];
        let results = scorer.rank_batch(&queries, Some(1));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().crops[0].crop, "Rice");
        assert_eq!(results[1].as_ref().unwrap().crops[0].crop, "Wheat");
    }

    #[test]
    fn test_uninitialized_short_circuits() {
        let scorer = CropScorer::uninitialized("missing file");
        assert!(!scorer.is_initialized());
        let err = scorer.rank(&rice_query(), None).unwrap_err();
        assert_eq!(err, RankError::NotInitialized("missing file".to_string()));
        assert!(err.to_string().contains("not initialized"));

        // Initialization failure wins over descriptor problems
        let err = scorer.rank_json(&json!("garbage"), None).unwrap_err();
        assert!(matches!(err, RankError::NotInitialized(_)));
    }

    #[test]
    fn test_rank_json_errors() {
        let scorer = rice_millet();
        assert_eq!(
            scorer.rank_json(&json!([1, 2]), None).unwrap_err(),
            RankError::InvalidDescriptor
        );
        assert_eq!(
            scorer.rank_json(&json!({"Soil Moisture": "High"}), None).unwrap_err(),
            RankError::NoUsableSignal
        );
    }

    #[test]
    fn test_degraded_query_still_ranks() {
        let scorer = rice_millet();
        let ranking = scorer
            .rank_json(&json!({"Temperature (°C)": "22–34", "Relative Humidity (%)": "n/a"}), None)
            .unwrap();
        assert_eq!(ranking.crops.len(), 2);
        assert!(ranking.is_degraded());

        // Deterministic for the same degraded input
        let again = scorer
            .rank_json(&json!({"Temperature (°C)": "22–34", "Relative Humidity (%)": "n/a"}), None)
            .unwrap();
        assert_eq!(ranking, again);
    }

    #[test]
    fn test_catalog_not_mutated_by_ranking() {
        let catalog = Arc::new(
            Catalog::from_records(vec![
                crop("Rice", (20.0, 35.0), 150.0, 80.0, Some("Clay")),
                crop("Millet", (25.0, 40.0), 50.0, 40.0, None),
            ])
            .unwrap(),
        );
        let before = catalog.scaled_features().to_vec();
        let scorer = CropScorer::with_shared(Arc::clone(&catalog), ScoringWeights::default());
        scorer.rank(&rice_query(), None).unwrap();
        assert_eq!(catalog.scaled_features(), before.as_slice());
    }

    #[test]
    fn test_normalized_soil_weights_raise_soil_share() {
        let catalog = Catalog::from_records(vec![
            crop("Rice", (20.0, 35.0), 150.0, 80.0, Some("Clay")),
            crop("Millet", (25.0, 40.0), 50.0, 40.0, None),
        ])
        .unwrap();
        let reference = CropScorer::new(catalog.clone(), ScoringWeights::default());
        let normalized = CropScorer::new(catalog, ScoringWeights::normalized_soil());

        let q = rice_query();
        let a = &reference.rank(&q, None).unwrap().crops[0];
        let b = &normalized.rank(&q, None).unwrap().crops[0];
        assert_relative_eq!(b.score - a.score, 0.3 * 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_typed_query_is_defaulted() {
        let query = QueryDescriptor::new((22.0, 34.0), f64::NAN, 78.0);
        let ranking = rice_millet().rank(&query, None).unwrap();

        assert_eq!(ranking.crops.len(), 2);
        for c in &ranking.crops {
            assert!(c.score.is_finite());
            assert!(c.climate_similarity.is_finite());
        }
        assert!(ranking.query.features.iter().all(|v| v.is_finite()));
        assert!(ranking.is_degraded());
        assert!(ranking
            .warnings
            .iter()
            .any(|w| w.field == crate::query::QueryField::Precipitation));

        // Same result as an explicit zero precipitation, apart from the warning
        let zero = rice_millet()
            .rank(&QueryDescriptor::new((22.0, 34.0), 0.0, 78.0), None)
            .unwrap();
        assert_eq!(ranking.crops, zero.crops);
        assert!(!zero.is_degraded());
    }

    #[test]
    fn test_from_config_rejects_invalid_weights() {
        let config = EngineConfig {
            weights: ScoringWeights {
                climate: 1.0,
                soil: 1.0,
                ..ScoringWeights::default()
            },
            ..EngineConfig::default()
        };
        let scorer = CropScorer::from_config(&config);
        assert!(!scorer.is_initialized());
        let err = scorer.rank(&rice_query(), None).unwrap_err();
        assert!(err.to_string().contains("final score"));
    }

    #[test]
    fn test_score_records_shape() {
        let ranking = rice_millet().rank(&rice_query(), Some(1)).unwrap();
        let json = serde_json::to_value(ranking.score_records()).unwrap();
        assert_eq!(json[0]["Crop"], "Rice");
        assert!(json[0]["similarity"].is_f64());
    }

    #[test]
    fn test_score_all_catalog_order() {
        let scores = six_crops().score_all(&rice_query()).unwrap();
        assert_eq!(scores.len(), 6);
        assert_eq!(scores[3].crop, "Cotton");
        assert_eq!(scores[3].catalog_index, 3);
    }
}
