//! Engine Configuration
//!
//! Scoring weights and catalog location.
//!
//! The defaults reproduce the reference blend: `0.7 * climate + 0.3 * soil`,
//! where the soil subscore is the sum of two taxonomy matches weighted 0.25
//! each. Soil therefore contributes at most 0.15 to a final score. Every one
//! of the four weights is configurable so deployments can rebalance that
//! (see [`ScoringWeights::normalized_soil`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_DATA_PATH: &str = "data/crop_data.csv";

pub const DATA_PATH_ENV: &str = "CROP_DATA_PATH";
pub const TOP_K_ENV: &str = "CROP_TOP_K";
pub const WEIGHTS_PATH_ENV: &str = "CROP_WEIGHTS_PATH";

/// Weights of the final score blend
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight on cosine climate similarity
    pub climate: f64,
    /// Weight on the combined soil subscore
    pub soil: f64,
    /// Contribution of a full local-taxonomy match to the soil subscore
    pub local_soil: f64,
    /// Contribution of a full international-taxonomy match to the soil subscore
    pub international_soil: f64,
}

impl ScoringWeights {
    pub const REFERENCE: ScoringWeights = ScoringWeights {
        climate: 0.7,
        soil: 0.3,
        local_soil: 0.25,
        international_soil: 0.25,
    };

    /// Soil subscore spans [0, 1], so soil can reach its full 0.3 share
    pub fn normalized_soil() -> Self {
        Self {
            local_soil: 0.5,
            international_soil: 0.5,
            ..Self::REFERENCE
        }
    }

    /// Largest soil subscore a crop can reach
    pub fn max_soil_subscore(&self) -> f64 {
        self.local_soil + self.international_soil
    }

    /// Largest final score a crop can reach
    pub fn max_final_score(&self) -> f64 {
        self.climate + self.soil * self.max_soil_subscore()
    }

    /// All weights must be finite and non-negative, and the blend must keep
    /// final scores within [0, 1]
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("climate", self.climate),
            ("soil", self.soil),
            ("local_soil", self.local_soil),
            ("international_soil", self.international_soil),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("Scoring weight '{}' must be finite and >= 0, got {}", name, value);
            }
        }
        // Tolerance for 0.7 + 0.3 * 1.0 rounding
        if self.max_final_score() > 1.0 + 1e-9 {
            anyhow::bail!(
                "Scoring weights allow a final score of {} (must not exceed 1)",
                self.max_final_score()
            );
        }
        Ok(())
    }

    /// Load weights from a JSON file; omitted fields keep reference values
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scoring weights: {:?}", path))?;

        let weights: ScoringWeights = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse scoring weights JSON")?;

        weights.validate()?;
        Ok(weights)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Everything needed to build a ranking engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub data_path: PathBuf,
    pub default_top_k: usize,
    pub weights: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            default_top_k: DEFAULT_TOP_K,
            weights: ScoringWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Configuration from environment variables
    ///
    /// - `CROP_DATA_PATH`: catalog CSV (default `data/crop_data.csv`)
    /// - `CROP_TOP_K`: default result count (default 5)
    /// - `CROP_WEIGHTS_PATH`: optional JSON file of [`ScoringWeights`]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_path = lookup(DATA_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let default_top_k = match lookup(TOP_K_ENV) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid {}={:?}, using {}", TOP_K_ENV, raw, DEFAULT_TOP_K);
                DEFAULT_TOP_K
            }),
            None => DEFAULT_TOP_K,
        };

        let weights = match lookup(WEIGHTS_PATH_ENV) {
            Some(path) => ScoringWeights::load(Path::new(&path))?,
            None => ScoringWeights::default(),
        };

        Ok(Self {
            data_path,
            default_top_k,
            weights,
        })
    }
}
