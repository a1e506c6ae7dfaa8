//! Data Loading and Management
//!
//! Loads the reference crop catalog from CSV using Polars, derives the four
//! numeric feature columns through the range parser, and fits the scaling
//! transform over them.
//!
//! The dataset column names are a compatibility contract with the upstream
//! data pipeline; see the `*_COL` constants.

use crate::utils::{parse_interval, parse_range, FeatureRow, ScalingTransform};
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashSet;
use std::path::Path;
use tracing::{info, warn};

pub const CROP_COL: &str = "Crop";
pub const TEMPERATURE_COL: &str = "Temp (°C)";
pub const RAIN_COL: &str = "Rain (cm)";
pub const HUMIDITY_COL: &str = "RH (%)";
pub const LOCAL_SOIL_COL: &str = "Indian Soil Type";
pub const INTERNATIONAL_SOIL_COL: &str = "FAO/WRB Soil Type";

/// Column requirements for the catalog CSV
pub const REQUIRED_COLS: &[&str] = &[
    CROP_COL,
    TEMPERATURE_COL,
    RAIN_COL,
    HUMIDITY_COL,
    LOCAL_SOIL_COL,
    INTERNATIONAL_SOIL_COL,
];

/// One reference crop with its known growing conditions
#[derive(Debug, Clone, PartialEq)]
pub struct CropRecord {
    pub name: String,
    /// °C
    pub temperature_min: f64,
    /// °C
    pub temperature_max: f64,
    /// cm, range-averaged
    pub precipitation: f64,
    /// %, range-averaged
    pub humidity: f64,
    /// Local (Indian) soil taxonomy, comma-separated free text
    pub local_soil: Option<String>,
    /// International (FAO/WRB) soil taxonomy, comma-separated free text
    pub international_soil: Option<String>,
}

impl CropRecord {
    /// Parse one dataset row
    ///
    /// Returns the reason as text when the row cannot yield four finite features.
    pub fn from_raw(
        name: Option<&str>,
        temperature: Option<&str>,
        rain: Option<&str>,
        humidity: Option<&str>,
        local_soil: Option<&str>,
        international_soil: Option<&str>,
    ) -> std::result::Result<Self, String> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "missing crop name".to_string())?;

        let (temperature_min, temperature_max) = temperature
            .and_then(parse_interval)
            .ok_or_else(|| format!("{}: unparseable temperature {:?}", name, temperature))?;

        let record = CropRecord {
            name: name.to_string(),
            temperature_min,
            temperature_max,
            precipitation: rain.map_or(f64::NAN, parse_range),
            humidity: humidity.map_or(f64::NAN, parse_range),
            local_soil: non_blank(local_soil),
            international_soil: non_blank(international_soil),
        };

        if !record.is_finite() {
            return Err(format!(
                "{}: non-finite features (rain {:?}, humidity {:?})",
                name, rain, humidity
            ));
        }

        Ok(record)
    }

    /// Raw feature row in `FEATURE_COLUMNS` order
    pub fn features(&self) -> FeatureRow {
        [
            self.temperature_min,
            self.temperature_max,
            self.precipitation,
            self.humidity,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.features().iter().all(|v| v.is_finite())
    }
}

/// Case-folded crop name used for uniqueness and lookups
pub fn crop_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The reference crop catalog with its fitted scaling transform
///
/// Immutable once built. Scaled feature rows are computed once here so
/// ranking never has to touch raw values or write anything back.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<CropRecord>,
    scaled: Vec<FeatureRow>,
    transform: ScalingTransform,
}

impl Catalog {
    /// Load the catalog from a CSV file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading crop catalog from {:?}", path);

        // Every column is read as text; the range parser owns numeric conversion
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load crop catalog CSV: {:?}", path))?;

        Self::from_dataframe(&df)
    }

    /// Build the catalog from an already-loaded DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let crop = string_column(df, CROP_COL)?;
        let temperature = string_column(df, TEMPERATURE_COL)?;
        let rain = string_column(df, RAIN_COL)?;
        let humidity = string_column(df, HUMIDITY_COL)?;
        let local_soil = string_column(df, LOCAL_SOIL_COL)?;
        let international_soil = string_column(df, INTERNATIONAL_SOIL_COL)?;

        let mut records = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            match CropRecord::from_raw(
                crop.get(idx),
                temperature.get(idx),
                rain.get(idx),
                humidity.get(idx),
                local_soil.get(idx),
                international_soil.get(idx),
            ) {
                Ok(record) => records.push(record),
                Err(reason) => warn!("Skipping catalog row {}: {}", idx + 1, reason),
            }
        }

        Self::from_records(records)
    }

    /// Build the catalog from parsed records and fit the scaling transform
    ///
    /// Non-finite records and repeated crop names are dropped (first wins).
    /// Fails if nothing usable remains.
    pub fn from_records(records: Vec<CropRecord>) -> Result<Self> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            if !record.is_finite() {
                warn!("Skipping crop '{}': non-finite features", record.name);
                continue;
            }
            if !seen.insert(crop_key(&record.name)) {
                warn!("Skipping duplicate crop '{}'", record.name);
                continue;
            }
            kept.push(record);
        }

        let raw: Vec<FeatureRow> = kept.iter().map(CropRecord::features).collect();
        let transform = ScalingTransform::fit(&raw)
            .ok_or_else(|| anyhow::anyhow!("Crop catalog has no usable rows"))?;
        let scaled = raw.iter().map(|row| transform.transform(row)).collect();

        info!("  Crops: {}", kept.len());

        Ok(Catalog {
            records: kept,
            scaled,
            transform,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CropRecord] {
        &self.records
    }

    /// Scaled feature rows, aligned with `records()`
    pub fn scaled_features(&self) -> &[FeatureRow] {
        &self.scaled
    }

    pub fn transform(&self) -> &ScalingTransform {
        &self.transform
    }

    /// Look up a crop by name, case-insensitively
    pub fn get(&self, name: &str) -> Option<&CropRecord> {
        let key = crop_key(name);
        self.records.iter().find(|r| crop_key(&r.name) == key)
    }
}
