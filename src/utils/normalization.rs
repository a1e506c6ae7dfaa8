//! Normalization Utilities
//!
//! Min-max scaling of the four climate feature columns. The transform is
//! fitted once over the crop catalog and then applied, unchanged, to both the
//! catalog rows and every incoming query so the two live in the same space.

use serde::{Deserialize, Serialize};

/// Number of climate features fed into similarity scoring
pub const N_FEATURES: usize = 4;

/// Feature column order shared by the catalog and the query vectorizer.
///
/// The transform is position-indexed, so every producer of a feature row
/// must follow this order.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "Temperature_min",
    "Temperature_max",
    "Precipitation",
    "Humidity",
];

/// A raw or scaled feature row in [`FEATURE_COLUMNS`] order
pub type FeatureRow = [f64; N_FEATURES];

/// Observed bounds of one feature column
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    /// Whether every catalog value in this column was identical
    pub fn is_degenerate(&self) -> bool {
        self.max - self.min <= 0.0
    }

    /// Scale one value into [0, 1]
    ///
    /// Degenerate columns and non-finite values map to 0. Values outside the
    /// fitted range are clipped so query vectors stay comparable to catalog rows.
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Fitted min-max transform over the catalog's feature columns
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScalingTransform {
    columns: [ColumnRange; N_FEATURES],
}

impl ScalingTransform {
    /// Fit per-column min/max over the given rows
    ///
    /// Rows must be finite; returns `None` for an empty input.
    pub fn fit(rows: &[FeatureRow]) -> Option<Self> {
        let first = rows.first()?;
        let mut columns = first.map(|v| ColumnRange { min: v, max: v });

        for row in &rows[1..] {
            for (range, &value) in columns.iter_mut().zip(row.iter()) {
                range.min = range.min.min(value);
                range.max = range.max.max(value);
            }
        }

        Some(Self { columns })
    }

    /// Apply the transform to one row
    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut scaled = [0.0; N_FEATURES];
        for (i, out) in scaled.iter_mut().enumerate() {
            *out = self.columns[i].scale(row[i]);
        }
        scaled
    }

    /// Fitted range of a column, by position in [`FEATURE_COLUMNS`]
    pub fn column(&self, index: usize) -> Option<&ColumnRange> {
        self.columns.get(index)
    }
}
