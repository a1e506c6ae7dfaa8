//! Utility modules for crop ranking
//!
//! Contains shared functionality used by the catalog loader and the query vectorizer:
//! - Range parsing: "min–max" measurement strings to numbers
//! - Normalization: Min-max scaling transform fitted over the catalog

pub mod range_parser;
pub mod normalization;

// Re-export commonly used types
pub use range_parser::{extract_numbers, parse_interval, parse_range, parse_range_value};
pub use normalization::{ColumnRange, FeatureRow, ScalingTransform, FEATURE_COLUMNS, N_FEATURES};
