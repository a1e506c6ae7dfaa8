//! Query Vectorizer
//!
//! Turns a loosely structured climate/soil descriptor (JSON produced by the
//! upstream weather and soil collaborators) into the catalog's normalized
//! feature space.
//!
//! Malformed fields never fail the query. Each one falls back to a documented
//! default (0 for numeric fields, "Medium" for soil moisture) and leaves a
//! [`ParseWarning`] so callers can tell a clean query from a degraded one.

use crate::utils::{parse_interval, parse_range_value, FeatureRow, ScalingTransform};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

const TEMPERATURE_KEYS: &[&str] = &["Temperature (°C)", "temperature"];
const TEMPERATURE_MIN_KEY: &str = "Temp_min";
const TEMPERATURE_MAX_KEY: &str = "Temp_max";
const PRECIPITATION_KEYS: &[&str] = &["Precipitation (cm)", "precipitation", "Rain"];
const HUMIDITY_KEYS: &[&str] = &["Relative Humidity (%)", "humidity", "RH_avg"];
const SOIL_MOISTURE_KEYS: &[&str] = &["Soil Moisture", "soil_moisture"];
const LOCAL_SOIL_KEYS: &[&str] = &["Indian Soil Type", "indian_soil_types"];
const INTERNATIONAL_SOIL_KEYS: &[&str] = &["FAO/WRB Soil Type", "fao_soil_types"];

// ============================================================================
// Soil moisture
// ============================================================================

/// Soil moisture category reported by the weather collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SoilMoisture {
    Low,
    #[serde(rename = "Low–Medium")]
    LowMedium,
    #[default]
    Medium,
    #[serde(rename = "Moderate–High")]
    ModerateHigh,
    High,
}

impl SoilMoisture {
    /// Parse a category label, tolerant of case and dash style
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .replace(['\u{2013}', '\u{2014}'], "-")
            .split_whitespace()
            .collect();

        match normalized.as_str() {
            "low" => Some(SoilMoisture::Low),
            "low-medium" => Some(SoilMoisture::LowMedium),
            "medium" => Some(SoilMoisture::Medium),
            "mod-high" | "moderate-high" => Some(SoilMoisture::ModerateHigh),
            "high" => Some(SoilMoisture::High),
            _ => None,
        }
    }

    /// Categorize an average volumetric soil moisture reading (m³/m³)
    pub fn from_volumetric(avg: f64) -> Self {
        if !avg.is_finite() {
            SoilMoisture::Medium
        } else if avg < 0.2 {
            SoilMoisture::Low
        } else if avg < 0.4 {
            SoilMoisture::Medium
        } else {
            SoilMoisture::High
        }
    }

    /// Numeric degree in [0, 1]
    pub fn degree(&self) -> f64 {
        match self {
            SoilMoisture::Low => 0.0,
            SoilMoisture::LowMedium => 0.25,
            SoilMoisture::Medium => 0.5,
            SoilMoisture::ModerateHigh => 0.75,
            SoilMoisture::High => 1.0,
        }
    }
}

// ============================================================================
// Parse warnings
// ============================================================================

/// Descriptor field a warning refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryField {
    Temperature,
    Precipitation,
    Humidity,
    SoilMoisture,
    LocalSoil,
    InternationalSoil,
}

impl QueryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryField::Temperature => "temperature",
            QueryField::Precipitation => "precipitation",
            QueryField::Humidity => "humidity",
            QueryField::SoilMoisture => "soil_moisture",
            QueryField::LocalSoil => "local_soil",
            QueryField::InternationalSoil => "international_soil",
        }
    }
}

/// What went wrong with a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningIssue {
    /// Key absent or null
    Missing,
    /// Present but no usable number / list could be extracted
    Unparseable,
    /// Present but not a known category label
    Unrecognized,
}

/// A descriptor field that fell back to its default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub field: QueryField,
    pub issue: WarningIssue,
}

impl ParseWarning {
    fn new(field: QueryField, issue: WarningIssue) -> Self {
        Self { field, issue }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issue = match self.issue {
            WarningIssue::Missing => "missing",
            WarningIssue::Unparseable => "unparseable",
            WarningIssue::Unrecognized => "unrecognized",
        };
        let default = match self.field {
            QueryField::SoilMoisture => "Medium",
            QueryField::LocalSoil | QueryField::InternationalSoil => "no labels",
            _ => "0",
        };
        write!(f, "{} {}, defaulted to {}", self.field.as_str(), issue, default)
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Climate/soil summary for one location
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub soil_moisture: SoilMoisture,
    pub local_soil: Vec<String>,
    pub international_soil: Vec<String>,
    pub warnings: Vec<ParseWarning>,
}

/// Scaled query ready for similarity scoring
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVector {
    /// Scaled climate features in `FEATURE_COLUMNS` order
    pub features: FeatureRow,
    /// Informational only; not part of the similarity computation
    pub soil_moisture: f64,
}

impl QueryDescriptor {
    /// Typed constructor for callers that already hold clean values
    pub fn new(temperature: (f64, f64), precipitation: f64, humidity: f64) -> Self {
        Self {
            temperature_min: temperature.0,
            temperature_max: temperature.1,
            precipitation,
            humidity,
            ..Default::default()
        }
    }

    pub fn with_soil_moisture(mut self, soil_moisture: SoilMoisture) -> Self {
        self.soil_moisture = soil_moisture;
        self
    }

    pub fn with_local_soil<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.local_soil = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_international_soil<S: Into<String>>(
        mut self,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        self.international_soil = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Best-effort extraction from loosely structured JSON
    ///
    /// Never fails: a non-object value is treated as an empty descriptor.
    pub fn from_json(value: &Value) -> Self {
        let empty = Map::new();
        let map = value.as_object().unwrap_or(&empty);
        let mut warnings = Vec::new();

        let (temperature_min, temperature_max) = extract_temperature(map, &mut warnings);
        let precipitation =
            extract_measurement(map, PRECIPITATION_KEYS, QueryField::Precipitation, &mut warnings);
        let humidity =
            extract_measurement(map, HUMIDITY_KEYS, QueryField::Humidity, &mut warnings);
        let soil_moisture = extract_soil_moisture(map, &mut warnings);
        let local_soil =
            extract_soil_labels(map, LOCAL_SOIL_KEYS, QueryField::LocalSoil, &mut warnings);
        let international_soil = extract_soil_labels(
            map,
            INTERNATIONAL_SOIL_KEYS,
            QueryField::InternationalSoil,
            &mut warnings,
        );

        Self {
            temperature_min,
            temperature_max,
            precipitation,
            humidity,
            soil_moisture,
            local_soil,
            international_soil,
            warnings,
        }
    }

    /// Raw climate features in `FEATURE_COLUMNS` order
    pub fn raw_features(&self) -> FeatureRow {
        [
            self.temperature_min,
            self.temperature_max,
            self.precipitation,
            self.humidity,
        ]
    }

    /// Scale through the catalog's fitted transform
    ///
    /// Non-finite climate values are replaced by the numeric default of 0
    /// (see [`QueryDescriptor::effective_warnings`]).
    pub fn vectorize(&self, transform: &ScalingTransform) -> QueryVector {
        let raw = self
            .raw_features()
            .map(|v| if v.is_finite() { v } else { 0.0 });

        QueryVector {
            features: transform.transform(&raw),
            soil_moisture: self.soil_moisture.degree(),
        }
    }

    /// Parse warnings plus one `Unparseable` warning per climate field
    /// holding a non-finite value (possible through the typed constructor)
    pub fn effective_warnings(&self) -> Vec<ParseWarning> {
        let mut warnings = self.warnings.clone();
        let climate = [
            (
                QueryField::Temperature,
                self.temperature_min.is_finite() && self.temperature_max.is_finite(),
            ),
            (QueryField::Precipitation, self.precipitation.is_finite()),
            (QueryField::Humidity, self.humidity.is_finite()),
        ];

        for (field, finite) in climate {
            if !finite && !warnings.iter().any(|w| w.field == field) {
                warnings.push(ParseWarning::new(field, WarningIssue::Unparseable));
            }
        }

        warnings
    }

    /// Whether any field fell back to a default
    pub fn is_degraded(&self) -> bool {
        !self.effective_warnings().is_empty()
    }

    /// False when every climate field was defaulted and no soil label was given
    pub fn has_usable_signal(&self) -> bool {
        let warnings = self.effective_warnings();
        let climate_defaulted = [
            QueryField::Temperature,
            QueryField::Precipitation,
            QueryField::Humidity,
        ]
        .iter()
        .all(|field| warnings.iter().any(|w| w.field == *field));

        !climate_defaulted || !self.local_soil.is_empty() || !self.international_soil.is_empty()
    }
}

/// Vectorize a JSON descriptor in one step
pub fn climate_to_vector(value: &Value, transform: &ScalingTransform) -> (QueryVector, Vec<ParseWarning>) {
    let descriptor = QueryDescriptor::from_json(value);
    (descriptor.vectorize(transform), descriptor.warnings)
}

/// First present, non-null value among the alias keys
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn extract_temperature(map: &Map<String, Value>, warnings: &mut Vec<ParseWarning>) -> (f64, f64) {
    let parsed = match lookup(map, TEMPERATURE_KEYS) {
        Some(Value::String(s)) => parse_interval(s).ok_or(WarningIssue::Unparseable),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|t| (t, t))
            .ok_or(WarningIssue::Unparseable),
        Some(_) => Err(WarningIssue::Unparseable),
        None => {
            // Weather summaries report the bounds as separate numbers
            let low = map.get(TEMPERATURE_MIN_KEY).map(parse_range_value);
            let high = map.get(TEMPERATURE_MAX_KEY).map(parse_range_value);
            match (low, high) {
                (None, None) => Err(WarningIssue::Missing),
                (low, high) => {
                    let low = low.filter(|v| v.is_finite());
                    let high = high.filter(|v| v.is_finite());
                    match (low, high) {
                        (Some(l), Some(h)) => Ok((l, h)),
                        (Some(t), None) | (None, Some(t)) => Ok((t, t)),
                        (None, None) => Err(WarningIssue::Unparseable),
                    }
                }
            }
        }
    };

    parsed.unwrap_or_else(|issue| {
        warnings.push(ParseWarning::new(QueryField::Temperature, issue));
        (0.0, 0.0)
    })
}

fn extract_measurement(
    map: &Map<String, Value>,
    keys: &[&str],
    field: QueryField,
    warnings: &mut Vec<ParseWarning>,
) -> f64 {
    let Some(value) = lookup(map, keys) else {
        warnings.push(ParseWarning::new(field, WarningIssue::Missing));
        return 0.0;
    };

    let parsed = parse_range_value(value);
    if parsed.is_finite() {
        parsed
    } else {
        warnings.push(ParseWarning::new(field, WarningIssue::Unparseable));
        0.0
    }
}

fn extract_soil_moisture(map: &Map<String, Value>, warnings: &mut Vec<ParseWarning>) -> SoilMoisture {
    let issue = match lookup(map, SOIL_MOISTURE_KEYS) {
        Some(Value::String(label)) => match SoilMoisture::from_label(label) {
            Some(category) => return category,
            None => WarningIssue::Unrecognized,
        },
        Some(_) => WarningIssue::Unrecognized,
        None => WarningIssue::Missing,
    };

    warnings.push(ParseWarning::new(QueryField::SoilMoisture, issue));
    SoilMoisture::Medium
}

/// Soil labels arrive either as a JSON array or a comma-separated string.
/// An absent field is normal (not every location has both taxonomies).
fn extract_soil_labels(
    map: &Map<String, Value>,
    keys: &[&str],
    field: QueryField,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<String> {
    let labels: Vec<String> = match lookup(map, keys) {
        None => return Vec::new(),
        Some(Value::Array(items)) => {
            if items.iter().any(|item| !item.is_string()) {
                warnings.push(ParseWarning::new(field, WarningIssue::Unparseable));
            }
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        }
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(_) => {
            warnings.push(ParseWarning::new(field, WarningIssue::Unparseable));
            return Vec::new();
        }
    };

    labels
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn transform() -> ScalingTransform {
        ScalingTransform::fit(&[[20.0, 35.0, 150.0, 80.0], [25.0, 40.0, 50.0, 40.0]]).unwrap()
    }

    #[test]
    fn test_soil_moisture_labels() {
        assert_eq!(SoilMoisture::from_label("High"), Some(SoilMoisture::High));
        assert_eq!(SoilMoisture::from_label(" low "), Some(SoilMoisture::Low));
        assert_eq!(SoilMoisture::from_label("Low–Medium"), Some(SoilMoisture::LowMedium));
        assert_eq!(SoilMoisture::from_label("Mod–High"), Some(SoilMoisture::ModerateHigh));
        assert_eq!(SoilMoisture::from_label("Moderate - High"), Some(SoilMoisture::ModerateHigh));
        assert_eq!(SoilMoisture::from_label("soggy"), None);
    }

    #[test]
    fn test_soil_moisture_degrees() {
        assert_relative_eq!(SoilMoisture::Low.degree(), 0.0);
        assert_relative_eq!(SoilMoisture::LowMedium.degree(), 0.25);
        assert_relative_eq!(SoilMoisture::Medium.degree(), 0.5);
        assert_relative_eq!(SoilMoisture::ModerateHigh.degree(), 0.75);
        assert_relative_eq!(SoilMoisture::High.degree(), 1.0);
    }

    #[test]
    fn test_soil_moisture_from_volumetric() {
        assert_eq!(SoilMoisture::from_volumetric(0.1), SoilMoisture::Low);
        assert_eq!(SoilMoisture::from_volumetric(0.2), SoilMoisture::Medium);
        assert_eq!(SoilMoisture::from_volumetric(0.39), SoilMoisture::Medium);
        assert_eq!(SoilMoisture::from_volumetric(0.4), SoilMoisture::High);
        assert_eq!(SoilMoisture::from_volumetric(f64::NAN), SoilMoisture::Medium);
    }

    #[test]
    fn test_full_descriptor() {
        let descriptor = QueryDescriptor::from_json(&json!({
            "Temperature (°C)": "22–34",
            "Precipitation (cm)": "140 cm",
            "Relative Humidity (%)": 78,
            "Soil Moisture": "High",
            "Indian Soil Type": ["Clay", " Alluvial "],
            "FAO/WRB Soil Type": "Vertisols, Luvisols"
        }));

        assert_eq!(descriptor.raw_features(), [22.0, 34.0, 140.0, 78.0]);
        assert_eq!(descriptor.soil_moisture, SoilMoisture::High);
        assert_eq!(descriptor.local_soil, vec!["Clay", "Alluvial"]);
        assert_eq!(descriptor.international_soil, vec!["Vertisols", "Luvisols"]);
        assert!(!descriptor.is_degraded());
        assert!(descriptor.has_usable_signal());
    }

    #[test]
    fn test_alias_keys_from_weather_summary() {
        let descriptor = QueryDescriptor::from_json(&json!({
            "Temp_min": 18.5,
            "Temp_max": 31.0,
            "Rain": 12.4,
            "RH_avg": 66.0,
            "soil_moisture": "Low",
            "indian_soil_types": ["Black"]
        }));
        assert_eq!(descriptor.raw_features(), [18.5, 31.0, 12.4, 66.0]);
        assert_eq!(descriptor.soil_moisture, SoilMoisture::Low);
        assert_eq!(descriptor.local_soil, vec!["Black"]);
        assert!(descriptor.warnings.is_empty());
    }

    #[test]
    fn test_single_temperature_is_zero_width() {
        let descriptor = QueryDescriptor::from_json(&json!({"temperature": "27 °C"}));
        assert_relative_eq!(descriptor.temperature_min, 27.0);
        assert_relative_eq!(descriptor.temperature_max, 27.0);
    }

    #[test]
    fn test_malformed_fields_default_with_warnings() {
        let descriptor = QueryDescriptor::from_json(&json!({
            "Temperature (°C)": "warm",
            "Precipitation (cm)": ["lots"],
            "Soil Moisture": "soggy",
            "Indian Soil Type": 7
        }));

        assert_eq!(descriptor.raw_features(), [0.0; 4]);
        assert_eq!(descriptor.soil_moisture, SoilMoisture::Medium);
        assert!(descriptor.local_soil.is_empty());
        assert!(descriptor.is_degraded());
        assert_eq!(
            descriptor.warnings,
            vec![
                ParseWarning::new(QueryField::Temperature, WarningIssue::Unparseable),
                ParseWarning::new(QueryField::Precipitation, WarningIssue::Unparseable),
                ParseWarning::new(QueryField::Humidity, WarningIssue::Missing),
                ParseWarning::new(QueryField::SoilMoisture, WarningIssue::Unrecognized),
                ParseWarning::new(QueryField::LocalSoil, WarningIssue::Unparseable),
            ]
        );
        assert!(!descriptor.has_usable_signal());
    }

    #[test]
    fn test_non_object_is_empty_descriptor() {
        let descriptor = QueryDescriptor::from_json(&json!("not a map"));
        assert_eq!(descriptor.raw_features(), [0.0; 4]);
        assert_eq!(descriptor.warnings.len(), 4);
    }

    #[test]
    fn test_typed_non_finite_fields_are_defaulted() {
        let descriptor = QueryDescriptor::new((22.0, f64::INFINITY), f64::NAN, 78.0);
        assert!(descriptor.warnings.is_empty());
        assert!(descriptor.is_degraded());
        assert_eq!(
            descriptor.effective_warnings(),
            vec![
                ParseWarning::new(QueryField::Temperature, WarningIssue::Unparseable),
                ParseWarning::new(QueryField::Precipitation, WarningIssue::Unparseable),
            ]
        );

        let vector = descriptor.vectorize(&transform());
        assert!(vector.features.iter().all(|v| v.is_finite()));
        assert_eq!(vector.features[1], 0.0);
        assert_eq!(vector.features[2], 0.0);

        let all_nan = QueryDescriptor::new((f64::NAN, f64::NAN), f64::NAN, f64::NAN);
        assert!(!all_nan.has_usable_signal());
    }

    #[test]
    fn test_warning_display() {
        let warning = ParseWarning::new(QueryField::SoilMoisture, WarningIssue::Missing);
        assert_eq!(warning.to_string(), "soil_moisture missing, defaulted to Medium");
    }

    #[test]
    fn test_vector_in_unit_range() {
        let (vector, warnings) = climate_to_vector(
            &json!({
                "Temperature (°C)": "22–34",
                "Precipitation (cm)": 140,
                "Relative Humidity (%)": "70-86",
                "Soil Moisture": "High"
            }),
            &transform(),
        );
        assert!(warnings.is_empty());
        assert!(vector.features.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_relative_eq!(vector.features[2], 0.9, epsilon = 1e-12);
        assert_relative_eq!(vector.features[3], 0.95, epsilon = 1e-12);
        assert_relative_eq!(vector.soil_moisture, 1.0);
    }
}
