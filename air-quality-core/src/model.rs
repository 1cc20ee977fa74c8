use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::AqiCategoryEntry;

/// Code of the universal AQI, reported for every location.
pub const UNIVERSAL_AQI: &str = "uaqi";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    CurrentConditions,
    Forecast,
}

/// RGB color as fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Color {
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.red), channel(self.green), channel(self.blue))
    }

    pub fn to_hex(self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Unit of a pollutant concentration. Values the library does not know yet
/// are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConcentrationUnits {
    PartsPerBillion,
    MicrogramsPerCubicMeter,
    Other(String),
}

impl ConcentrationUnits {
    pub fn as_str(&self) -> &str {
        match self {
            ConcentrationUnits::PartsPerBillion => "PARTS_PER_BILLION",
            ConcentrationUnits::MicrogramsPerCubicMeter => "MICROGRAMS_PER_CUBIC_METER",
            ConcentrationUnits::Other(s) => s,
        }
    }

    /// Short symbol for display.
    pub fn symbol(&self) -> &str {
        match self {
            ConcentrationUnits::PartsPerBillion => "ppb",
            ConcentrationUnits::MicrogramsPerCubicMeter => "µg/m³",
            ConcentrationUnits::Other(s) => s,
        }
    }
}

impl From<&str> for ConcentrationUnits {
    fn from(value: &str) -> Self {
        match value {
            "PARTS_PER_BILLION" => ConcentrationUnits::PartsPerBillion,
            "MICROGRAMS_PER_CUBIC_METER" => ConcentrationUnits::MicrogramsPerCubicMeter,
            other => ConcentrationUnits::Other(other.to_string()),
        }
    }
}

impl From<String> for ConcentrationUnits {
    fn from(value: String) -> Self {
        ConcentrationUnits::from(value.as_str())
    }
}

impl From<ConcentrationUnits> for String {
    fn from(value: ConcentrationUnits) -> Self {
        match value {
            ConcentrationUnits::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ConcentrationUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub value: f64,
    pub units: ConcentrationUnits,
}

/// Health effects and typical sources, when the service includes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantInfo {
    pub sources: String,
    pub effects: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantEntry {
    pub code: String,
    pub display_name: String,
    pub full_name: String,
    pub concentration: Concentration,
    pub additional_info: Option<PollutantInfo>,
}

/// One severity reading, universal or local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub code: String,
    pub display_name: String,
    pub aqi: Option<i32>,
    pub aqi_display: Option<String>,
    pub color: Color,

    /// Normalized category, or the service's label verbatim when the index
    /// is not in the category table.
    pub category: String,

    /// The label exactly as the service returned it.
    pub raw_category: String,

    pub dominant_pollutant: Option<String>,

    /// Every band this index can report, least severe first. Empty for
    /// indexes outside the category table.
    pub category_options: Vec<AqiCategoryEntry>,

    pub pollutant_options: BTreeSet<String>,
}

impl IndexEntry {
    pub fn is_universal(&self) -> bool {
        self.code == UNIVERSAL_AQI
    }

    /// Whether `category` went through the category table.
    pub fn is_normalized(&self) -> bool {
        !self.category_options.is_empty()
    }

    /// Band position of this reading, counted from the least severe.
    pub fn severity(&self) -> Option<usize> {
        self.category_options
            .iter()
            .position(|e| e.original == self.raw_category)
    }
}

/// A parsed current-conditions or forecast response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityResponse {
    pub kind: ResponseKind,

    /// Observation time, or the forecast hour for forecasts.
    pub date_time: DateTime<Utc>,
    pub region_code: String,
    pub indexes: Vec<IndexEntry>,
    pub pollutants: Vec<PollutantEntry>,
}

impl AirQualityResponse {
    pub fn universal_aqi(&self) -> Option<&IndexEntry> {
        self.indexes.iter().find(|i| i.is_universal())
    }

    pub fn local_aqi(&self) -> Option<&IndexEntry> {
        self.indexes.iter().find(|i| !i.is_universal())
    }

    pub fn index(&self, code: &str) -> Option<&IndexEntry> {
        self.indexes.iter().find(|i| i.code == code)
    }

    pub fn pollutant(&self, code: &str) -> Option<&PollutantEntry> {
        self.pollutants.iter().find(|p| p.code == code)
    }
}
