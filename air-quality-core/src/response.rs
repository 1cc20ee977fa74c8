//! Construction of [`AirQualityResponse`] from the service's JSON.
//!
//! Parsing is deterministic: the result depends only on the payload and the
//! category table behind the resolver.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{AirQualityError, Result},
    model::{
        AirQualityResponse, Color, Concentration, ConcentrationUnits, IndexEntry, PollutantEntry,
        PollutantInfo, ResponseKind,
    },
    resolver::CategoryResolver,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConditions {
    date_time: DateTime<Utc>,
    region_code: String,
    #[serde(default)]
    indexes: Vec<RawIndex>,
    #[serde(default)]
    pollutants: Vec<RawPollutant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawForecast {
    region_code: String,
    hourly_forecasts: Vec<RawHourlyForecast>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHourlyForecast {
    date_time: DateTime<Utc>,
    #[serde(default)]
    indexes: Vec<RawIndex>,
    #[serde(default)]
    pollutants: Vec<RawPollutant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIndex {
    code: String,
    display_name: String,
    aqi: Option<i32>,
    aqi_display: Option<String>,
    #[serde(default)]
    color: RawColor,
    category: String,
    dominant_pollutant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawColor {
    #[serde(default)]
    red: f64,
    #[serde(default)]
    green: f64,
    #[serde(default)]
    blue: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPollutant {
    code: String,
    display_name: String,
    full_name: String,
    concentration: RawConcentration,
    additional_info: Option<RawPollutantInfo>,
}

#[derive(Debug, Deserialize)]
struct RawConcentration {
    value: f64,
    units: String,
}

#[derive(Debug, Deserialize)]
struct RawPollutantInfo {
    #[serde(default)]
    sources: String,
    #[serde(default)]
    effects: String,
}

impl AirQualityResponse {
    /// Build from a `currentConditions:lookup` body.
    pub fn from_current(raw: &Value, resolver: &CategoryResolver) -> Result<Self> {
        let parsed = RawConditions::deserialize(raw).map_err(malformed)?;
        assemble(
            ResponseKind::CurrentConditions,
            parsed.date_time,
            parsed.region_code,
            parsed.indexes,
            parsed.pollutants,
            resolver,
        )
    }

    /// Build from a `forecast:lookup` body.
    ///
    /// The first entry of `hourlyForecasts` is the requested hour. A body
    /// without `hourlyForecasts` is read like a current-conditions body.
    pub fn from_forecast(raw: &Value, resolver: &CategoryResolver) -> Result<Self> {
        if raw.get("hourlyForecasts").is_none() {
            let parsed = RawConditions::deserialize(raw).map_err(malformed)?;
            return assemble(
                ResponseKind::Forecast,
                parsed.date_time,
                parsed.region_code,
                parsed.indexes,
                parsed.pollutants,
                resolver,
            );
        }

        let parsed = RawForecast::deserialize(raw).map_err(malformed)?;
        let hour = parsed.hourly_forecasts.into_iter().next().ok_or_else(|| {
            AirQualityError::MalformedResponse("hourlyForecasts is empty".to_string())
        })?;

        assemble(
            ResponseKind::Forecast,
            hour.date_time,
            parsed.region_code,
            hour.indexes,
            hour.pollutants,
            resolver,
        )
    }
}

fn malformed(err: serde_json::Error) -> AirQualityError {
    AirQualityError::MalformedResponse(err.to_string())
}

fn assemble(
    kind: ResponseKind,
    date_time: DateTime<Utc>,
    region_code: String,
    raw_indexes: Vec<RawIndex>,
    raw_pollutants: Vec<RawPollutant>,
    resolver: &CategoryResolver,
) -> Result<AirQualityResponse> {
    let indexes = raw_indexes
        .into_iter()
        .map(|raw| build_index(raw, resolver))
        .collect::<Result<Vec<_>>>()?;

    let universal = indexes.iter().filter(|i| i.is_universal()).count();
    let local = indexes.len() - universal;
    if universal > 1 || local > 1 {
        return Err(AirQualityError::MalformedResponse(format!(
            "expected at most one universal and one local index, got {universal} and {local}"
        )));
    }

    let pollutants = raw_pollutants.into_iter().map(build_pollutant).collect();

    debug!(
        ?kind,
        %date_time,
        region = %region_code,
        indexes = indexes.len(),
        "parsed air quality response"
    );

    Ok(AirQualityResponse {
        kind,
        date_time,
        region_code,
        indexes,
        pollutants,
    })
}

fn build_index(raw: RawIndex, resolver: &CategoryResolver) -> Result<IndexEntry> {
    let mapping = resolver.mapping();

    let (category, category_options, pollutant_options) = match mapping.lookup(&raw.code) {
        Some(def) => {
            let normalized = resolver.normalize(&raw.code, &raw.category)?.to_string();
            debug!(index = %raw.code, raw = %raw.category, %normalized, "resolved category");
            (
                normalized,
                def.categories.clone(),
                def.pollutants.iter().cloned().collect(),
            )
        }
        None => {
            warn!(
                index = %raw.code,
                category = %raw.category,
                "index not in category table, keeping label verbatim"
            );
            (raw.category.clone(), Vec::new(), Default::default())
        }
    };

    Ok(IndexEntry {
        code: raw.code,
        display_name: raw.display_name,
        aqi: raw.aqi,
        aqi_display: raw.aqi_display,
        color: Color {
            red: raw.color.red,
            green: raw.color.green,
            blue: raw.color.blue,
        },
        category,
        raw_category: raw.category,
        dominant_pollutant: raw.dominant_pollutant,
        category_options,
        pollutant_options,
    })
}

fn build_pollutant(raw: RawPollutant) -> PollutantEntry {
    PollutantEntry {
        code: raw.code,
        display_name: raw.display_name,
        full_name: raw.full_name,
        concentration: Concentration {
            value: raw.concentration.value,
            units: ConcentrationUnits::from(raw.concentration.units),
        },
        additional_info: raw.additional_info.map(|info| PollutantInfo {
            sources: info.sources,
            effects: info.effects,
        }),
    }
}
