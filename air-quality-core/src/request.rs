use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    category::CategoryMapping,
    error::{AirQualityError, Result},
};

/// How far ahead the forecast endpoint answers.
pub const MAX_FORECAST_HOURS: i64 = 96;

const EXTRA_COMPUTATIONS: [&str; 2] = ["LOCAL_AQI", "POLLUTANT_CONCENTRATION"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn to_json(self) -> Value {
        json!({ "latitude": self.latitude, "longitude": self.longitude })
    }
}

/// A validated `(region, index)` pair asking the service to report a
/// specific local index instead of the region's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAqi {
    pub region_code: String,
    pub aqi: String,
}

impl LocalAqi {
    /// Validate an optional pair against the category table.
    ///
    /// Both absent means "use the region's default". Supplying only one of
    /// them is a configuration error.
    pub fn resolve(
        region_code: Option<&str>,
        custom_local_aqi: Option<&str>,
        mapping: &CategoryMapping,
    ) -> Result<Option<Self>> {
        match (region_code, custom_local_aqi) {
            (None, None) => Ok(None),
            (Some(region_code), Some(aqi)) => Self::new(region_code, aqi, mapping).map(Some),
            (Some(_), None) => Err(AirQualityError::InvalidAqiConfiguration(
                "a region code was given without a custom local AQI".to_string(),
            )),
            (None, Some(_)) => Err(AirQualityError::InvalidAqiConfiguration(
                "a custom local AQI was given without a region code".to_string(),
            )),
        }
    }

    pub fn new(region_code: &str, aqi: &str, mapping: &CategoryMapping) -> Result<Self> {
        let region_code = region_code.trim();
        if region_code.len() != 2 || !region_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AirQualityError::InvalidAqiConfiguration(format!(
                "region code '{region_code}' is not a two-letter country code"
            )));
        }

        let supported = mapping
            .lookup(aqi)
            .is_some_and(|def| def.supports_region(region_code));
        if !supported {
            return Err(AirQualityError::UnsupportedLocalAqiForCountry {
                region_code: region_code.to_ascii_uppercase(),
                aqi: aqi.to_string(),
            });
        }

        Ok(Self {
            region_code: region_code.to_ascii_uppercase(),
            aqi: aqi.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditionsRequest {
    pub location: Location,
    pub local_aqi: Option<LocalAqi>,
}

impl CurrentConditionsRequest {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            local_aqi: None,
        }
    }

    pub fn with_local_aqi(mut self, local_aqi: Option<LocalAqi>) -> Self {
        self.local_aqi = local_aqi;
        self
    }

    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "location": self.location.to_json(),
            "extraComputations": EXTRA_COMPUTATIONS,
            "universalAqi": true,
        });

        if let Some(local) = &self.local_aqi {
            payload["customLocalAqis"] =
                json!([{ "regionCode": local.region_code, "aqi": local.aqi }]);
        }

        payload
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub location: Location,
    pub date_time: DateTime<Utc>,
}

impl ForecastRequest {
    /// Forecast for `now + offset`.
    pub fn after(location: Location, offset: Duration, now: DateTime<Utc>) -> Result<Self> {
        let date_time = now
            .checked_add_signed(offset)
            .ok_or_else(|| out_of_range(format!("now + {offset}"), now))?;
        Self::at(location, date_time, now)
    }

    /// Forecast for an absolute time, which must lie in
    /// `(now, now + MAX_FORECAST_HOURS]`.
    pub fn at(location: Location, date_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self> {
        let in_window = date_time > now
            && now
                .checked_add_signed(Duration::hours(MAX_FORECAST_HOURS))
                .is_none_or(|latest| date_time <= latest);
        if !in_window {
            let requested = date_time.to_rfc3339_opts(SecondsFormat::Secs, true);
            return Err(out_of_range(requested, now));
        }

        Ok(Self {
            location,
            date_time,
        })
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "location": self.location.to_json(),
            "extraComputations": EXTRA_COMPUTATIONS,
            "universalAqi": true,
            "dateTime": self.date_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

fn out_of_range(requested: String, now: DateTime<Utc>) -> AirQualityError {
    let latest = now
        .checked_add_signed(Duration::hours(MAX_FORECAST_HOURS))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "+inf".to_string());

    AirQualityError::ForecastOutOfRange {
        requested,
        earliest: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        latest,
    }
}

/// Color palettes the heatmap tile endpoint can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    UaqiRedGreen,
    UaqiIndigoPersian,
    Pm25IndigoPersian,
    GbrDefra,
    DeuUba,
    CanEc,
    FraAtmo,
    UsAqi,
}

impl MapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::UaqiRedGreen => "UAQI_RED_GREEN",
            MapType::UaqiIndigoPersian => "UAQI_INDIGO_PERSIAN",
            MapType::Pm25IndigoPersian => "PM25_INDIGO_PERSIAN",
            MapType::GbrDefra => "GBR_DEFRA",
            MapType::DeuUba => "DEU_UBA",
            MapType::CanEc => "CAN_EC",
            MapType::FraAtmo => "FRA_ATMO",
            MapType::UsAqi => "US_AQI",
        }
    }

    pub const fn all() -> &'static [MapType] {
        &[
            MapType::UaqiRedGreen,
            MapType::UaqiIndigoPersian,
            MapType::Pm25IndigoPersian,
            MapType::GbrDefra,
            MapType::DeuUba,
            MapType::CanEc,
            MapType::FraAtmo,
            MapType::UsAqi,
        ]
    }
}

impl std::fmt::Display for MapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MapType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let upper = value.to_ascii_uppercase().replace('-', "_");

        MapType::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| {
                let supported: Vec<_> = MapType::all().iter().map(MapType::as_str).collect();
                anyhow::anyhow!(
                    "Unknown map type '{value}'. Supported map types: {}.",
                    supported.join(", ")
                )
            })
    }
}
