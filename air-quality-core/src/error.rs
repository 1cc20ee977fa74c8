use thiserror::Error;

/// Every failure the library can report.
///
/// Parsing and resolution failures are raised locally; transport failures
/// come from [`crate::client::GoogleAirQualityClient`] and carry the
/// service's own message where one was returned.
#[derive(Debug, Error)]
pub enum AirQualityError {
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unknown air quality index '{0}'")]
    UnknownIndex(String),

    #[error("unknown category '{category}' for index '{index}'")]
    UnknownCategory { index: String, category: String },

    #[error("invalid local AQI configuration: {0}")]
    InvalidAqiConfiguration(String),

    #[error("local AQI '{aqi}' is not supported for region '{region_code}'")]
    UnsupportedLocalAqiForCountry { region_code: String, aqi: String },

    #[error("invalid category table: {0}")]
    InvalidCategoryTable(String),

    #[error("forecast time {requested} is outside the supported window ({earliest} .. {latest})")]
    ForecastOutOfRange {
        requested: String,
        earliest: String,
        latest: String,
    },

    #[error("air quality API error: {0}")]
    Api(String),

    #[error("authentication with the air quality API failed: {0}")]
    Auth(String),

    #[error("access to the air quality API is forbidden: {0}")]
    ApiForbidden(String),

    #[error("no air quality data for this location: {0}")]
    NoDataForLocation(String),
}

pub type Result<T> = std::result::Result<T, AirQualityError>;
