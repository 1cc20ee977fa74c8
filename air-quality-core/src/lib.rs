//! Core library for the `air-quality` CLI.
//!
//! This crate defines:
//! - The per-country category table and the resolver over it
//! - Typed current-conditions and forecast responses built from raw JSON
//! - Request validation and the HTTP client for the Google Air Quality API
//! - Configuration handling
//!
//! Parsing and resolution never touch the network; only [`client`] does.

pub mod category;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod options;
pub mod request;
pub mod resolver;
mod response;

pub use category::{AqiCategoryEntry, CategoryMapping, IndexDefinition};
pub use client::{AirQualitySource, GoogleAirQualityClient};
pub use config::{Config, LocalAqiConfig};
pub use error::{AirQualityError, Result};
pub use model::{
    AirQualityResponse, Color, Concentration, ConcentrationUnits, IndexEntry, PollutantEntry,
    ResponseKind, UNIVERSAL_AQI,
};
pub use request::{CurrentConditionsRequest, ForecastRequest, LocalAqi, Location, MapType};
pub use resolver::CategoryResolver;
