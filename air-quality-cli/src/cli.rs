use std::{path::PathBuf, sync::Arc};

use air_quality_core::{
    AirQualityResponse, AirQualitySource, CategoryMapping, CategoryResolver, Config,
    CurrentConditionsRequest, ForecastRequest, GoogleAirQualityClient, LocalAqi, LocalAqiConfig,
    Location, MapType, client::client_from_config, request::MAX_FORECAST_HOURS,
};
use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Select, Text};
use tracing::{debug, warn};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "air-quality", version, about = "Air quality CLI")]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude; defaults to the configured location.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude; defaults to the configured location.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(&self, config: &Config) -> Result<Location> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Location::new(lat, lon)),
            _ => config.require_location(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store API key, default location and local AQI.
    Configure,

    /// Show current air quality.
    Current {
        #[command(flatten)]
        location: LocationArgs,

        /// Region code for a custom local AQI, e.g. "DE".
        #[arg(long, requires = "local_aqi")]
        region: Option<String>,

        /// Custom local AQI code, e.g. "usa_epa_nowcast".
        #[arg(long, requires = "region")]
        local_aqi: Option<String>,

        /// Print the parsed response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the air quality forecast some hours ahead.
    Forecast {
        #[command(flatten)]
        location: LocationArgs,

        /// Hours from now (1-96).
        #[arg(long, default_value_t = 1)]
        hours: i64,

        #[arg(long)]
        json: bool,
    },

    /// List the categories and pollutants an index can report.
    Categories {
        /// Index code, e.g. "deu_uba".
        index: String,
    },

    /// List every known index code.
    Indexes,

    /// Download one heatmap tile as PNG.
    Heatmap {
        /// Map type, e.g. "UAQI_RED_GREEN".
        map_type: String,
        zoom: u32,
        x: u32,
        y: u32,

        #[arg(short, long, default_value = "tile.png")]
        output: PathBuf,
    },

    /// Look up the address for a location.
    Geocode {
        #[command(flatten)]
        location: LocationArgs,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config)?,
            Command::Current { location, region, local_aqi, json } => {
                let mapping = config.category_mapping()?;
                let local = match (&region, &local_aqi) {
                    (None, None) => config.local_aqi(&mapping)?,
                    _ => LocalAqi::resolve(region.as_deref(), local_aqi.as_deref(), &mapping)?,
                };
                let request =
                    CurrentConditionsRequest::new(location.resolve(&config)?).with_local_aqi(local);

                let client = build_client(&config, mapping)?;
                let resp = client.current_conditions(&request).await?;
                print_response(&client, &resp, request.location, json).await?;
            }
            Command::Forecast { location, hours, json } => {
                let request = ForecastRequest::after(
                    location.resolve(&config)?,
                    forecast_offset(hours)?,
                    Utc::now(),
                )?;

                let client = build_client(&config, config.category_mapping()?)?;
                let resp = client.forecast(&request).await?;
                print_response(&client, &resp, request.location, json).await?;
            }
            Command::Categories { index } => {
                let mapping = config.category_mapping()?;
                let def = mapping.index(&index).map_err(|e| {
                    anyhow!("{e}.\nKnown indexes: {}", known_codes(&mapping))
                })?;
                print!("{}", render::index_definition(def)?);
            }
            Command::Indexes => {
                let mapping = config.category_mapping()?;
                for def in mapping.definitions() {
                    let regions = if def.regions.is_empty() {
                        "any".to_string()
                    } else {
                        def.regions.join(",")
                    };
                    println!("{:<16} {:<20} {regions}", def.code, def.display_name);
                }
            }
            Command::Heatmap { map_type, zoom, x, y, output } => {
                let map_type = MapType::try_from(map_type.as_str())?;
                let client = build_client(&config, config.category_mapping()?)?;

                let png = client.heatmap_tile(map_type, zoom, x, y).await?;
                std::fs::write(&output, &png)
                    .with_context(|| format!("Failed to write tile: {}", output.display()))?;
                println!("Wrote {} bytes to {}", png.len(), output.display());
            }
            Command::Geocode { location } => {
                let location = location.resolve(&config)?;
                let client = build_client(&config, config.category_mapping()?)?;

                match client.reverse_geocode(location).await? {
                    Some(address) => println!("{address}"),
                    None => println!(
                        "No address found for {}, {}",
                        location.latitude, location.longitude
                    ),
                }
            }
        }

        Ok(())
    }
}

fn forecast_offset(hours: i64) -> Result<Duration> {
    if !(1..=MAX_FORECAST_HOURS).contains(&hours) {
        return Err(anyhow!("--hours must be between 1 and {MAX_FORECAST_HOURS}, got {hours}"));
    }
    Duration::try_hours(hours).ok_or_else(|| anyhow!("--hours {hours} is out of range"))
}

fn build_client(config: &Config, mapping: CategoryMapping) -> Result<GoogleAirQualityClient> {
    client_from_config(config, CategoryResolver::new(Arc::new(mapping)))
}

async fn print_response(
    client: &GoogleAirQualityClient,
    resp: &AirQualityResponse,
    location: Location,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resp)?);
        return Ok(());
    }

    let place = match client.reverse_geocode(location).await {
        Ok(place) => place,
        Err(err) => {
            warn!(%err, "reverse geocoding failed");
            None
        }
    };

    print!("{}", render::response(resp, place.as_deref())?);
    Ok(())
}

fn known_codes(mapping: &CategoryMapping) -> String {
    mapping.get_all_index_codes().into_iter().collect::<Vec<_>>().join(", ")
}

fn configure(mut config: Config) -> Result<()> {
    let api_key = Password::new("Google Maps Platform API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    config.set_api_key(api_key.trim().to_string());

    let referrer = Text::new("HTTP referrer (leave empty if the key is unrestricted):")
        .with_default(config.referrer.as_deref().unwrap_or(""))
        .prompt()?;
    config.referrer = Some(referrer.trim().to_string()).filter(|r| !r.is_empty());

    let latitude = CustomType::<f64>::new("Default latitude (Esc to skip):").prompt_skippable()?;
    if let Some(latitude) = latitude {
        let longitude = CustomType::<f64>::new("Default longitude:").prompt()?;
        config.location = Some(Location::new(latitude, longitude));
    }

    let mapping = config.category_mapping()?;
    let mut choices = vec!["(region default)".to_string()];
    choices.extend(mapping.get_all_index_codes().into_iter().map(str::to_string));

    let choice = Select::new("Custom local AQI:", choices).prompt()?;
    if choice == "(region default)" {
        config.local_aqi = None;
    } else {
        let region = Text::new("Region code (e.g. DE):").prompt()?;
        let local = LocalAqi::new(&region, &choice, &mapping)?;
        debug!(region = %local.region_code, aqi = %local.aqi, "validated local AQI");
        config.local_aqi = Some(LocalAqiConfig {
            region_code: local.region_code,
            custom_local_aqi: local.aqi,
        });
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}
