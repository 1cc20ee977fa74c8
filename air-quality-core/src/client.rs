use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, header::REFERER};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::Config,
    error::{AirQualityError, Result},
    model::AirQualityResponse,
    request::{CurrentConditionsRequest, ForecastRequest, Location, MapType},
    resolver::CategoryResolver,
};

pub const DEFAULT_BASE_URL: &str = "https://airquality.googleapis.com/v1";
pub const DEFAULT_GEOCODING_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const NO_DATA_MARKER: &str = "Information is unavailable for this location";

#[async_trait]
pub trait AirQualitySource: Send + Sync + Debug {
    async fn current_conditions(
        &self,
        request: &CurrentConditionsRequest,
    ) -> Result<AirQualityResponse>;

    async fn forecast(&self, request: &ForecastRequest) -> Result<AirQualityResponse>;
}

/// API-key client for the Google Air Quality and Geocoding endpoints.
#[derive(Debug, Clone)]
pub struct GoogleAirQualityClient {
    api_key: String,
    referrer: Option<String>,
    base_url: String,
    geocoding_url: String,
    resolver: CategoryResolver,
    http: Client,
}

impl GoogleAirQualityClient {
    pub fn new(api_key: String, resolver: CategoryResolver) -> Self {
        Self {
            api_key,
            referrer: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            resolver,
            http: Client::new(),
        }
    }

    /// Send a `Referer` header, for keys restricted to HTTP referrers.
    pub fn with_referrer(mut self, referrer: Option<String>) -> Self {
        self.referrer = referrer;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_geocoding_url(mut self, geocoding_url: impl Into<String>) -> Self {
        self.geocoding_url = geocoding_url.into();
        self
    }

    pub fn resolver(&self) -> &CategoryResolver {
        &self.resolver
    }

    /// PNG tile of the given heatmap at `zoom/x/y`.
    pub async fn heatmap_tile(
        &self,
        map_type: MapType,
        zoom: u32,
        x: u32,
        y: u32,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/mapTypes/{map_type}/heatmapTiles/{zoom}/{x}/{y}", self.base_url);
        debug!(%url, "requesting heatmap tile");

        let res = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| AirQualityError::Api(format!("failed to request heatmap tile: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| AirQualityError::Api(format!("failed to read heatmap tile: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Formatted address of the closest match, if the service knows one.
    pub async fn reverse_geocode(&self, location: Location) -> Result<Option<String>> {
        let latlng = format!("{},{}", location.latitude, location.longitude);
        debug!(%latlng, "reverse geocoding");

        let req = self
            .http
            .get(&self.geocoding_url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())]);
        let body = self.send(self.with_referrer_header(req), "geocode").await?;

        parse_geocode(&body)
    }

    async fn post_json(&self, endpoint: &str, payload: &Value) -> Result<Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%url, "posting air quality request");

        self.send(self.authorized(self.http.post(&url)).json(payload), endpoint).await
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Value> {
        let res = req
            .send()
            .await
            .map_err(|e| AirQualityError::Api(format!("failed to send {what} request: {e}")))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            AirQualityError::Api(format!("failed to read {what} response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AirQualityError::MalformedResponse(format!("{what} response is not JSON: {e}"))
        })
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        self.with_referrer_header(req.query(&[("key", self.api_key.as_str())]))
    }

    fn with_referrer_header(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.referrer {
            Some(referrer) => req.header(REFERER, referrer),
            None => req,
        }
    }
}

#[async_trait]
impl AirQualitySource for GoogleAirQualityClient {
    async fn current_conditions(
        &self,
        request: &CurrentConditionsRequest,
    ) -> Result<AirQualityResponse> {
        let body = self.post_json("currentConditions:lookup", &request.to_payload()).await?;
        AirQualityResponse::from_current(&body, &self.resolver)
    }

    async fn forecast(&self, request: &ForecastRequest) -> Result<AirQualityResponse> {
        let body = self.post_json("forecast:lookup", &request.to_payload()).await?;
        AirQualityResponse::from_forecast(&body, &self.resolver)
    }
}

/// Build a client from stored configuration.
pub fn client_from_config(
    config: &Config,
    resolver: CategoryResolver,
) -> anyhow::Result<GoogleAirQualityClient> {
    let api_key = config.require_api_key()?;
    Ok(GoogleAirQualityClient::new(api_key.to_owned(), resolver)
        .with_referrer(config.referrer.clone()))
}

/// Shorthand for a client over the table named in `config`.
pub fn source_from_config(config: &Config) -> anyhow::Result<Box<dyn AirQualitySource>> {
    let mapping = config.category_mapping()?;
    let client = client_from_config(config, CategoryResolver::new(Arc::new(mapping)))?;
    Ok(Box::new(client))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a failed HTTP exchange to an error variant.
pub fn classify_error(status: StatusCode, body: &str) -> AirQualityError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| truncate_body(body));

    match status {
        StatusCode::UNAUTHORIZED => AirQualityError::Auth(message),
        StatusCode::FORBIDDEN => AirQualityError::ApiForbidden(message),
        StatusCode::BAD_REQUEST if message.contains(NO_DATA_MARKER) => {
            AirQualityError::NoDataForLocation(message)
        }
        _ => AirQualityError::Api(format!("status {status}: {message}")),
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

fn parse_geocode(body: &Value) -> Result<Option<String>> {
    let parsed = GeocodeResponse::deserialize(body)
        .map_err(|e| AirQualityError::MalformedResponse(format!("geocode: {e}")))?;

    // The Geocoding API reports failures with HTTP 200 and a `status`.
    let message = parsed.error_message.unwrap_or_else(|| parsed.status.clone());
    match parsed.status.as_str() {
        "OK" | "ZERO_RESULTS" => {
            Ok(parsed.results.into_iter().next().map(|r| r.formatted_address))
        }
        "REQUEST_DENIED" => Err(AirQualityError::ApiForbidden(message)),
        status => Err(AirQualityError::Api(format!("geocode status {status}: {message}"))),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unauthorized_is_auth_error() {
        let body = json!({
            "error": {
                "code": 401,
                "message": "API key not valid.",
                "status": "UNAUTHENTICATED"
            }
        })
        .to_string();
        let err = classify_error(StatusCode::UNAUTHORIZED, &body);
        assert!(matches!(err, AirQualityError::Auth(ref m) if m == "API key not valid."));
    }

    #[test]
    fn forbidden_is_forbidden_error() {
        let err = classify_error(StatusCode::FORBIDDEN, "nope");
        assert!(matches!(err, AirQualityError::ApiForbidden(_)));
    }

    #[test]
    fn unavailable_location_is_no_data() {
        let body = json!({
            "error": {
                "code": 400,
                "message": concat!(
                    "Information is unavailable for this location. ",
                    "Please try a different location."
                ),
                "status": "INVALID_ARGUMENT"
            }
        })
        .to_string();

        let err = classify_error(StatusCode::BAD_REQUEST, &body);
        assert!(matches!(err, AirQualityError::NoDataForLocation(_)));
    }

    #[test]
    fn other_bad_request_is_api_error() {
        let body = r#"{"error":{"message":"Invalid JSON payload received."}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert!(err.to_string().contains("Invalid JSON payload"));
        assert!(matches!(err, AirQualityError::Api(_)));
    }

    #[test]
    fn long_plain_body_is_truncated() {
        let body = "x".repeat(500);
        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(err.to_string().ends_with("..."));
    }

    #[test]
    fn geocode_takes_first_result() {
        let body = json!({
            "results": [
                { "formatted_address": "Pariser Platz, 10117 Berlin, Germany" },
                { "formatted_address": "Berlin, Germany" }
            ],
            "status": "OK"
        });
        assert_eq!(
            parse_geocode(&body).unwrap().as_deref(),
            Some("Pariser Platz, 10117 Berlin, Germany")
        );
    }

    #[test]
    fn geocode_without_results_is_none() {
        let body = json!({ "results": [], "status": "ZERO_RESULTS" });
        assert_eq!(parse_geocode(&body).unwrap(), None);
    }

    #[test]
    fn geocode_request_denied_is_forbidden() {
        let body = json!({
            "results": [],
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        });

        let err = parse_geocode(&body).unwrap_err();
        assert!(matches!(
            err,
            AirQualityError::ApiForbidden(ref m) if m == "The provided API key is invalid."
        ));
    }

    #[test]
    fn geocode_quota_and_bad_request_are_api_errors() {
        for status in ["OVER_QUERY_LIMIT", "INVALID_REQUEST", "UNKNOWN_ERROR"] {
            let body = json!({ "results": [], "status": status });

            let err = parse_geocode(&body).unwrap_err();
            assert!(matches!(err, AirQualityError::Api(ref m) if m.contains(status)), "{status}");
        }
    }

    #[test]
    fn geocode_without_status_is_malformed() {
        let body = json!({ "results": [] });
        let err = parse_geocode(&body).unwrap_err();
        assert!(matches!(err, AirQualityError::MalformedResponse(_)));
    }

    #[test]
    fn client_from_config_requires_api_key() {
        let cfg = Config::default();
        let resolver = CategoryResolver::new(Arc::new(cfg.category_mapping().unwrap()));
        let err = client_from_config(&cfg, resolver).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[tokio::test]
    async fn unreachable_service_is_api_error() {
        let mapping = crate::CategoryMapping::builtin().unwrap();
        let resolver = CategoryResolver::new(Arc::new(mapping));
        let client = GoogleAirQualityClient::new("KEY".into(), resolver)
            .with_base_url("http://127.0.0.1:9/v1");

        let request = CurrentConditionsRequest::new(Location::new(52.52, 13.4));
        let err = client.current_conditions(&request).await.unwrap_err();
        assert!(matches!(
            err,
            AirQualityError::Api(ref m) if m.contains("currentConditions:lookup")
        ));
    }

    #[test]
    fn source_from_config_works_when_configured() {
        let cfg = Config {
            api_key: Some("KEY".into()),
            ..Config::default()
        };
        assert!(source_from_config(&cfg).is_ok());
    }
}
