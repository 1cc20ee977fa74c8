use std::sync::Arc;

use air_quality_core::{
    AirQualityError, AirQualityResponse, CategoryMapping, CategoryResolver, ConcentrationUnits,
    LocalAqi, ResponseKind,
    options::{category_options_for, pollutant_options_for},
};
use chrono::{TimeZone, Utc};
use serde_json::Value;

fn load(text: &str) -> Value {
    serde_json::from_str(text).expect("fixture must be valid JSON")
}

fn resolver() -> CategoryResolver {
    CategoryResolver::new(Arc::new(CategoryMapping::builtin().expect("bundled table")))
}

#[test]
fn current_conditions_are_normalized() {
    let raw = load(include_str!("fixtures/current_conditions_deu_uba.json"));
    let resp = AirQualityResponse::from_current(&raw, &resolver()).unwrap();

    assert_eq!(resp.kind, ResponseKind::CurrentConditions);
    assert_eq!(resp.date_time, Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());

    let uaqi = &resp.indexes[0];
    assert_eq!(uaqi.code, "uaqi");
    assert_eq!(uaqi.aqi, Some(72));
    assert_eq!(uaqi.category, "good");

    let uba = &resp.indexes[1];
    assert_eq!(uba.code, "deu_uba");
    assert_eq!(uba.category, "good");
    assert_eq!(uba.raw_category, "Good air quality");
    assert_eq!(uba.severity(), Some(1));

    let bands: Vec<_> = category_options_for(uba)
        .iter()
        .map(|e| e.original.as_str())
        .collect();
    assert_eq!(
        bands,
        [
            "Very good air quality",
            "Good air quality",
            "Moderate air quality",
            "Poor air quality",
            "Very poor air quality",
        ]
    );

    let pollutants: Vec<_> = pollutant_options_for(uba)
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(pollutants, ["no2", "o3", "pm10", "pm25"]);
}

#[test]
fn pollutants_keep_units_and_info() {
    let raw = load(include_str!("fixtures/current_conditions_deu_uba.json"));
    let resp = AirQualityResponse::from_current(&raw, &resolver()).unwrap();

    assert_eq!(resp.pollutants.len(), 6);

    let o3 = resp.pollutant("o3").unwrap();
    assert_eq!(o3.full_name, "Ozone");
    assert_eq!(o3.concentration.units, ConcentrationUnits::PartsPerBillion);
    assert!(o3.additional_info.as_ref().unwrap().effects.contains("airways"));

    let pm25 = resp.pollutant("pm25").unwrap();
    assert_eq!(pm25.concentration.units, ConcentrationUnits::MicrogramsPerCubicMeter);
    assert!(pm25.additional_info.is_none());
}

#[test]
fn parsing_twice_gives_equal_results() {
    let raw = load(include_str!("fixtures/current_conditions_deu_uba.json"));
    let r = resolver();

    let first = AirQualityResponse::from_current(&raw, &r).unwrap();
    let second = AirQualityResponse::from_current(&raw, &r).unwrap();
    assert_eq!(first, second);
}

#[test]
fn forecast_reads_first_hour() {
    let raw = load(include_str!("fixtures/forecast_deu_uba.json"));
    let resp = AirQualityResponse::from_forecast(&raw, &resolver()).unwrap();

    assert_eq!(resp.kind, ResponseKind::Forecast);
    assert_eq!(resp.region_code, "de");
    assert_eq!(resp.date_time, Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap());

    let uba = resp.local_aqi().unwrap();
    assert_eq!(uba.category, "moderate");
    assert_eq!(uba.color.blue, 0.0);
}

#[test]
fn empty_indexes_still_parse() {
    let raw = load(include_str!("fixtures/universal_only.json"));
    let resp = AirQualityResponse::from_current(&raw, &resolver()).unwrap();

    assert!(resp.indexes.is_empty());
    assert!(resp.universal_aqi().is_none());
    assert_eq!(
        resp.pollutant("hcho").unwrap().concentration.units,
        ConcentrationUnits::Other("PARTS_PER_TRILLION".to_string())
    );
}

#[test]
fn missing_date_time_is_malformed() {
    let raw = load(include_str!("fixtures/missing_date_time.json"));
    let err = AirQualityResponse::from_current(&raw, &resolver()).unwrap_err();

    match err {
        AirQualityError::MalformedResponse(msg) => assert!(msg.contains("dateTime")),
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[test]
fn unsupported_local_aqi_fails_before_parsing() {
    let mapping = CategoryMapping::builtin().unwrap();
    let err = LocalAqi::resolve(Some("DE"), Some("mars_aqi"), &mapping).unwrap_err();

    assert!(matches!(err, AirQualityError::UnsupportedLocalAqiForCountry { .. }));
}

#[test]
fn per_country_fixtures_resolve() {
    let cases = [
        (
            include_str!("fixtures/specific/gbr_defra.json"),
            "gbr_defra",
            "moderate",
            "Moderate air pollution",
        ),
        (
            include_str!("fixtures/specific/fra_atmo.json"),
            "fra_atmo",
            "degraded",
            "Degraded air quality",
        ),
        (
            include_str!("fixtures/specific/usa_epa.json"),
            "usa_epa",
            "unhealthy_sensitive",
            "Unhealthy for sensitive groups",
        ),
        (
            include_str!("fixtures/specific/can_ec.json"),
            "can_ec",
            "low_risk",
            "Low health risk",
        ),
    ];
    let r = resolver();

    for (text, code, normalized, original) in cases {
        let resp = AirQualityResponse::from_current(&load(text), &r).unwrap();
        let local = resp.local_aqi().unwrap();

        assert_eq!(local.code, code);
        assert_eq!(local.category, normalized, "{code}");
        assert_eq!(local.raw_category, original, "{code}");

        let first_original = r.denormalize(code, &local.category).unwrap();
        assert_eq!(r.normalize(code, first_original).unwrap(), normalized);

        let expected = r.mapping().get(code).unwrap();
        assert_eq!(local.category_options.as_slice(), expected);
    }
}

#[test]
fn substitute_table_changes_resolution() {
    let mapping = CategoryMapping::from_toml_str(
        r#"
        [[index]]
        code = "deu_uba"
        display_name = "LQI (DE)"
        categories = [
            { original = "Good air quality", normalized = "fine" },
            { original = "Very good air quality", normalized = "great" },
        ]
        "#,
    )
    .unwrap();
    let r = CategoryResolver::new(Arc::new(mapping));

    let raw = load(include_str!("fixtures/current_conditions_deu_uba.json"));
    let resp = AirQualityResponse::from_current(&raw, &r).unwrap();

    // uaqi is not in the substitute table.
    assert_eq!(resp.universal_aqi().unwrap().category, "Good air quality");
    assert_eq!(resp.local_aqi().unwrap().category, "fine");
}
