//! Derived lists for pickers: which severities and pollutants an index can
//! report, without another round trip to the service.

use std::collections::{BTreeMap, BTreeSet};

use crate::{category::AqiCategoryEntry, model::IndexEntry};

/// Bands this entry's index can report, least severe first.
pub fn category_options_for(entry: &IndexEntry) -> &[AqiCategoryEntry] {
    &entry.category_options
}

pub fn pollutant_options_for(entry: &IndexEntry) -> &BTreeSet<String> {
    &entry.pollutant_options
}

/// Normalized category -> the first original label seen for it.
///
/// One possible aggregation over [`crate::CategoryMapping::get_all`]; callers
/// that need per-index labels should use `CategoryMapping::get`.
pub fn first_seen_by_normalized<'a>(
    entries: impl IntoIterator<Item = &'a AqiCategoryEntry>,
) -> BTreeMap<&'a str, &'a str> {
    let mut seen = BTreeMap::new();
    for entry in entries {
        seen.entry(entry.normalized.as_str()).or_insert(entry.original.as_str());
    }
    seen
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{AirQualityResponse, CategoryMapping, CategoryResolver};

    fn parsed() -> AirQualityResponse {
        let raw = json!({
            "dateTime": "2025-06-01T12:00:00Z",
            "regionCode": "gb",
            "indexes": [
                {
                    "code": "uaqi",
                    "displayName": "Universal AQI",
                    "aqi": 64,
                    "category": "Good air quality"
                },
                {
                    "code": "gbr_defra",
                    "displayName": "DAQI (UK)",
                    "aqi": 3,
                    "category": "Low air pollution"
                }
            ],
            "pollutants": []
        });
        let resolver = CategoryResolver::new(Arc::new(CategoryMapping::builtin().unwrap()));
        AirQualityResponse::from_current(&raw, &resolver).unwrap()
    }

    #[test]
    fn category_options_follow_table_order() {
        let resp = parsed();
        let labels: Vec<_> = category_options_for(resp.local_aqi().unwrap())
            .iter()
            .map(|e| e.original.as_str())
            .collect();

        assert_eq!(
            labels,
            [
                "Low air pollution",
                "Moderate air pollution",
                "High air pollution",
                "Very high air pollution"
            ]
        );
    }

    #[test]
    fn pollutant_options_come_from_the_index() {
        let resp = parsed();
        let uaqi = pollutant_options_for(resp.universal_aqi().unwrap());

        assert!(uaqi.contains("co"));
        assert!(uaqi.contains("so2"));
        assert!(!pollutant_options_for(resp.local_aqi().unwrap()).contains("co"));
    }

    #[test]
    fn repeated_calls_agree() {
        let resp = parsed();
        let entry = resp.local_aqi().unwrap();
        assert_eq!(category_options_for(entry), category_options_for(entry));
        assert_eq!(pollutant_options_for(entry), pollutant_options_for(entry));
    }

    #[test]
    fn first_seen_keeps_earliest_original() {
        let mapping = CategoryMapping::builtin().unwrap();
        let seen = first_seen_by_normalized(mapping.get_all());

        assert_eq!(seen["good"], "Good air quality");
        assert_eq!(seen["fair"], "Average air quality");
        assert_eq!(seen["low_pollution"], "Low air pollution");
    }
}
