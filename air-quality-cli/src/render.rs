use std::fmt::{self, Write};

use air_quality_core::{AirQualityResponse, IndexDefinition, IndexEntry, ResponseKind};

pub fn response(resp: &AirQualityResponse, place: Option<&str>) -> Result<String, fmt::Error> {
    let mut out = String::new();

    let heading = match resp.kind {
        ResponseKind::CurrentConditions => "Current air quality",
        ResponseKind::Forecast => "Forecast air quality",
    };
    writeln!(
        out,
        "{heading} ({}) at {}",
        resp.region_code.to_uppercase(),
        resp.date_time.format("%Y-%m-%d %H:%M UTC")
    )?;
    if let Some(place) = place {
        writeln!(out, "{place}")?;
    }

    if resp.indexes.is_empty() {
        writeln!(out, "\nNo index reported for this location.")?;
    }
    for index in &resp.indexes {
        writeln!(out)?;
        write_index_entry(&mut out, index)?;
    }

    if !resp.pollutants.is_empty() {
        writeln!(out, "\nPollutants:")?;
        for p in &resp.pollutants {
            writeln!(
                out,
                "  {:<6} {:>9.2} {:<6} {}",
                p.display_name, p.concentration.value, p.concentration.units, p.full_name
            )?;
        }
    }

    Ok(out)
}

fn write_index_entry(out: &mut String, index: &IndexEntry) -> fmt::Result {
    let aqi = index
        .aqi_display
        .clone()
        .or_else(|| index.aqi.map(|v| v.to_string()));
    write!(out, "{} [{}]", index.display_name, index.code)?;
    if let Some(aqi) = aqi {
        write!(out, ": {aqi}")?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "  Category: {} ({}) {}",
        index.raw_category,
        index.category,
        index.color.to_hex()
    )?;
    if let Some(dominant) = &index.dominant_pollutant {
        writeln!(out, "  Dominant pollutant: {dominant}")?;
    }

    if let Some(position) = index.severity() {
        writeln!(out, "  Severity: {} of {}", position + 1, index.category_options.len())?;
    }

    Ok(())
}

pub fn index_definition(def: &IndexDefinition) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "{} [{}]", def.display_name, def.code)?;
    let regions = if def.regions.is_empty() {
        "any".to_string()
    } else {
        def.regions.join(", ")
    };
    writeln!(out, "  Regions: {regions}")?;
    writeln!(out, "  Pollutants: {}", def.pollutants.join(", "))?;
    writeln!(out, "  Categories (least to most severe):")?;
    for (i, entry) in def.categories.iter().enumerate() {
        writeln!(out, "    {}. {} -> {}", i + 1, entry.original, entry.normalized)?;
    }

    Ok(out)
}
