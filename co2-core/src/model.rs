use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the user appears to be, as reported by a geolocation provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub country_code_iso3: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

impl Location {
    /// `"{city}, {country}"` when both are known, else the country, else
    /// `"Unknown Location"`.
    pub fn label(&self) -> String {
        match (non_empty(&self.city), non_empty(&self.country)) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (_, Some(country)) => country.to_string(),
            _ => "Unknown Location".to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Provenance of a grid intensity value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntensitySource {
    Dataset { name: String },
    NoLocationData,
    GlobalAverage,
}

impl fmt::Display for IntensitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensitySource::Dataset { name } => f.write_str(name),
            IntensitySource::NoLocationData => f.write_str("Global Average (No location data)"),
            IntensitySource::GlobalAverage => f.write_str("Global Average"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridIntensityResult {
    /// gCO₂/kWh, always finite and positive.
    pub intensity: f64,
    pub year: u16,
    pub source: IntensitySource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub source: String,
    pub year: u16,
}

/// One rendered estimate.
#[derive(Debug, Clone, Serialize)]
pub struct EmissionsReport {
    pub co2_grams: f64,
    pub grid_intensity: f64,
    pub energy_kwh: f64,
    pub bytes: u64,
    pub location_label: String,
    /// Absent on the global-average fallback.
    pub provenance: Option<Provenance>,
    pub methodology: String,
    pub computed_at: DateTime<Utc>,
}

impl fmt::Display for EmissionsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🌍 CO₂ Emissions ({}):", self.location_label)?;
        writeln!(f, "• Total CO₂: {:.6} g", self.co2_grams)?;
        writeln!(f, "• Grid Intensity: {:.2} gCO₂/kWh", self.grid_intensity)?;
        writeln!(f, "• Energy: {:.8} kWh", self.energy_kwh)?;
        write!(f, "• Code Size: {} bytes", self.bytes)?;
        if let Some(p) = &self.provenance {
            write!(f, "\n• Data Source: {} ({})", p.source, p.year)?;
        }
        Ok(())
    }
}
