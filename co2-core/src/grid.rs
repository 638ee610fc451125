use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::model::{GridIntensityResult, IntensitySource};

/// Global average grid intensity in gCO₂/kWh.
pub const GLOBAL_AVERAGE_INTENSITY: f64 = 494.0;
pub const GLOBAL_AVERAGE_YEAR: u16 = 2024;

/// Ember Climate annual averages per country, gCO₂/kWh.
const EMBER_2022_JSON: &str = include_str!("../data/ember-2022.json");

/// Country intensity dataset keyed by ISO alpha-3 code.
#[derive(Debug, Clone)]
pub struct IntensityTable {
    name: String,
    year: u16,
    entries: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    name: String,
    year: u16,
    data: HashMap<String, f64>,
}

impl IntensityTable {
    /// Embedded Ember Climate 2022 dataset. An unreadable embedded dataset
    /// leaves the table empty, so every lookup yields the global average.
    pub fn builtin() -> Self {
        Self::from_json(EMBER_2022_JSON).unwrap_or_else(|err| {
            tracing::error!(error = %err, "embedded intensity dataset is invalid");
            Self::from_entries("Ember Climate", 2022, std::iter::empty::<(&str, f64)>())
        })
    }

    pub fn from_entries<I, K>(name: impl Into<String>, year: u16, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        Self {
            name: name.into(),
            year,
            entries: entries
                .into_iter()
                .map(|(k, v)| (normalize(k.as_ref()), v))
                .collect(),
        }
    }

    /// Load a JSON dataset of the form
    /// `{ "name": "...", "year": 2023, "data": { "FRA": 56.0 } }`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read intensity dataset: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Failed to load intensity dataset: {}", path.display()))
    }

    /// Parse a JSON dataset, rejecting values that are not finite and positive.
    pub fn from_json(contents: &str) -> Result<Self> {
        let parsed: DatasetFile =
            serde_json::from_str(contents).context("Failed to parse intensity dataset")?;

        if let Some((code, value)) = parsed.data.iter().find(|(_, v)| !is_usable(**v)) {
            bail!("Intensity dataset '{}' has an invalid value for {code}: {value}", parsed.name);
        }

        Ok(Self::from_entries(parsed.name, parsed.year, parsed.data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, iso3: &str) -> Option<f64> {
        self.entries.get(iso3).copied()
    }
}

impl Default for IntensityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Maps a country to its grid intensity, falling back to the global average.
#[derive(Debug, Clone, Default)]
pub struct GridIntensityLookup {
    table: IntensityTable,
}

impl GridIntensityLookup {
    pub fn new(table: IntensityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &IntensityTable {
        &self.table
    }

    /// Never fails: anything short of a usable dataset entry yields the
    /// global average.
    pub fn lookup(&self, country_code_iso3: Option<&str>) -> GridIntensityResult {
        let Some(code) = country_code_iso3.map(str::trim).filter(|c| !c.is_empty()) else {
            tracing::info!("no country code provided, using global average");
            return global_average(IntensitySource::NoLocationData);
        };

        let code = normalize(code);
        match self.table.get(&code) {
            Some(intensity) if is_usable(intensity) => GridIntensityResult {
                intensity,
                year: self.table.year,
                source: IntensitySource::Dataset { name: self.table.name.clone() },
            },
            Some(intensity) => {
                tracing::warn!(%code, intensity, "unusable intensity in dataset, using global average");
                global_average(IntensitySource::GlobalAverage)
            }
            None => {
                tracing::info!(%code, "no intensity data for country, using global average");
                global_average(IntensitySource::GlobalAverage)
            }
        }
    }
}

pub fn global_average(source: IntensitySource) -> GridIntensityResult {
    GridIntensityResult {
        intensity: GLOBAL_AVERAGE_INTENSITY,
        year: GLOBAL_AVERAGE_YEAR,
        source,
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn is_usable(intensity: f64) -> bool {
    intensity.is_finite() && intensity > 0.0
}
