use chrono::Utc;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::{CriticalError, EstimateError},
    grid::GLOBAL_AVERAGE_INTENSITY,
    model::{EmissionsReport, GridIntensityResult, Provenance},
};

pub mod swd;

pub use swd::{SegmentIntensity, SustainableWebDesign, TraceOptions, TraceResult};

/// Average energy per transferred gigabyte (2^30 bytes), kWh.
pub const KWH_PER_GIB: f64 = 0.194;
const BYTES_PER_GIB: f64 = 1_073_741_824.0;

pub const FALLBACK_LABEL: &str = "Global Average";

/// Energy estimate for `bytes`, independent of grid intensity and model path.
pub fn energy_kwh(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB * KWH_PER_GIB
}

/// A byte-based emissions model.
pub trait EmissionsModel: Debug + Send + Sync {
    /// Short name and version, e.g. "swd v4".
    fn methodology(&self) -> String;

    /// Grams of CO₂ for `bytes` at the global average intensity.
    fn per_byte(&self, bytes: u64) -> Result<f64, EstimateError>;

    fn per_byte_trace(
        &self,
        bytes: u64,
        green: bool,
        options: &TraceOptions,
    ) -> Result<TraceResult, EstimateError>;
}

impl EmissionsModel for SustainableWebDesign {
    fn methodology(&self) -> String {
        SustainableWebDesign::methodology(self)
    }

    fn per_byte(&self, bytes: u64) -> Result<f64, EstimateError> {
        SustainableWebDesign::per_byte(self, bytes)
    }

    fn per_byte_trace(
        &self,
        bytes: u64,
        green: bool,
        options: &TraceOptions,
    ) -> Result<TraceResult, EstimateError> {
        SustainableWebDesign::per_byte_trace(self, bytes, green, options)
    }
}

#[derive(Debug, Clone)]
pub struct EmissionsEstimator {
    model: Arc<dyn EmissionsModel>,
    green: bool,
}

impl Default for EmissionsEstimator {
    fn default() -> Self {
        Self::new(SustainableWebDesign)
    }
}

impl EmissionsEstimator {
    pub fn new(model: impl EmissionsModel + 'static) -> Self {
        Self { model: Arc::new(model), green: false }
    }

    /// Treat the data center as running on renewable energy.
    pub fn with_green_hosting(mut self, green: bool) -> Self {
        self.green = green;
        self
    }

    /// Estimate using one regional intensity for device, data center and
    /// network alike.
    pub fn estimate(
        &self,
        bytes: u64,
        grid: &GridIntensityResult,
        location_label: impl Into<String>,
    ) -> Result<EmissionsReport, EstimateError> {
        let options = TraceOptions { grid_intensity: SegmentIntensity::uniform(grid.intensity) };
        let trace = self.model.per_byte_trace(bytes, self.green, &options)?;

        Ok(EmissionsReport {
            co2_grams: trace.co2,
            grid_intensity: grid.intensity,
            energy_kwh: energy_kwh(bytes),
            bytes,
            location_label: location_label.into(),
            provenance: Some(Provenance { source: grid.source.to_string(), year: grid.year }),
            methodology: self.model.methodology(),
            computed_at: Utc::now(),
        })
    }

    /// Global-average estimate that needs nothing but the byte count.
    pub fn fallback(&self, bytes: u64) -> Result<EmissionsReport, CriticalError> {
        let co2_grams = self.model.per_byte(bytes).map_err(CriticalError)?;

        Ok(EmissionsReport {
            co2_grams,
            grid_intensity: GLOBAL_AVERAGE_INTENSITY,
            energy_kwh: energy_kwh(bytes),
            bytes,
            location_label: FALLBACK_LABEL.to_string(),
            provenance: None,
            methodology: self.model.methodology(),
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{grid::global_average, model::IntensitySource};

    /// Model whose traced and/or plain estimates always fail.
    #[derive(Debug, Default)]
    pub(crate) struct BrokenModel {
        pub trace_fails: bool,
        pub plain_fails: bool,
    }

    impl EmissionsModel for BrokenModel {
        fn methodology(&self) -> String {
            "broken v0".to_string()
        }

        fn per_byte(&self, bytes: u64) -> Result<f64, EstimateError> {
            if self.plain_fails {
                return Err(EstimateError::NonFinite);
            }
            SustainableWebDesign.per_byte(bytes)
        }

        fn per_byte_trace(
            &self,
            bytes: u64,
            green: bool,
            options: &TraceOptions,
        ) -> Result<TraceResult, EstimateError> {
            if self.trace_fails {
                return Err(EstimateError::InvalidIntensity(f64::INFINITY));
            }
            SustainableWebDesign.per_byte_trace(bytes, green, options)
        }
    }

    fn ember(intensity: f64) -> GridIntensityResult {
        GridIntensityResult {
            intensity,
            year: 2022,
            source: IntensitySource::Dataset { name: "Ember Climate".into() },
        }
    }

    #[test]
    fn energy_is_linear_in_bytes() {
        for bytes in [0_u64, 1, 500, 1024, 1 << 30, 7_777_777] {
            assert_eq!(energy_kwh(bytes), bytes as f64 / 1_073_741_824.0 * 0.194);
        }
        assert_eq!(energy_kwh(1 << 30), 0.194);
    }

    #[test]
    fn energy_does_not_depend_on_intensity_or_path() {
        let estimator = EmissionsEstimator::default();
        let low = estimator.estimate(4096, &ember(20.0), "A").unwrap();
        let high = estimator.estimate(4096, &ember(900.0), "B").unwrap();
        let fallback = estimator.fallback(4096).unwrap();

        assert_eq!(low.energy_kwh, high.energy_kwh);
        assert_eq!(low.energy_kwh, fallback.energy_kwh);
        assert!(low.co2_grams < high.co2_grams);
    }

    #[test]
    fn estimate_carries_dataset_provenance() {
        let report = EmissionsEstimator::default()
            .estimate(1024, &ember(85.0), "Paris, France")
            .unwrap();

        assert_eq!(report.grid_intensity, 85.0);
        assert_eq!(report.bytes, 1024);
        assert_eq!(report.location_label, "Paris, France");
        assert_eq!(
            report.provenance,
            Some(Provenance { source: "Ember Climate".into(), year: 2022 })
        );
        assert_eq!(report.methodology, "swd v4");
    }

    #[test]
    fn estimate_labels_global_average_source() {
        let report = EmissionsEstimator::default()
            .estimate(10, &global_average(IntensitySource::NoLocationData), "Unknown Location")
            .unwrap();

        let provenance = report.provenance.expect("provenance");
        assert_eq!(provenance.source, "Global Average (No location data)");
        assert_eq!(provenance.year, 2024);
    }

    #[test]
    fn estimate_rejects_invalid_intensity() {
        let err = EmissionsEstimator::default()
            .estimate(10, &ember(f64::NAN), "x")
            .unwrap_err();
        assert!(matches!(err, EstimateError::InvalidIntensity(_)));
    }

    #[test]
    fn fallback_uses_plain_model_and_global_label() {
        let estimator = EmissionsEstimator::default();
        let report = estimator.fallback(500).unwrap();

        assert_eq!(report.co2_grams, SustainableWebDesign.per_byte(500).unwrap());
        assert_eq!(report.grid_intensity, 494.0);
        assert_eq!(report.location_label, "Global Average");
        assert!(report.provenance.is_none());
        assert!(report.to_string().contains("• Grid Intensity: 494.00 gCO₂/kWh"));
    }

    #[test]
    fn fallback_ignores_green_hosting() {
        let grey = EmissionsEstimator::default().fallback(2048).unwrap();
        let green = EmissionsEstimator::default().with_green_hosting(true).fallback(2048).unwrap();
        assert_eq!(grey.co2_grams, green.co2_grams);
    }

    #[test]
    fn injected_model_errors_surface() {
        let estimator = EmissionsEstimator::new(BrokenModel { trace_fails: true, plain_fails: true });

        let err = estimator.estimate(10, &ember(85.0), "x").unwrap_err();
        assert!(matches!(err, EstimateError::InvalidIntensity(_)));

        let critical = estimator.fallback(10).unwrap_err();
        assert_eq!(critical.0, EstimateError::NonFinite);
    }
}
