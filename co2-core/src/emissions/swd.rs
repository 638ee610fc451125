//! Sustainable Web Design model, version 4.
//!
//! Energy per gigabyte is split into operational and embodied parts for the
//! data center, network and end-user device. Operational energy is converted
//! with the grid intensity of the segment; embodied energy always uses the
//! global intensity.

use serde::Serialize;

use crate::error::EstimateError;
use crate::grid::GLOBAL_AVERAGE_INTENSITY;

const BYTES_PER_GB: f64 = 1_000_000_000.0;

const OPERATIONAL_KWH_PER_GB_DATACENTER: f64 = 0.055;
const OPERATIONAL_KWH_PER_GB_NETWORK: f64 = 0.059;
const OPERATIONAL_KWH_PER_GB_DEVICE: f64 = 0.080;

const EMBODIED_KWH_PER_GB_DATACENTER: f64 = 0.012;
const EMBODIED_KWH_PER_GB_NETWORK: f64 = 0.013;
const EMBODIED_KWH_PER_GB_DEVICE: f64 = 0.081;

/// Intensity of renewable supply used for green-hosted data centers.
const RENEWABLES_GRID_INTENSITY: f64 = 50.0;

/// Grid intensity per model segment, gCO₂/kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentIntensity {
    pub device: f64,
    pub data_center: f64,
    pub network: f64,
}

impl SegmentIntensity {
    /// Same intensity for every segment.
    pub fn uniform(intensity: f64) -> Self {
        Self { device: intensity, data_center: intensity, network: intensity }
    }

    fn validate(&self) -> Result<(), EstimateError> {
        for value in [self.device, self.data_center, self.network] {
            if !value.is_finite() || value < 0.0 {
                return Err(EstimateError::InvalidIntensity(value));
            }
        }
        Ok(())
    }
}

impl Default for SegmentIntensity {
    fn default() -> Self {
        Self::uniform(GLOBAL_AVERAGE_INTENSITY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraceOptions {
    pub grid_intensity: SegmentIntensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraceResult {
    /// Grams of CO₂.
    pub co2: f64,
    pub green: bool,
    pub grid_intensity: SegmentIntensity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SustainableWebDesign;

impl SustainableWebDesign {
    pub const NAME: &'static str = "swd";
    pub const VERSION: u8 = 4;

    pub fn methodology(&self) -> String {
        format!("{} v{}", Self::NAME, Self::VERSION)
    }

    /// Emissions for `bytes` at the model's global intensity.
    pub fn per_byte(&self, bytes: u64) -> Result<f64, EstimateError> {
        self.emissions(bytes, false, &SegmentIntensity::default())
    }

    pub fn per_byte_trace(
        &self,
        bytes: u64,
        green: bool,
        options: &TraceOptions,
    ) -> Result<TraceResult, EstimateError> {
        options.grid_intensity.validate()?;
        let co2 = self.emissions(bytes, green, &options.grid_intensity)?;
        Ok(TraceResult { co2, green, grid_intensity: options.grid_intensity })
    }

    fn emissions(
        &self,
        bytes: u64,
        green: bool,
        intensity: &SegmentIntensity,
    ) -> Result<f64, EstimateError> {
        let gb = bytes as f64 / BYTES_PER_GB;

        let data_center_intensity =
            if green { RENEWABLES_GRID_INTENSITY } else { intensity.data_center };

        let operational = gb
            * (OPERATIONAL_KWH_PER_GB_DATACENTER * data_center_intensity
                + OPERATIONAL_KWH_PER_GB_NETWORK * intensity.network
                + OPERATIONAL_KWH_PER_GB_DEVICE * intensity.device);

        let embodied = gb
            * (EMBODIED_KWH_PER_GB_DATACENTER
                + EMBODIED_KWH_PER_GB_NETWORK
                + EMBODIED_KWH_PER_GB_DEVICE)
            * GLOBAL_AVERAGE_INTENSITY;

        let total = operational + embodied;
        if total.is_finite() { Ok(total) } else { Err(EstimateError::NonFinite) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn one_gigabyte_at_global_intensity() {
        // 0.3 kWh/GB in total at 494 g/kWh.
        let co2 = SustainableWebDesign.per_byte(1_000_000_000).unwrap();
        assert!(close(co2, 148.2), "got {co2}");
    }

    #[test]
    fn zero_bytes_emit_nothing() {
        assert_eq!(SustainableWebDesign.per_byte(0).unwrap(), 0.0);
    }

    #[test]
    fn trace_with_global_intensity_matches_per_byte() {
        let model = SustainableWebDesign;
        let plain = model.per_byte(123_456).unwrap();
        let traced = model.per_byte_trace(123_456, false, &TraceOptions::default()).unwrap();
        assert!(close(plain, traced.co2));
    }

    #[test]
    fn custom_intensity_only_moves_operational_part() {
        let options = TraceOptions { grid_intensity: SegmentIntensity::uniform(85.0) };
        let traced = SustainableWebDesign.per_byte_trace(1_000_000_000, false, &options).unwrap();

        let expected = 0.194 * 85.0 + 0.106 * 494.0;
        assert!(close(traced.co2, expected), "got {}", traced.co2);
    }

    #[test]
    fn green_hosting_lowers_data_center_share() {
        let options = TraceOptions { grid_intensity: SegmentIntensity::uniform(400.0) };
        let model = SustainableWebDesign;
        let grey = model.per_byte_trace(1_000_000, false, &options).unwrap();
        let green = model.per_byte_trace(1_000_000, true, &options).unwrap();

        assert!(green.green);
        assert!(green.co2 < grey.co2);
    }

    #[test]
    fn invalid_intensity_is_rejected() {
        let model = SustainableWebDesign;
        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            let options = TraceOptions {
                grid_intensity: SegmentIntensity { network: bad, ..SegmentIntensity::default() },
            };
            let err = model.per_byte_trace(10, false, &options).unwrap_err();
            assert!(matches!(err, EstimateError::InvalidIntensity(_)));
        }
    }

    #[test]
    fn methodology_names_model_and_version() {
        assert_eq!(SustainableWebDesign.methodology(), "swd v4");
    }
}
