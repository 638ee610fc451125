//! The estimate command: selection in, one outcome out.
//!
//! `Idle → resolving location → looking up intensity → estimating → report`,
//! with every failure in the middle steps escaping to the global-average
//! fallback, and a critical outcome only when that fallback fails too.

use crate::{
    Config,
    emissions::{EmissionsEstimator, SustainableWebDesign},
    error::{CommandError, CriticalError},
    grid::GridIntensityLookup,
    model::EmissionsReport,
    provider::default_provider_from_config,
    resolver::LocationResolver,
};

/// Result of one command invocation. Every variant is shown to the user.
#[derive(Debug)]
pub enum Outcome {
    /// Selection was empty or whitespace; nothing was estimated.
    NothingSelected,
    Success(EmissionsReport),
    Fallback { report: EmissionsReport, reason: CommandError },
    Critical(CriticalError),
}

impl Outcome {
    pub fn report(&self) -> Option<&EmissionsReport> {
        match self {
            Outcome::Success(report) | Outcome::Fallback { report, .. } => Some(report),
            Outcome::NothingSelected | Outcome::Critical(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Critical(_))
    }
}

#[derive(Debug)]
pub struct EstimateCommand {
    resolver: LocationResolver,
    grid: GridIntensityLookup,
    estimator: EmissionsEstimator,
}

impl EstimateCommand {
    pub fn new(
        resolver: LocationResolver,
        grid: GridIntensityLookup,
        estimator: EmissionsEstimator,
    ) -> Self {
        Self { resolver, grid, estimator }
    }

    /// Wire the default provider and intensity dataset from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = default_provider_from_config(config)?;
        let table = config.intensity_table()?;

        Ok(Self::new(
            LocationResolver::new(provider),
            GridIntensityLookup::new(table),
            EmissionsEstimator::new(SustainableWebDesign),
        ))
    }

    pub fn with_green_hosting(mut self, green: bool) -> Self {
        self.estimator = self.estimator.with_green_hosting(green);
        self
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn grid(&self) -> &GridIntensityLookup {
        &self.grid
    }

    pub async fn run(&self, selection: &str) -> Outcome {
        if selection.trim().is_empty() {
            tracing::warn!("empty selection, nothing to estimate");
            return Outcome::NothingSelected;
        }

        let bytes = selection.len() as u64;

        match self.estimate(bytes).await {
            Ok(report) => Outcome::Success(report),
            Err(reason) => {
                tracing::warn!(error = %reason, "estimate failed, using global average");
                match self.estimator.fallback(bytes) {
                    Ok(report) => Outcome::Fallback { report, reason },
                    Err(err) => {
                        tracing::error!(error = %err, "global average fallback failed");
                        Outcome::Critical(err)
                    }
                }
            }
        }
    }

    async fn estimate(&self, bytes: u64) -> Result<EmissionsReport, CommandError> {
        let location = self.resolver.resolve().await?;
        let grid = self.grid.lookup(location.country_code_iso3.as_deref());
        tracing::debug!(intensity = grid.intensity, source = %grid.source, "grid intensity");

        Ok(self.estimator.estimate(bytes, &grid, location.label())?)
    }
}
