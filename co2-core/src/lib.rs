//! Core library for the `co2` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over geolocation providers and a cached location resolver
//! - Grid intensity lookup by country
//! - The Sustainable Web Design emissions model and report rendering
//!
//! It is used by `co2-cli`, but can also be reused by other binaries or services.

pub mod command;
pub mod config;
pub mod emissions;
pub mod error;
pub mod grid;
pub mod model;
pub mod provider;
pub mod resolver;

pub use command::{EstimateCommand, Outcome};
pub use config::{Config, ProviderConfig};
pub use emissions::{EmissionsEstimator, EmissionsModel, energy_kwh};
pub use error::{CommandError, CriticalError, EstimateError, LocationError};
pub use grid::{GridIntensityLookup, IntensityTable};
pub use model::{EmissionsReport, GridIntensityResult, IntensitySource, Location, Provenance};
pub use provider::{GeoProvider, ProviderId};
pub use resolver::LocationResolver;
