use crate::{
    Config, Location,
    error::LocationError,
    provider::{fixed::FixedProvider, ipapi::IpApiProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod fixed;
pub mod ipapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    IpApi,
    Fixed,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::IpApi => "ipapi",
            ProviderId::Fixed => "fixed",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::IpApi, ProviderId::Fixed]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "ipapi" => Ok(ProviderId::IpApi),
            "fixed" => Ok(ProviderId::Fixed),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: ipapi, fixed."
            )),
        }
    }
}

/// Source of the user's approximate location.
#[async_trait]
pub trait GeoProvider: Send + Sync + Debug {
    async fn locate(&self) -> Result<Location, LocationError>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn GeoProvider>> {
    let boxed: Box<dyn GeoProvider> = match id {
        ProviderId::IpApi => {
            let mut provider = IpApiProvider::new(config.provider_api_key(id).map(str::to_owned));
            if let Some(base_url) = config.provider_base_url(id) {
                provider = provider.with_base_url(base_url);
            }
            Box::new(provider)
        }
        ProviderId::Fixed => {
            let location = config.fixed_location.clone().ok_or_else(|| {
                anyhow::anyhow!(
                    "No fixed location configured.\n\
                     Hint: run `co2 configure fixed` and enter your country."
                )
            })?;
            Box::new(FixedProvider::new(location))
        }
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn GeoProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}
