use async_trait::async_trait;

use crate::{error::LocationError, model::Location};

use super::GeoProvider;

/// Reports a location taken from configuration, without network access.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    location: Location,
}

impl FixedProvider {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl GeoProvider for FixedProvider {
    async fn locate(&self) -> Result<Location, LocationError> {
        Ok(self.location.clone())
    }
}
