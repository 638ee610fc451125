use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{error::LocationError, model::Location, provider::GeoProvider};

/// Resolves the user's location once and keeps it for the lifetime of the
/// resolver.
///
/// The cache check and the cache write are separate steps: two concurrent
/// first calls both reach the provider and the last successful write wins.
#[derive(Debug)]
pub struct LocationResolver {
    provider: Box<dyn GeoProvider>,
    cached: RwLock<Option<Arc<Location>>>,
}

impl LocationResolver {
    pub fn new(provider: Box<dyn GeoProvider>) -> Self {
        Self { provider, cached: RwLock::new(None) }
    }

    /// Cached location, or one fresh provider call. Errors are returned as-is
    /// and leave the cache empty.
    pub async fn resolve(&self) -> Result<Arc<Location>, LocationError> {
        if let Some(location) = self.cached().await {
            tracing::debug!("using cached location");
            return Ok(location);
        }

        let location = Arc::new(self.provider.locate().await?);
        tracing::info!(
            country = location.country.as_deref().unwrap_or("-"),
            iso3 = location.country_code_iso3.as_deref().unwrap_or("-"),
            city = location.city.as_deref().unwrap_or("-"),
            "location detected"
        );

        *self.cached.write().await = Some(Arc::clone(&location));
        Ok(location)
    }

    pub async fn cached(&self) -> Option<Arc<Location>> {
        self.cached.read().await.clone()
    }

    pub async fn clear(&self) {
        self.cached.write().await.take();
    }

    /// Drop the cached location and resolve again.
    pub async fn refresh(&self) -> Result<Arc<Location>, LocationError> {
        self.clear().await;
        self.resolve().await
    }
}
