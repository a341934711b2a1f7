//! Best-effort position lookup used to prefill coordinates.
//!
//! A missing position is a normal outcome; providers never return errors.

use std::time::Duration;

use async_trait::async_trait;
use qr_token_core::Coordinates;
use serde::Deserialize;
use url::Url;

/// Timeout applied to geolocation lookups.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Source of the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns the current position, or `None` when unavailable or denied.
    async fn current_position(&self) -> Option<Coordinates>;
}

#[derive(Debug, Deserialize)]
struct PositionBody {
    latitude: f64,
    longitude: f64,
}

/// Looks the position up from an IP geolocation endpoint returning
/// `{"latitude": .., "longitude": ..}`.
#[derive(Debug, Clone)]
pub struct IpGeolocationProvider {
    url: Url,
    client: reqwest::Client,
}

impl IpGeolocationProvider {
    /// Creates a provider for `url`. Returns `None` if no HTTP client can be
    /// built, which disables prefill.
    pub fn new(url: Url, timeout: Duration) -> Option<Self> {
        match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => Some(Self { url, client }),
            Err(error) => {
                tracing::debug!(%error, "geolocation client unavailable");
                None
            }
        }
    }

    async fn lookup(&self) -> Result<Coordinates, String> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|error| error.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status().as_u16()));
        }

        let body: PositionBody = response.json().await.map_err(|error| error.to_string())?;
        Coordinates::new(body.latitude, body.longitude).map_err(|error| error.to_string())
    }
}

#[async_trait]
impl LocationProvider for IpGeolocationProvider {
    async fn current_position(&self) -> Option<Coordinates> {
        match self.lookup().await {
            Ok(coordinates) => {
                tracing::debug!("coordinates prefilled from geolocation");
                Some(coordinates)
            }
            Err(reason) => {
                tracing::debug!(%reason, "geolocation unavailable");
                None
            }
        }
    }
}

/// Provider with a fixed answer, used when the position is known up front.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Option<Coordinates> {
        self.0
    }
}
