//! Reverse-geocode client with a bounded retry loop.
//!
//! The only external call that retries: up to 3 attempts, and only on
//! timeout-class failures. Everything else short-circuits to a sentinel
//! label — geocoding never fails an attendance request.

use reqwest::Client;
use rollcall_core::place::{self, ReverseGeocodePayload};
use rollcall_core::GeoPoint;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const USER_AGENT: &str = concat!("rollcall/", env!("CARGO_PKG_VERSION"));

pub struct PlaceResolver {
    client: Client,
    base_url: String,
}

impl PlaceResolver {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Best-effort place label for an optional capture point.
    pub async fn resolve(&self, point: Option<GeoPoint>) -> String {
        let Some(point) = point else {
            return place::LOCATION_NOT_PROVIDED.to_string();
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match self.lookup(point).await {
                Ok(payload) => {
                    // The provider reports "no result" as a 200 with an
                    // error field instead of an address.
                    if payload.error.is_some() {
                        return place::UNKNOWN_LOCATION.to_string();
                    }
                    return place::place_label(&payload);
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!(attempt, "reverse geocode timed out");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reverse geocode failed");
                    return place::GEOCODING_FAILED.to_string();
                }
            }
        }
        place::GEOCODING_FAILED.to_string()
    }

    async fn lookup(&self, point: GeoPoint) -> Result<ReverseGeocodePayload, reqwest::Error> {
        let url = format!("{}/reverse", self.base_url.trim_end_matches('/'));
        self.client
            .get(&url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", point.latitude.to_string().as_str()),
                ("lon", point.longitude.to_string().as_str()),
                ("zoom", "18"),
                ("addressdetails", "1"),
                ("accept-language", "en"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
