//! Geocoding seam.
//!
//! Registration needs coordinates for a free-text location. No geocoding
//! service is wired up yet: `PlaceholderGeocoder` ignores the location and
//! draws a random point inside a fixed box (roughly Tamil Nadu). Swap in a
//! real `Geocoder` without touching the registration handler.

use std::ops::RangeInclusive;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Latitude range of placeholder coordinates.
pub const PLACEHOLDER_LAT_RANGE: RangeInclusive<f64> = 8.0..=13.0;

/// Longitude range of placeholder coordinates.
pub const PLACEHOLDER_LON_RANGE: RangeInclusive<f64> = 77.0..=80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Geocoding service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, location: &str) -> Result<Coordinates, GeocodeError>;
}

/// Stand-in for a real geocoding lookup. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGeocoder;

#[async_trait]
impl Geocoder for PlaceholderGeocoder {
    async fn geocode(&self, location: &str) -> Result<Coordinates, GeocodeError> {
        Ok(placeholder_geocode(location))
    }
}

/// Independent uniform draws over the placeholder box. `location` is unused.
pub fn placeholder_geocode(_location: &str) -> Coordinates {
    let mut rng = rand::thread_rng();
    Coordinates {
        lat: rng.gen_range(PLACEHOLDER_LAT_RANGE),
        lon: rng.gen_range(PLACEHOLDER_LON_RANGE),
    }
}
