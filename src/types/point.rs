//! Delivery point types

use serde::{Deserialize, Serialize};

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `[lng, lat]` pair as used by GeoJSON and OpenRouteService
    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self { lat: pair[1], lng: pair[0] }
    }
}

/// A delivery request reduced to its reference and location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPoint {
    /// Order reference (e.g. "CMD0042")
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

impl DeliveryPoint {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self { id: id.into(), lat, lng }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates { lat: self.lat, lng: self.lng }
    }
}
