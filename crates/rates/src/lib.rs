//! Distance-based courier shipping rates.
//!
//! This crate provides:
//! - Cart envelope aggregation with store unit conversion
//! - Driver splitting (volumetric estimate and greedy bin packing)
//! - Named services with per-km pricing and hard limits
//! - A generic table-rate engine
//! - The distance provider boundary and a shipping method that ties it together
//!
//! # Example
//!
//! ```
//! use gosend_rates::{CartItem, Envelope, service::Service};
//!
//! let items = vec![CartItem::new(5.0, 10.0, 10.0, 10.0, 1)];
//! let envelope = Envelope::from_items(&items);
//!
//! let cost = Service::instant().calculate_cost(10.0, &envelope, &items).unwrap();
//! assert_eq!(cost.total, 25000.0);
//! assert_eq!(cost.drivers_count, 1);
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod distance;
pub mod engine;
pub mod envelope;
pub mod error;
mod lenient;
pub mod method;
pub mod service;
pub mod split;
pub mod table;
pub mod units;

pub use distance::{DistanceProvider, DistanceRequest, DistanceResult, Location, RouteOptions};
pub use engine::{Cart, EngineConfig, Quote, RateEngine, RateTarget};
pub use envelope::{CartItem, Envelope};
pub use error::{DistanceError, MethodError, RateError, Result};
pub use method::{Package, Rate, ShippingMethod};
pub use service::Service;
pub use split::{DriverSplitPolicy, ServiceLimits};
pub use table::TableRates;

use serde::{Deserialize, Serialize};

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns true if the coordinate has valid values.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

/// Outcome of one cost calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    /// Final cost, never negative
    pub total: f64,
    /// Drivers (shipments) needed, at least 1
    pub drivers_count: u32,
    /// Label of the service or table row
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(-6.174_773, 106.827_172).is_valid());
        assert!(Coordinate::from((90.0, -180.0)).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
    }
}
