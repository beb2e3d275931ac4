//! Great-circle distance provider.
//!
//! Works offline from coordinates only. Useful for quotes where the road
//! network does not matter much, and for tests.

use super::{DistanceProvider, DistanceRequest, Location, RouteCandidate};
use crate::error::DistanceError;
use crate::Coordinate;

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in kilometers.
#[inline]
pub fn haversine_km(from: &Coordinate, to: &Coordinate) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();

    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Provider that answers with the straight-line distance between two
/// coordinate locations.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineProvider {
    /// Road distance is longer than straight distance; multiply by this
    pub detour_factor: f64,
    /// Average speed used for the duration estimate
    pub speed_kmh: f64,
}

impl Default for StraightLineProvider {
    fn default() -> Self {
        Self {
            detour_factor: 1.0,
            speed_kmh: 30.0,
        }
    }
}

impl StraightLineProvider {
    fn coordinate(location: &Location) -> Result<Coordinate, DistanceError> {
        match location {
            Location::Coordinates(c) if c.is_valid() => Ok(*c),
            Location::Coordinates(_) => Err(DistanceError::NotFound),
            Location::Address(_) => Err(DistanceError::Api(
                "straight-line distance needs coordinates, not an address".to_string(),
            )),
        }
    }
}

impl DistanceProvider for StraightLineProvider {
    fn routes(&self, request: &DistanceRequest) -> Result<Vec<RouteCandidate>, DistanceError> {
        let from = Self::coordinate(&request.origin)?;
        let to = Self::coordinate(&request.destination)?;

        let km = haversine_km(&from, &to) * self.detour_factor.max(1.0);
        let seconds = if self.speed_kmh > 0.0 {
            (km / self.speed_kmh * 3600.0).round()
        } else {
            0.0
        };

        Ok(vec![RouteCandidate {
            distance_meters: km * 1000.0,
            distance_text: format!("{km:.1} km"),
            duration_seconds: seconds,
            duration_text: format!("{} mins", (seconds / 60.0).round()),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::RouteOptions;

    const MONAS: Coordinate = Coordinate {
        latitude: -6.175_392,
        longitude: 106.827_153,
    };
    const BUNDARAN_HI: Coordinate = Coordinate {
        latitude: -6.195_004,
        longitude: 106.823_003,
    };

    #[test]
    fn test_short_hop() {
        let km = haversine_km(&MONAS, &BUNDARAN_HI);
        assert!((km - 2.23).abs() < 0.05, "Monas-Bundaran HI: {km}");
    }

    #[test]
    fn test_symmetry_and_zero() {
        let there = haversine_km(&MONAS, &BUNDARAN_HI);
        let back = haversine_km(&BUNDARAN_HI, &MONAS);
        assert!((there - back).abs() < 1e-9);
        assert!(haversine_km(&MONAS, &MONAS).abs() < 1e-9);
    }

    #[test]
    fn test_provider_converts() {
        let provider = StraightLineProvider {
            detour_factor: 1.5,
            speed_kmh: 30.0,
        };
        let request = DistanceRequest {
            origin: Location::Coordinates(MONAS),
            destination: Location::Coordinates(BUNDARAN_HI),
            options: RouteOptions::default(),
        };

        let result = provider.distance(&request).unwrap();
        assert!((result.distance - 3.3).abs() < 0.11);
        assert!(result.duration_seconds > 0.0);
    }

    #[test]
    fn test_address_rejected() {
        let request = DistanceRequest {
            origin: Location::Coordinates(MONAS),
            destination: Location::Address("Jakarta".into()),
            options: RouteOptions::default(),
        };
        assert!(matches!(
            StraightLineProvider::default().routes(&request),
            Err(DistanceError::Api(_))
        ));
    }
}
