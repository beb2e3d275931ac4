//! Error types for the rate engine.

use crate::split::Dimension;
use thiserror::Error;

/// Result type alias for rate calculations.
pub type Result<T> = std::result::Result<T, RateError>;

/// Reasons a single service or rate table cannot offer a rate.
///
/// All of these are soft: the caller skips the one service and keeps
/// evaluating its siblings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// Distance is beyond the service's maximum
    #[error("Shipping distance {distance} exceeded the maximum {max} for {service}")]
    MaxDistanceExceeded {
        /// Service slug
        service: String,
        /// Requested distance
        distance: f64,
        /// Configured maximum
        max: f64,
    },

    /// Package weight is over the limit and the shipment cannot be split
    #[error("Package weight {weight} exceeded the maximum {max} for {service}")]
    MaxWeightExceeded {
        /// Service slug
        service: String,
        /// Envelope weight
        weight: f64,
        /// Configured maximum
        max: f64,
    },

    /// Package volume is over the limit and the shipment cannot be split
    #[error("Package dimension {volume} exceeded the maximum {max} for {service}")]
    MaxDimensionExceeded {
        /// Service slug
        service: String,
        /// Envelope width x length x height
        volume: f64,
        /// Limit width x length x height
        max: f64,
    },

    /// A single cart line is over a limit on its own
    #[error("Item {dimension} {value} exceeded the per-shipment limit {limit}")]
    ItemExceedsLimit {
        /// Offending dimension
        dimension: Dimension,
        /// Value of the line
        value: f64,
        /// Configured limit
        limit: f64,
    },

    /// Cart needs more than one driver but the service allows only one
    #[error("Package needs {drivers} drivers but multiple drivers are disabled")]
    SplitNotAllowed {
        /// Drivers the greedy packer would have used
        drivers: u32,
    },

    /// No table-rate row applies
    #[error("No table rate matches distance {distance}, subtotal {subtotal}, quantity {quantity}")]
    NoMatchingRule {
        /// Requested distance
        distance: f64,
        /// Cart subtotal
        subtotal: f64,
        /// Total item quantity
        quantity: u32,
    },
}

/// Error code for integration with gosend-core error handling.
/// Range: 20xxx for rate errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateErrorCode {
    /// Distance over the service maximum
    MaxDistanceExceeded = 20001,
    /// Weight over the service maximum
    MaxWeightExceeded = 20002,
    /// Volume over the service maximum
    MaxDimensionExceeded = 20003,
    /// One line over a limit
    ItemExceedsLimit = 20004,
    /// Split needed but disabled
    SplitNotAllowed = 20005,
    /// No table row matched
    NoMatchingRule = 20006,
}

impl RateError {
    /// Returns the error code for this error.
    pub fn code(&self) -> RateErrorCode {
        match self {
            RateError::MaxDistanceExceeded { .. } => RateErrorCode::MaxDistanceExceeded,
            RateError::MaxWeightExceeded { .. } => RateErrorCode::MaxWeightExceeded,
            RateError::MaxDimensionExceeded { .. } => RateErrorCode::MaxDimensionExceeded,
            RateError::ItemExceedsLimit { .. } => RateErrorCode::ItemExceedsLimit,
            RateError::SplitNotAllowed { .. } => RateErrorCode::SplitNotAllowed,
            RateError::NoMatchingRule { .. } => RateErrorCode::NoMatchingRule,
        }
    }
}

/// Failures of a distance lookup.
///
/// Every variant collapses to "distance unavailable" for the shipping
/// method: no rates are offered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    /// Origin and/or destination could not be geocoded
    #[error("Origin and/or destination of this pairing could not be geocoded")]
    NotFound,

    /// No route between origin and destination
    #[error("No route could be found between the origin and destination")]
    ZeroResults,

    /// Route too long for the provider
    #[error("Requested route is too long and cannot be processed")]
    MaxRouteLengthExceeded,

    /// Provider answered with an error status or an unusable body
    #[error("API response error: {0}")]
    Api(String),

    /// Provider could not be reached
    #[error("Distance service unavailable: {0}")]
    Unavailable(String),

    /// Provider answered OK but with no usable route
    #[error("No results found")]
    NoResults,
}

/// Error code for distance lookups.
/// Range: 30xxx for distance errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceErrorCode {
    /// `NOT_FOUND`
    NotFound = 30001,
    /// `ZERO_RESULTS`
    ZeroResults = 30002,
    /// `MAX_ROUTE_LENGTH_EXCEEDED`
    MaxRouteLengthExceeded = 30003,
    /// Any other API error
    ApiError = 30004,
    /// Network or circuit breaker failure
    Unavailable = 30005,
    /// Empty result set
    NoResults = 30006,
}

impl DistanceError {
    /// Returns the error code for this error.
    pub fn code(&self) -> DistanceErrorCode {
        match self {
            DistanceError::NotFound => DistanceErrorCode::NotFound,
            DistanceError::ZeroResults => DistanceErrorCode::ZeroResults,
            DistanceError::MaxRouteLengthExceeded => DistanceErrorCode::MaxRouteLengthExceeded,
            DistanceError::Api(_) => DistanceErrorCode::ApiError,
            DistanceError::Unavailable(_) => DistanceErrorCode::Unavailable,
            DistanceError::NoResults => DistanceErrorCode::NoResults,
        }
    }

    /// Maps a Distance Matrix element status to its error, if it has one.
    pub fn from_element_status(status: &str) -> Option<Self> {
        match status {
            "NOT_FOUND" => Some(DistanceError::NotFound),
            "ZERO_RESULTS" => Some(DistanceError::ZeroResults),
            "MAX_ROUTE_LENGTH_EXCEEDED" => Some(DistanceError::MaxRouteLengthExceeded),
            _ => None,
        }
    }
}

/// Why a shipping method produced no rates at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MethodError {
    /// Store origin is not configured
    #[error("Origin parameter is empty")]
    MissingOrigin,

    /// Destination is missing a required field or is empty
    #[error("Shipping destination is invalid: {0}")]
    Destination(String),

    /// Distance lookup failed
    #[error(transparent)]
    Distance(#[from] DistanceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_in_range() {
        let err = RateError::SplitNotAllowed { drivers: 2 };
        assert_eq!(err.code() as u32, 20005);
        assert_eq!(DistanceError::ZeroResults.code() as u32, 30002);
    }

    #[test]
    fn test_element_status_mapping() {
        assert_eq!(
            DistanceError::from_element_status("MAX_ROUTE_LENGTH_EXCEEDED"),
            Some(DistanceError::MaxRouteLengthExceeded)
        );
        assert_eq!(DistanceError::from_element_status("OK"), None);
    }

    #[test]
    fn test_method_error_wraps_distance() {
        let err: MethodError = DistanceError::NotFound.into();
        assert!(err.to_string().contains("geocoded"));
    }
}
