//! Distance lookup boundary.
//!
//! The engine never talks to the network. It asks a [`DistanceProvider`] for
//! candidate routes, picks one by the configured [`PreferredRoute`], and
//! converts it into a [`DistanceResult`] in the store's unit.

mod straight_line;

pub use straight_line::{StraightLineProvider, EARTH_RADIUS_KM};

use crate::error::DistanceError;
use crate::Coordinate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Kilometres per metre.
pub const KM_PER_METER: f64 = 0.001;

/// Miles per metre.
pub const MI_PER_METER: f64 = 0.000_621_371;

/// Smallest distance ever charged.
pub const MIN_DISTANCE: f64 = 0.1;

/// Origin or destination of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Latitude/longitude pair
    Coordinates(Coordinate),
    /// Free-form address
    Address(String),
}

impl Location {
    /// Parse `"lat,lng"` as coordinates, anything else as an address.
    ///
    /// ```
    /// use gosend_rates::distance::Location;
    ///
    /// assert!(matches!(Location::parse("-6.17,106.82"), Location::Coordinates(_)));
    /// assert!(matches!(Location::parse("Jl. Sudirman, Jakarta"), Location::Address(_)));
    /// ```
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(',').map(str::trim);
        if let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) {
            if let (Ok(lat), Ok(lng)) = (lat.parse::<f64>(), lng.parse::<f64>()) {
                let coordinate = Coordinate::new(lat, lng);
                if coordinate.is_valid() {
                    return Location::Coordinates(coordinate);
                }
            }
        }
        Location::Address(value.trim().to_string())
    }

    /// True for a blank address.
    pub fn is_empty(&self) -> bool {
        matches!(self, Location::Address(a) if a.trim().is_empty())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Coordinates(c) => write!(f, "{},{}", c.latitude, c.longitude),
            Location::Address(a) => f.write_str(a),
        }
    }
}

macro_rules! api_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Spelling used in API requests and configuration.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

api_enum! {
    /// How the courier travels.
    TravelMode {
        #[default]
        /// Car or motorbike
        Driving => "driving",
        /// On foot
        Walking => "walking",
        /// Bicycle
        Bicycling => "bicycling",
    }
}

api_enum! {
    /// Route features to avoid.
    Avoid {
        #[default]
        /// No restriction
        None => "",
        /// Toll roads
        Tolls => "tolls",
        /// Highways
        Highways => "highways",
        /// Ferries
        Ferries => "ferries",
        /// Indoor steps
        Indoor => "indoor",
    }
}

api_enum! {
    /// Unit system of distances shown and charged.
    UnitSystem {
        #[default]
        /// Kilometres
        Metric => "metric",
        /// Miles
        Imperial => "imperial",
    }
}

api_enum! {
    /// Which candidate route to charge for.
    PreferredRoute {
        #[default]
        /// Fewest metres
        ShortestDistance => "shortest_distance",
        /// Most metres
        LongestDistance => "longest_distance",
        /// Fewest seconds
        ShortestDuration => "shortest_duration",
        /// Most seconds
        LongestDuration => "longest_duration",
    }
}

impl UnitSystem {
    /// Unit label appended to distances.
    pub fn label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "km",
            UnitSystem::Imperial => "mi",
        }
    }

    /// Convert metres to this unit, rounded to one decimal.
    pub fn from_meters(self, meters: f64) -> f64 {
        let factor = match self {
            UnitSystem::Metric => KM_PER_METER,
            UnitSystem::Imperial => MI_PER_METER,
        };
        (meters * factor * 10.0).round() / 10.0
    }
}

/// Options that shape the route request and its conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Travel mode
    pub travel_mode: TravelMode,
    /// Route restriction
    pub avoid: Avoid,
    /// Distance unit
    pub units: UnitSystem,
    /// Response language
    pub language: String,
    /// Candidate selection
    pub preferred_route: PreferredRoute,
    /// Round the converted distance up to a whole unit
    pub round_up_distance: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            travel_mode: TravelMode::default(),
            avoid: Avoid::default(),
            units: UnitSystem::default(),
            language: "en".to_string(),
            preferred_route: PreferredRoute::default(),
            round_up_distance: false,
        }
    }
}

/// One distance lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceRequest {
    /// Store origin
    pub origin: Location,
    /// Customer destination
    pub destination: Location,
    /// Route options
    pub options: RouteOptions,
}

impl DistanceRequest {
    /// Cache key covering everything that changes the answer.
    pub fn cache_key(&self) -> String {
        let o = &self.options;
        format!(
            "distance:{}|{}|{}|{}|{}|{}|{}|{}",
            self.origin,
            self.destination,
            o.travel_mode,
            o.avoid,
            o.units,
            o.language,
            o.preferred_route,
            o.round_up_distance
        )
    }
}

/// A route returned by the provider, in raw metres and seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Route length in metres
    pub distance_meters: f64,
    /// Provider's formatted distance
    pub distance_text: String,
    /// Travel time in seconds
    pub duration_seconds: f64,
    /// Provider's formatted duration
    pub duration_text: String,
}

/// The distance charged for a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    /// Distance in the configured unit, never below 0.1
    pub distance: f64,
    /// e.g. `"12.5 km"`
    pub distance_text: String,
    /// Travel time in seconds
    pub duration_seconds: f64,
    /// Provider's formatted duration
    pub duration_text: String,
}

impl DistanceResult {
    /// Convert a chosen route.
    ///
    /// ```
    /// use gosend_rates::distance::{DistanceResult, RouteCandidate, RouteOptions};
    ///
    /// let route = RouteCandidate {
    ///     distance_meters: 12_345.0,
    ///     distance_text: "12.3 km".into(),
    ///     duration_seconds: 1500.0,
    ///     duration_text: "25 mins".into(),
    /// };
    /// let result = DistanceResult::from_route(&route, &RouteOptions::default());
    /// assert_eq!(result.distance, 12.3);
    /// assert_eq!(result.distance_text, "12.3 km");
    /// ```
    pub fn from_route(route: &RouteCandidate, options: &RouteOptions) -> Self {
        let mut distance = options.units.from_meters(route.distance_meters);
        if distance <= 0.0 {
            distance = MIN_DISTANCE;
        }
        if options.round_up_distance {
            distance = distance.ceil();
        }

        Self {
            distance,
            distance_text: format!("{} {}", distance, options.units.label()),
            duration_seconds: route.duration_seconds,
            duration_text: route.duration_text.clone(),
        }
    }

    /// A distance already known in the configured unit, with no travel time.
    pub fn from_distance(distance: f64, options: &RouteOptions) -> Self {
        let distance = if distance > 0.0 {
            distance
        } else {
            MIN_DISTANCE
        };
        Self {
            distance,
            distance_text: format!("{} {}", distance, options.units.label()),
            duration_seconds: 0.0,
            duration_text: String::new(),
        }
    }
}

/// Pick the route to charge for. Ties keep provider order.
pub fn choose_route(routes: &[RouteCandidate], policy: PreferredRoute) -> Option<&RouteCandidate> {
    let key = |r: &RouteCandidate| match policy {
        PreferredRoute::ShortestDistance | PreferredRoute::LongestDistance => r.distance_meters,
        PreferredRoute::ShortestDuration | PreferredRoute::LongestDuration => r.duration_seconds,
    };
    let longest = matches!(
        policy,
        PreferredRoute::LongestDistance | PreferredRoute::LongestDuration
    );

    routes.iter().reduce(|best, next| {
        let order = key(next).partial_cmp(&key(best)).unwrap_or(Ordering::Equal);
        let better = if longest {
            order == Ordering::Greater
        } else {
            order == Ordering::Less
        };
        if better { next } else { best }
    })
}

/// Source of candidate routes.
///
/// Implementations may block; the shipping method calls them synchronously.
pub trait DistanceProvider: Send + Sync {
    /// Candidate routes for `request`, or why there are none.
    fn routes(&self, request: &DistanceRequest) -> Result<Vec<RouteCandidate>, DistanceError>;

    /// Look up, choose and convert in one step.
    fn distance(&self, request: &DistanceRequest) -> Result<DistanceResult, DistanceError> {
        let routes = self.routes(request)?;
        let route = choose_route(&routes, request.options.preferred_route)
            .ok_or(DistanceError::NoResults)?;
        Ok(DistanceResult::from_route(route, &request.options))
    }
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for Box<P> {
    fn routes(&self, request: &DistanceRequest) -> Result<Vec<RouteCandidate>, DistanceError> {
        (**self).routes(request)
    }
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for std::sync::Arc<P> {
    fn routes(&self, request: &DistanceRequest) -> Result<Vec<RouteCandidate>, DistanceError> {
        (**self).routes(request)
    }
}
