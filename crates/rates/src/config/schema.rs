//! Configuration schema definitions

use crate::distance::{Location, RouteOptions};
use crate::engine::EngineConfig;
use crate::method::{DestinationField, MethodSettings, METHOD_ID};
use crate::service::ServiceConfig;
use crate::split::DriverSplitPolicy;
use crate::table::TableRates;
use crate::units::StoreUnits;
use crate::Coordinate;
use gosend_core::cache::DEFAULT_TTL_SECS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    /// Method identity and debug switch
    pub general: GeneralSettings,

    #[serde(default)]
    /// Distance API and route options
    pub api: ApiSettings,

    #[serde(default)]
    /// Store origin
    pub origin: OriginSettings,

    #[serde(default)]
    /// Units of the cart data
    pub units: StoreUnits,

    #[serde(default)]
    /// Destination requirements
    pub destination: DestinationSettings,

    #[serde(default = "default_services")]
    /// Simple services, in display order
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    /// Table rates
    pub table_rates: TableRates,

    #[serde(default)]
    /// Driver policy for services that do not set one
    pub split_policy: DriverSplitPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            api: ApiSettings::default(),
            origin: OriginSettings::default(),
            units: StoreUnits::default(),
            destination: DestinationSettings::default(),
            services: default_services(),
            table_rates: TableRates::default(),
            split_policy: DriverSplitPolicy::default(),
        }
    }
}

fn default_services() -> Vec<ServiceConfig> {
    vec![ServiceConfig::new("instant"), ServiceConfig::new("same_day")]
}

impl Settings {
    /// Engine configuration with every service resolved.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            services: self
                .services
                .iter()
                .map(|service| service.resolve())
                .collect(),
            table: self.table_rates.clone(),
            units: self.units,
            default_split_policy: self.split_policy,
        }
    }

    /// Settings of the shipping method.
    pub fn method_settings(&self) -> MethodSettings {
        MethodSettings {
            method_id: self.general.method_id.clone(),
            instance_id: self.general.instance_id,
            origin: self.origin.location(),
            required_fields: self.destination.required_fields.clone(),
            route: self.api.route.clone(),
            show_distance: self.api.show_distance,
            debug: self.general.debug,
            cache_ttl: Duration::from_secs(self.api.cache_ttl_secs),
        }
    }
}

/// Method identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Prefix of rate ids
    pub method_id: String,
    /// Method instance
    pub instance_id: u32,
    /// Verbose reasoning, no distance cache, masked API request logging
    pub debug: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            method_id: METHOD_ID.to_string(),
            instance_id: 0,
            debug: false,
        }
    }
}

/// Distance Matrix API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// API key; `GOSEND_API_KEY` overrides
    pub key: String,
    /// Endpoint override
    pub url: Option<String>,
    /// Request timeout; `GOSEND_TIMEOUT_SECS` overrides
    pub timeout_secs: u64,
    /// Attempts per lookup
    pub max_retries: u32,
    /// Lifetime of cached distances
    pub cache_ttl_secs: u64,
    /// Append the distance to rate labels
    pub show_distance: bool,
    #[serde(flatten)]
    /// Route request options
    pub route: RouteOptions,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            url: None,
            timeout_secs: 30,
            max_retries: 3,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            show_distance: false,
            route: RouteOptions::default(),
        }
    }
}

/// How the origin is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
    /// Latitude/longitude
    #[default]
    Coordinate,
    /// Free-form address
    Address,
}

/// Store origin
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginSettings {
    /// Which of the fields below is used
    #[serde(rename = "type")]
    pub origin_type: OriginType,
    /// Latitude
    pub lat: Option<f64>,
    /// Longitude
    pub lng: Option<f64>,
    /// Address
    pub address: String,
}

impl OriginSettings {
    /// Origin location; coordinate mode needs both values.
    pub fn location(&self) -> Option<Location> {
        match self.origin_type {
            OriginType::Coordinate => match (self.lat, self.lng) {
                (Some(lat), Some(lng)) => Some(Location::Coordinates(Coordinate::new(lat, lng))),
                _ => None,
            },
            OriginType::Address => {
                let address = self.address.trim();
                (!address.is_empty()).then(|| Location::Address(address.to_string()))
            }
        }
    }
}

/// Destination requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationSettings {
    /// Fields that must be non-empty
    pub required_fields: Vec<DestinationField>,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            required_fields: vec![DestinationField::Country],
        }
    }
}
