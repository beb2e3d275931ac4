//! The shipping method: resolves origin and destination, looks up the
//! distance (through the cache), prices every target and builds rates.

use crate::distance::{DistanceProvider, DistanceRequest, DistanceResult, Location, RouteOptions};
use crate::engine::{log_skipped, Cart, RateEngine, RateTarget};
use crate::envelope::{CartItem, Envelope};
use crate::error::{DistanceError, MethodError, RateError};
use crate::CostResult;
use gosend_core::cache::{Cache, DEFAULT_TTL_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Method id used in rate ids.
pub const METHOD_ID: &str = "woogosend";

/// Customer address fields, in the order they are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationField {
    /// Street line 1
    #[serde(rename = "address_1")]
    Address1,
    /// Street line 2
    #[serde(rename = "address_2")]
    Address2,
    /// City
    #[serde(rename = "city")]
    City,
    /// State or province
    #[serde(rename = "state")]
    State,
    /// Postal code
    #[serde(rename = "postcode")]
    Postcode,
    /// Country
    #[serde(rename = "country")]
    Country,
}

impl DestinationField {
    /// All fields in join order.
    pub const ALL: [DestinationField; 6] = [
        DestinationField::Address1,
        DestinationField::Address2,
        DestinationField::City,
        DestinationField::State,
        DestinationField::Postcode,
        DestinationField::Country,
    ];

    /// Field key.
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationField::Address1 => "address_1",
            DestinationField::Address2 => "address_2",
            DestinationField::City => "city",
            DestinationField::State => "state",
            DestinationField::Postcode => "postcode",
            DestinationField::Country => "country",
        }
    }
}

impl fmt::Display for DestinationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping address of a package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Destination {
    /// Street line 1
    pub address_1: String,
    /// Street line 2
    pub address_2: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub postcode: String,
    /// Country
    pub country: String,
}

impl Destination {
    /// Value of one field.
    pub fn get(&self, field: DestinationField) -> &str {
        match field {
            DestinationField::Address1 => &self.address_1,
            DestinationField::Address2 => &self.address_2,
            DestinationField::City => &self.city,
            DestinationField::State => &self.state,
            DestinationField::Postcode => &self.postcode,
            DestinationField::Country => &self.country,
        }
    }

    /// Join the non-empty fields with `", "` after checking required ones.
    ///
    /// ```
    /// use gosend_rates::method::{Destination, DestinationField};
    ///
    /// let destination = Destination {
    ///     address_1: "Jl. Sudirman 1".into(),
    ///     city: "Jakarta".into(),
    ///     country: "ID".into(),
    ///     ..Default::default()
    /// };
    /// let address = destination.resolve(&[DestinationField::Country]).unwrap();
    /// assert_eq!(address, "Jl. Sudirman 1, Jakarta, ID");
    /// ```
    pub fn resolve(&self, required: &[DestinationField]) -> Result<String, MethodError> {
        let missing: Vec<&str> = required
            .iter()
            .filter(|field| self.get(**field).trim().is_empty())
            .map(|field| field.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(MethodError::Destination(format!(
                "field is empty: {}",
                missing.join(", ")
            )));
        }

        let address = DestinationField::ALL
            .iter()
            .map(|field| self.get(*field).trim())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        if address.is_empty() {
            return Err(MethodError::Destination("address is empty".to_string()));
        }
        Ok(address)
    }
}

/// The shipment to price.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// Cart lines
    pub items: Vec<CartItem>,
    /// Ship-to address
    pub destination: Destination,
    /// Order amount; summed from line totals when absent
    pub subtotal: Option<f64>,
}

/// Data attached to a rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateMeta {
    /// Distance the rate was priced on
    pub api_response: DistanceResult,
    /// Drivers needed
    pub drivers_count: u32,
}

/// One shipping option offered to the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// `{method_id}:{instance_id}:{slug}`
    pub id: String,
    /// Customer-facing label
    pub label: String,
    /// Cost in store currency
    pub cost: f64,
    /// Distance and driver count
    pub meta_data: RateMeta,
}

/// Method-level settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSettings {
    /// Prefix of rate ids
    pub method_id: String,
    /// Instance of the method (shipping zone slot)
    pub instance_id: u32,
    /// Store origin; `None` yields no rates
    pub origin: Option<Location>,
    /// Address fields that must be filled in
    pub required_fields: Vec<DestinationField>,
    /// Route request options
    pub route: RouteOptions,
    /// Append the distance text to labels
    pub show_distance: bool,
    /// Verbose reasoning and no distance cache
    pub debug: bool,
    /// Lifetime of cached distances
    pub cache_ttl: Duration,
}

impl Default for MethodSettings {
    fn default() -> Self {
        Self {
            method_id: METHOD_ID.to_string(),
            instance_id: 0,
            origin: None,
            required_fields: vec![DestinationField::Country],
            route: RouteOptions::default(),
            show_distance: false,
            debug: false,
            cache_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

/// Replaces the resolved origin. Receives the configured origin.
pub type OriginOverride =
    Box<dyn Fn(Option<Location>, &Package, u32) -> Option<Location> + Send + Sync>;

/// Pre-empts destination resolution when it returns `Some`.
pub type DestinationOverride = Box<dyn Fn(&Package, u32) -> Option<String> + Send + Sync>;

/// Pre-empts the distance lookup when it returns `Some`.
pub type DistanceOverride = Box<
    dyn Fn(&DistanceRequest, &Package) -> Option<Result<DistanceResult, DistanceError>>
        + Send
        + Sync,
>;

/// Rewrites a looked-up distance, cached or fresh.
pub type DistanceResultOverride =
    Box<dyn Fn(DistanceResult, &Package) -> DistanceResult + Send + Sync>;

/// Rewrites the aggregate envelope before any target is priced.
pub type EnvelopeOverride = Box<dyn Fn(Envelope, &Package) -> Envelope + Send + Sync>;

/// Pre-empts one target's cost calculation when it returns `Some`.
pub type CostOverride =
    Box<dyn Fn(&str, f64, &Envelope) -> Option<Result<CostResult, RateError>> + Send + Sync>;

#[derive(Default)]
struct Overrides {
    origin: Option<OriginOverride>,
    destination: Option<DestinationOverride>,
    distance: Option<DistanceOverride>,
    distance_result: Option<DistanceResultOverride>,
    envelope: Option<EnvelopeOverride>,
    cost: Option<CostOverride>,
}

/// Distance-based shipping method.
pub struct ShippingMethod {
    settings: MethodSettings,
    engine: RateEngine,
    provider: Arc<dyn DistanceProvider>,
    cache: Option<Cache>,
    overrides: Overrides,
}

impl fmt::Debug for ShippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShippingMethod")
            .field("settings", &self.settings)
            .field("engine", &self.engine)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl ShippingMethod {
    /// Create a method without a cache.
    pub fn new(
        settings: MethodSettings,
        engine: RateEngine,
        provider: Arc<dyn DistanceProvider>,
    ) -> Self {
        Self {
            settings,
            engine,
            provider,
            cache: None,
            overrides: Overrides::default(),
        }
    }

    /// Cache distance lookups.
    #[must_use]
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Install an origin override.
    #[must_use]
    pub fn with_origin_override(mut self, f: OriginOverride) -> Self {
        self.overrides.origin = Some(f);
        self
    }

    /// Install a destination override.
    #[must_use]
    pub fn with_destination_override(mut self, f: DestinationOverride) -> Self {
        self.overrides.destination = Some(f);
        self
    }

    /// Install a distance override.
    #[must_use]
    pub fn with_distance_override(mut self, f: DistanceOverride) -> Self {
        self.overrides.distance = Some(f);
        self
    }

    /// Install a filter over looked-up distances.
    #[must_use]
    pub fn with_distance_result_override(mut self, f: DistanceResultOverride) -> Self {
        self.overrides.distance_result = Some(f);
        self
    }

    /// Install an envelope override.
    #[must_use]
    pub fn with_envelope_override(mut self, f: EnvelopeOverride) -> Self {
        self.overrides.envelope = Some(f);
        self
    }

    /// Install a cost override.
    #[must_use]
    pub fn with_cost_override(mut self, f: CostOverride) -> Self {
        self.overrides.cost = Some(f);
        self
    }

    /// Settings in use.
    pub fn settings(&self) -> &MethodSettings {
        &self.settings
    }

    /// Engine in use.
    pub fn engine(&self) -> &RateEngine {
        &self.engine
    }

    /// Rate id for a target slug.
    pub fn rate_id(&self, slug: &str) -> String {
        format!("{}:{}:{}", self.settings.method_id, self.settings.instance_id, slug)
    }

    /// Store origin after overrides.
    pub fn origin(&self, package: &Package) -> Result<Location, MethodError> {
        let configured = self.settings.origin.clone();
        let origin = match &self.overrides.origin {
            Some(f) => f(configured, package, self.settings.instance_id),
            None => configured,
        };

        origin
            .filter(|location| !location.is_empty())
            .ok_or(MethodError::MissingOrigin)
    }

    /// Customer destination after overrides.
    pub fn destination(&self, package: &Package) -> Result<Location, MethodError> {
        if let Some(f) = &self.overrides.destination {
            if let Some(address) = f(package, self.settings.instance_id) {
                let location = Location::parse(&address);
                if location.is_empty() {
                    return Err(MethodError::Destination("address is empty".to_string()));
                }
                return Ok(location);
            }
        }

        let address = package.destination.resolve(&self.settings.required_fields)?;
        Ok(Location::Address(address))
    }

    /// Distance for a request: override, then cache, then provider.
    ///
    /// The result filter sees cache hits and fresh lookups alike; the cache
    /// keeps the unfiltered result.
    pub fn distance(
        &self,
        request: &DistanceRequest,
        package: &Package,
    ) -> Result<DistanceResult, MethodError> {
        if let Some(f) = &self.overrides.distance {
            if let Some(result) = f(request, package) {
                return Ok(result?);
            }
        }

        let result = self.lookup(request)?;
        Ok(match &self.overrides.distance_result {
            Some(f) => f(result, package),
            None => result,
        })
    }

    fn lookup(&self, request: &DistanceRequest) -> Result<DistanceResult, MethodError> {
        let cache = self.cache.as_ref().filter(|_| !self.settings.debug);
        let key = request.cache_key();

        if let Some(cache) = cache {
            match cache.get::<DistanceResult>(&key) {
                Ok(Some(hit)) => {
                    debug!(key = %key, distance = hit.distance, "Distance cache hit");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Distance cache read failed"),
            }
        }

        let result = self.provider.distance(request)?;

        if let Some(cache) = cache {
            if let Err(e) = cache.set(&key, &result, Some(self.settings.cache_ttl)) {
                warn!(error = %e, "Distance cache write failed");
            }
        }

        Ok(result)
    }

    /// Rates for a package, or why there are none.
    pub fn try_calculate(&self, package: &Package) -> Result<Vec<Rate>, MethodError> {
        let request = DistanceRequest {
            origin: self.origin(package)?,
            destination: self.destination(package)?,
            options: self.settings.route.clone(),
        };
        let distance = self.distance(&request, package)?;
        Ok(self.rates_for_distance(&distance, package))
    }

    /// Rates for a package. Empty on any failure.
    pub fn calculate(&self, package: &Package) -> Vec<Rate> {
        match self.try_calculate(package) {
            Ok(rates) => rates,
            Err(e) => {
                if self.settings.debug {
                    info!(error = %e, "No rates offered");
                } else {
                    debug!(error = %e, "No rates offered");
                }
                Vec::new()
            }
        }
    }

    /// Rates for a package over an already known distance.
    pub fn rates_for_distance(&self, distance: &DistanceResult, package: &Package) -> Vec<Rate> {
        let mut cart = self.engine.cart(&package.items, package.subtotal);
        if let Some(f) = &self.overrides.envelope {
            cart.envelope = f(cart.envelope, package);
        }

        self.engine
            .targets()
            .into_iter()
            .filter_map(|target| {
                let slug = target.slug();
                match self.cost_for(target, distance.distance, &cart) {
                    Ok(cost) => Some(self.build_rate(slug, cost, distance)),
                    Err(e) => {
                        if self.settings.debug {
                            info!(target_slug = slug, reason = %e, "Rate skipped");
                        } else {
                            log_skipped(slug, &e);
                        }
                        None
                    }
                }
            })
            .collect()
    }

    fn cost_for(
        &self,
        target: RateTarget<'_>,
        distance: f64,
        cart: &Cart,
    ) -> Result<CostResult, RateError> {
        if let Some(f) = &self.overrides.cost {
            if let Some(result) = f(target.slug(), distance, &cart.envelope) {
                return result;
            }
        }
        self.engine.calculate(target, distance, cart)
    }

    fn build_rate(&self, slug: &str, cost: CostResult, distance: &DistanceResult) -> Rate {
        let drivers_count = cost.drivers_count.max(1);

        let mut extra = Vec::new();
        if drivers_count > 1 {
            extra.push(format!("{drivers_count} drivers"));
        }
        if self.settings.show_distance {
            extra.push(distance.distance_text.clone());
        }

        let label = if extra.is_empty() {
            cost.label
        } else {
            format!("{} ({})", cost.label, extra.join(", "))
        };

        Rate {
            id: self.rate_id(slug),
            label,
            cost: cost.total,
            meta_data: RateMeta {
                api_response: distance.clone(),
                drivers_count,
            },
        }
    }
}
