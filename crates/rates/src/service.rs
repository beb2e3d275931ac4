//! Named courier services with hard limits and per-kilometre pricing.

use crate::envelope::{CartItem, Envelope};
use crate::error::{RateError, Result};
use crate::split::{greedy_bin_pack, volumetric_estimate, DriverSplitPolicy, ServiceLimits};
use crate::CostResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-kilometre pricing with optional floor and cap.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    /// Cost per km beyond `per_km_min_distance`
    pub per_km_cost: f64,
    /// Distance included before per-km charging starts
    pub per_km_min_distance: f64,
    /// Floor for one driver (0 = none)
    pub min_cost: f64,
    /// Cap for one driver (0 = none); ignored when the floor applies
    pub max_cost: f64,
}

impl Pricing {
    /// Cost of one driver for `distance`.
    ///
    /// ```
    /// use gosend_rates::service::Pricing;
    ///
    /// let pricing = Pricing { per_km_cost: 1000.0, min_cost: 10000.0, ..Default::default() };
    /// assert_eq!(pricing.single_driver_cost(5.0), 10000.0);
    /// ```
    pub fn single_driver_cost(&self, distance: f64) -> f64 {
        let charged = distance - self.per_km_min_distance;
        let raw = if self.per_km_cost > 0.0 && charged > 0.0 {
            charged * self.per_km_cost
        } else {
            0.0
        };

        if self.min_cost > 0.0 && raw < self.min_cost {
            self.min_cost
        } else if self.max_cost > 0.0 && raw > self.max_cost {
            self.max_cost
        } else {
            raw
        }
    }
}

/// A fully resolved service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Stable identifier used in rate ids
    pub slug: String,
    /// Label shown to the customer
    pub title: String,
    /// Disabled services are skipped
    pub enabled: bool,
    /// Pricing
    pub pricing: Pricing,
    /// Limits
    pub limits: ServiceLimits,
    /// How drivers are counted; `None` defers to the engine default
    #[serde(default)]
    pub split_policy: Option<DriverSplitPolicy>,
}

impl Service {
    /// GoSend Instant defaults.
    pub fn instant() -> Self {
        Self {
            slug: "instant".to_string(),
            title: "GoSend Instant".to_string(),
            enabled: true,
            pricing: Pricing {
                per_km_cost: 2500.0,
                per_km_min_distance: 0.0,
                min_cost: 25000.0,
                max_cost: 0.0,
            },
            limits: ServiceLimits {
                max_weight: 20.0,
                max_width: 70.0,
                max_length: 50.0,
                max_height: 50.0,
                max_distance: 40.0,
                multiple_drivers: false,
            },
            split_policy: None,
        }
    }

    /// GoSend Same Day defaults.
    pub fn same_day() -> Self {
        Self {
            slug: "same_day".to_string(),
            title: "GoSend Same Day".to_string(),
            enabled: true,
            pricing: Pricing {
                per_km_cost: 2500.0,
                per_km_min_distance: 15.0,
                min_cost: 15000.0,
                max_cost: 25000.0,
            },
            limits: ServiceLimits {
                max_weight: 7.0,
                max_width: 40.0,
                max_length: 40.0,
                max_height: 17.0,
                max_distance: 40.0,
                multiple_drivers: false,
            },
            split_policy: None,
        }
    }

    /// Built-in defaults for a known slug.
    pub fn preset(slug: &str) -> Option<Self> {
        match slug {
            "instant" => Some(Self::instant()),
            "same_day" => Some(Self::same_day()),
            _ => None,
        }
    }

    /// Label for rates: the title, or the slug when the title is blank.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.slug
        } else {
            &self.title
        }
    }

    /// Cost of delivering `items` over `distance`, counting drivers with
    /// the service's own policy or the default one.
    pub fn calculate_cost(
        &self,
        distance: f64,
        envelope: &Envelope,
        items: &[CartItem],
    ) -> Result<CostResult> {
        self.calculate_cost_with(DriverSplitPolicy::default(), distance, envelope, items)
    }

    /// Cost of delivering `items` over `distance`; `fallback` counts drivers
    /// when the service does not choose a policy.
    ///
    /// `max_distance` is inclusive: a distance equal to it is accepted.
    pub fn calculate_cost_with(
        &self,
        fallback: DriverSplitPolicy,
        distance: f64,
        envelope: &Envelope,
        items: &[CartItem],
    ) -> Result<CostResult> {
        let limits = &self.limits;
        let policy = self.split_policy.unwrap_or(fallback);

        if limits.max_distance > 0.0 && distance > limits.max_distance {
            return Err(RateError::MaxDistanceExceeded {
                service: self.slug.clone(),
                distance,
                max: limits.max_distance,
            });
        }

        let drivers = match policy {
            DriverSplitPolicy::VolumetricEstimate => {
                let estimate = volumetric_estimate(envelope, limits);
                if estimate.multiple_drivers {
                    estimate.drivers
                } else {
                    self.check_single_driver(envelope)?;
                    1
                }
            }
            DriverSplitPolicy::GreedyBinPack => greedy_bin_pack(items, limits)?,
        };

        let per_driver = self.pricing.single_driver_cost(distance);
        let total = per_driver * f64::from(drivers);

        debug!(
            service = %self.slug,
            distance,
            drivers,
            per_driver,
            total,
            policy = ?policy,
            "Service cost calculated"
        );

        Ok(CostResult {
            total,
            drivers_count: drivers,
            label: self.label().to_string(),
        })
    }

    fn check_single_driver(&self, envelope: &Envelope) -> Result<()> {
        let limits = &self.limits;

        if limits.max_weight > 0.0 && envelope.weight > limits.max_weight {
            return Err(RateError::MaxWeightExceeded {
                service: self.slug.clone(),
                weight: envelope.weight,
                max: limits.max_weight,
            });
        }

        let max_volume = limits.max_volume();
        if max_volume > 0.0 && envelope.volume() > max_volume {
            return Err(RateError::MaxDimensionExceeded {
                service: self.slug.clone(),
                volume: envelope.volume(),
                max: max_volume,
            });
        }

        Ok(())
    }
}

/// Service settings as written in configuration.
///
/// Unset fields fall back to the preset with the same slug, then to
/// "unlimited"/zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identifier (`instant`, `same_day` or custom)
    pub slug: String,
    /// Defaults to true
    pub enabled: Option<bool>,
    /// Label
    pub title: Option<String>,
    /// Cost per km
    pub per_km_cost: Option<f64>,
    /// Free distance before per-km charging
    pub per_km_min_distance: Option<f64>,
    /// Cost floor
    pub min_cost: Option<f64>,
    /// Cost cap
    pub max_cost: Option<f64>,
    /// Max weight (kg)
    pub max_weight: Option<f64>,
    /// Max width (cm)
    pub max_width: Option<f64>,
    /// Max length (cm)
    pub max_length: Option<f64>,
    /// Max height (cm)
    pub max_height: Option<f64>,
    /// Max distance (km)
    pub max_distance: Option<f64>,
    /// Allow splitting across drivers
    pub multiple_drivers: Option<bool>,
    /// Driver counting strategy; defaults to the engine-wide policy
    pub split_policy: Option<DriverSplitPolicy>,
}

impl ServiceConfig {
    /// Settings for a slug with every field unset.
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Self::default()
        }
    }

    /// Resolve against the preset for this slug.
    pub fn resolve(&self) -> Service {
        let base = Service::preset(&self.slug).unwrap_or_else(|| Service {
            slug: self.slug.clone(),
            title: String::new(),
            enabled: true,
            pricing: Pricing::default(),
            limits: ServiceLimits::default(),
            split_policy: None,
        });

        Service {
            slug: self.slug.clone(),
            title: self.title.clone().unwrap_or(base.title),
            enabled: self.enabled.unwrap_or(base.enabled),
            pricing: Pricing {
                per_km_cost: self.per_km_cost.unwrap_or(base.pricing.per_km_cost),
                per_km_min_distance: self
                    .per_km_min_distance
                    .unwrap_or(base.pricing.per_km_min_distance),
                min_cost: self.min_cost.unwrap_or(base.pricing.min_cost),
                max_cost: self.max_cost.unwrap_or(base.pricing.max_cost),
            },
            limits: ServiceLimits {
                max_weight: self.max_weight.unwrap_or(base.limits.max_weight),
                max_width: self.max_width.unwrap_or(base.limits.max_width),
                max_length: self.max_length.unwrap_or(base.limits.max_length),
                max_height: self.max_height.unwrap_or(base.limits.max_height),
                max_distance: self.max_distance.unwrap_or(base.limits.max_distance),
                multiple_drivers: self.multiple_drivers.unwrap_or(base.limits.multiple_drivers),
            },
            split_policy: self.split_policy.or(base.split_policy),
        }
    }
}
