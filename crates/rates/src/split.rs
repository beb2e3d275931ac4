//! Driver splitting: how many couriers a cart needs.
//!
//! Two strategies exist. [`DriverSplitPolicy::VolumetricEstimate`] divides
//! the whole envelope by the limits; [`DriverSplitPolicy::GreedyBinPack`]
//! walks the cart in order and opens a new shipment whenever the next line
//! would overflow the current one.

use crate::envelope::{CartItem, Envelope};
use crate::error::{RateError, Result};
use crate::lenient;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A measured quantity that can be limited.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Weight,
    Width,
    Length,
    Height,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Weight => "weight",
            Dimension::Width => "width",
            Dimension::Length => "length",
            Dimension::Height => "height",
        })
    }
}

/// Per-shipment ceilings. A limit of 0 means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLimits {
    /// Max weight per driver (kg)
    pub max_weight: f64,
    /// Max width per driver (cm)
    pub max_width: f64,
    /// Max length per driver (cm)
    pub max_length: f64,
    /// Max stacked height per driver (cm)
    pub max_height: f64,
    /// Max distance (km); exceeding it rejects the service
    pub max_distance: f64,
    /// Whether a cart may be split across several drivers
    pub multiple_drivers: bool,
}

impl ServiceLimits {
    fn limit(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Weight => self.max_weight,
            Dimension::Width => self.max_width,
            Dimension::Length => self.max_length,
            Dimension::Height => self.max_height,
        }
    }

    /// Max width x length x height, or 0 when any side is unlimited.
    pub fn max_volume(&self) -> f64 {
        self.max_width * self.max_length * self.max_height
    }

    /// First dimension of `load` over its non-zero limit.
    fn first_overflow(&self, load: &Load) -> Option<(Dimension, f64, f64)> {
        [
            (Dimension::Weight, load.weight),
            (Dimension::Width, load.width),
            (Dimension::Length, load.length),
            (Dimension::Height, load.height),
        ]
        .into_iter()
        .find_map(|(dimension, value)| {
            let limit = self.limit(dimension);
            (limit > 0.0 && value > limit).then_some((dimension, value, limit))
        })
    }
}

/// Strategy used to compute the driver count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverSplitPolicy {
    /// `ceil` of envelope weight and volume over the limits
    #[default]
    VolumetricEstimate,
    /// In-order per-item packing
    GreedyBinPack,
}

/// Running contents of one shipment.
#[derive(Debug, Clone, Copy, Default)]
struct Load {
    weight: f64,
    width: f64,
    length: f64,
    height: f64,
}

impl Load {
    fn of(item: &CartItem) -> Self {
        Self {
            weight: item.line_weight(),
            width: lenient::non_negative(item.width),
            length: lenient::non_negative(item.length),
            height: item.line_height(),
        }
    }

    fn plus(self, other: Self) -> Self {
        Self {
            weight: self.weight + other.weight,
            width: self.width.max(other.width),
            length: self.length.max(other.length),
            height: self.height + other.height,
        }
    }
}

/// Count drivers by packing cart lines in order.
///
/// Any line over a limit on its own rejects the cart. Otherwise a line that
/// overflows the current shipment opens a new one, which requires
/// `multiple_drivers`.
///
/// ```
/// use gosend_rates::split::{greedy_bin_pack, ServiceLimits};
/// use gosend_rates::CartItem;
///
/// let limits = ServiceLimits { max_weight: 10.0, multiple_drivers: true, ..Default::default() };
/// let items = [CartItem::new(6.0, 0.0, 0.0, 0.0, 1), CartItem::new(6.0, 0.0, 0.0, 0.0, 1)];
/// assert_eq!(greedy_bin_pack(&items, &limits).unwrap(), 2);
/// ```
pub fn greedy_bin_pack(items: &[CartItem], limits: &ServiceLimits) -> Result<u32> {
    let lines: Vec<Load> = items
        .iter()
        .filter(|item| item.quantity > 0)
        .map(Load::of)
        .collect();

    if let Some((dimension, value, limit)) = lines.iter().find_map(|l| limits.first_overflow(l)) {
        return Err(RateError::ItemExceedsLimit {
            dimension,
            value,
            limit,
        });
    }

    let mut drivers = 1u32;
    let mut current = Load::default();

    for line in lines {
        let candidate = current.plus(line);
        if limits.first_overflow(&candidate).is_some() {
            if !limits.multiple_drivers {
                return Err(RateError::SplitNotAllowed {
                    drivers: drivers + 1,
                });
            }
            drivers += 1;
            current = line;
        } else {
            current = candidate;
        }
    }

    Ok(drivers)
}

/// Result of the volumetric estimate before limit enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// Drivers to charge for
    pub drivers: u32,
    /// Whether the cart is actually being split
    pub multiple_drivers: bool,
}

/// Estimate drivers from the envelope alone.
///
/// Ratios whose limit is 0 are skipped; the result is at least 1. A cart of
/// fewer than two units, or one needing more drivers than it has units,
/// cannot be split.
pub fn volumetric_estimate(envelope: &Envelope, limits: &ServiceLimits) -> Estimate {
    let by_weight = ceil_ratio(envelope.weight, limits.max_weight);
    let by_volume = ceil_ratio(envelope.volume(), limits.max_volume());
    let drivers = by_weight.max(by_volume).max(1);

    if envelope.quantity < 2 || drivers > envelope.quantity {
        Estimate {
            drivers: 1,
            multiple_drivers: false,
        }
    } else {
        Estimate {
            drivers,
            multiple_drivers: limits.multiple_drivers,
        }
    }
}

fn ceil_ratio(value: f64, limit: f64) -> u32 {
    if limit > 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ratio = (value / limit).ceil().min(f64::from(u32::MAX)) as u32;
        ratio
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limits(max_weight: f64, multiple_drivers: bool) -> ServiceLimits {
        ServiceLimits {
            max_weight,
            max_width: 70.0,
            max_length: 50.0,
            max_height: 50.0,
            max_distance: 40.0,
            multiple_drivers,
        }
    }

    #[test]
    fn test_weight_at_limit_is_one_driver() {
        let items = [CartItem::new(20.0, 10.0, 10.0, 10.0, 1)];
        assert_eq!(greedy_bin_pack(&items, &limits(20.0, false)).unwrap(), 1);
    }

    #[test]
    fn test_malformed_sides_measure_like_envelope() {
        let item = CartItem {
            width: f64::INFINITY,
            length: f64::NAN,
            height: -4.0,
            ..CartItem::new(2.0, 0.0, 0.0, 0.0, 2)
        };
        let load = Load::of(&item);
        let envelope = Envelope::from_items(std::slice::from_ref(&item));

        assert_eq!(load.weight, envelope.weight);
        assert_eq!(load.width, envelope.width);
        assert_eq!(load.length, envelope.length);
        assert_eq!(load.height, envelope.height);
        let items = [item];
        assert_eq!(greedy_bin_pack(&items, &limits(20.0, false)).unwrap(), 1);
    }

    #[test]
    fn test_weight_over_limit_single_item_rejected() {
        let items = [CartItem::new(20.0 + 1e-9, 10.0, 10.0, 10.0, 1)];
        let err = greedy_bin_pack(&items, &limits(20.0, true)).unwrap_err();
        assert!(matches!(
            err,
            RateError::ItemExceedsLimit {
                dimension: Dimension::Weight,
                ..
            }
        ));
    }

    #[test]
    fn test_line_quantity_counts_toward_item_check() {
        // 3 x 8 kg on one line cannot be split
        let items = [CartItem::new(8.0, 10.0, 10.0, 10.0, 3)];
        let err = greedy_bin_pack(&items, &limits(20.0, true)).unwrap_err();
        assert_eq!(err.code(), crate::error::RateErrorCode::ItemExceedsLimit);
    }

    #[test]
    fn test_overflow_opens_new_shipment() {
        let items = [
            CartItem::new(12.0, 10.0, 10.0, 10.0, 1),
            CartItem::new(12.0, 10.0, 10.0, 10.0, 1),
            CartItem::new(5.0, 10.0, 10.0, 10.0, 1),
        ];
        // [12] [12 + 5]
        assert_eq!(greedy_bin_pack(&items, &limits(20.0, true)).unwrap(), 2);
    }

    #[test]
    fn test_order_matters() {
        let limits = limits(10.0, true);
        let a = [
            CartItem::new(6.0, 1.0, 1.0, 1.0, 1),
            CartItem::new(6.0, 1.0, 1.0, 1.0, 1),
            CartItem::new(4.0, 1.0, 1.0, 1.0, 1),
            CartItem::new(4.0, 1.0, 1.0, 1.0, 1),
        ];
        let b = [a[0].clone(), a[2].clone(), a[1].clone(), a[3].clone()];
        // [6] [6 4] [4]  vs  [6 4] [6 4]
        assert_eq!(greedy_bin_pack(&a, &limits).unwrap(), 3);
        assert_eq!(greedy_bin_pack(&b, &limits).unwrap(), 2);
    }

    #[test]
    fn test_split_not_allowed() {
        let items = [
            CartItem::new(15.0, 10.0, 10.0, 10.0, 1),
            CartItem::new(15.0, 10.0, 10.0, 10.0, 1),
        ];
        let err = greedy_bin_pack(&items, &limits(20.0, false)).unwrap_err();
        assert_eq!(err, RateError::SplitNotAllowed { drivers: 2 });
    }

    #[test]
    fn test_height_stacks_and_width_does_not() {
        let limits = ServiceLimits {
            max_width: 40.0,
            max_height: 17.0,
            multiple_drivers: true,
            ..Default::default()
        };
        let items = [
            CartItem::new(0.0, 40.0, 10.0, 8.0, 1),
            CartItem::new(0.0, 40.0, 10.0, 8.0, 1),
            CartItem::new(0.0, 40.0, 10.0, 8.0, 1),
        ];
        assert_eq!(greedy_bin_pack(&items, &limits).unwrap(), 2);
    }

    #[test]
    fn test_zero_limits_skipped() {
        let items = [CartItem::new(500.0, 500.0, 500.0, 500.0, 4)];
        assert_eq!(greedy_bin_pack(&items, &ServiceLimits::default()).unwrap(), 1);
    }

    #[test]
    fn test_volumetric_multi_driver() {
        let envelope = Envelope {
            weight: 60.0,
            width: 10.0,
            length: 10.0,
            height: 10.0,
            quantity: 5,
        };
        let estimate = volumetric_estimate(&envelope, &limits(20.0, true));
        assert_eq!(
            estimate,
            Estimate {
                drivers: 3,
                multiple_drivers: true
            }
        );
    }

    #[test]
    fn test_volumetric_single_unit_never_splits() {
        let envelope = Envelope {
            weight: 60.0,
            quantity: 1,
            ..Default::default()
        };
        let estimate = volumetric_estimate(&envelope, &limits(20.0, true));
        assert_eq!(estimate.drivers, 1);
        assert!(!estimate.multiple_drivers);
    }

    #[test]
    fn test_volumetric_more_drivers_than_units() {
        let envelope = Envelope {
            weight: 100.0,
            quantity: 2,
            ..Default::default()
        };
        let estimate = volumetric_estimate(&envelope, &limits(20.0, true));
        assert_eq!(estimate.drivers, 1);
        assert!(!estimate.multiple_drivers);
    }

    #[test]
    fn test_volumetric_unlimited_is_one() {
        let envelope = Envelope {
            weight: 100.0,
            width: 100.0,
            length: 100.0,
            height: 100.0,
            quantity: 3,
        };
        assert_eq!(volumetric_estimate(&envelope, &ServiceLimits::default()).drivers, 1);
    }

    proptest! {
        #[test]
        fn prop_greedy_at_least_one_driver(
            weights in prop::collection::vec(0.0..10.0f64, 0..30),
        ) {
            let items: Vec<CartItem> = weights
                .iter()
                .map(|w| CartItem::new(*w, 1.0, 1.0, 1.0, 1))
                .collect();
            let drivers = greedy_bin_pack(&items, &limits(10.0, true)).unwrap();
            prop_assert!(drivers >= 1);
            prop_assert!(drivers as usize <= items.len().max(1));
        }
    }
}
