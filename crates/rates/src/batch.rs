//! Pricing many packages at once, in parallel when the `parallel` feature
//! is enabled.

use crate::engine::{Cart, Quote, RateEngine};
use crate::method::{Package, Rate, ShippingMethod};

/// Rates for every package, in input order.
///
/// Distance lookups go through the method's provider and cache, so a
/// blocking provider is called from several threads at once.
pub fn calculate_rates(method: &ShippingMethod, packages: &[Package]) -> Vec<Vec<Rate>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        packages.par_iter().map(|package| method.calculate(package)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        packages.iter().map(|package| method.calculate(package)).collect()
    }
}

/// Quotes for carts whose distance is already known.
///
/// ```
/// use gosend_rates::{batch::quote_many, CartItem, RateEngine};
///
/// let engine = RateEngine::default();
/// let carts = vec![
///     (5.0, engine.cart(&[CartItem::new(1.0, 10.0, 10.0, 10.0, 1)], None)),
///     (50.0, engine.cart(&[CartItem::new(1.0, 10.0, 10.0, 10.0, 1)], None)),
/// ];
///
/// let quotes = quote_many(&engine, &carts);
/// assert!(quotes[0].iter().all(|q| q.outcome.is_ok()));
/// assert!(quotes[1].iter().all(|q| q.outcome.is_err()));
/// ```
pub fn quote_many(engine: &RateEngine, carts: &[(f64, Cart)]) -> Vec<Vec<Quote>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        carts
            .par_iter()
            .map(|(distance, cart)| engine.quote(*distance, cart))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        carts
            .iter()
            .map(|(distance, cart)| engine.quote(*distance, cart))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Location, StraightLineProvider};
    use crate::envelope::CartItem;
    use crate::method::{Destination, MethodSettings};
    use crate::Coordinate;
    use std::sync::Arc;

    #[test]
    fn test_batch_keeps_order() {
        let settings = MethodSettings {
            origin: Some(Location::Coordinates(Coordinate::new(-6.175_392, 106.827_153))),
            ..Default::default()
        };
        let provider = Arc::new(StraightLineProvider::default());
        let method = ShippingMethod::new(settings, RateEngine::default(), provider)
            .with_destination_override(Box::new(|package: &Package, _: u32| {
                Some(package.destination.address_1.clone())
            }));

        let package = |destination: &str, weight: f64| Package {
            items: vec![CartItem::new(weight, 10.0, 10.0, 10.0, 1)],
            destination: Destination {
                address_1: destination.to_string(),
                ..Default::default()
            },
            subtotal: None,
        };
        let packages = vec![
            package("-6.195004,106.823003", 1.0),
            package("Jakarta", 1.0),
            package("-6.195004,106.823003", 10.0),
        ];

        let rates = calculate_rates(&method, &packages);
        assert_eq!(rates.len(), 3);
        assert_eq!(rates[0].len(), 2);
        // straight-line provider cannot route addresses
        assert!(rates[1].is_empty());
        // 10 kg is over the same day weight limit
        assert_eq!(rates[2].len(), 1);
    }
}
