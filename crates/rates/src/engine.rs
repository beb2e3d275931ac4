//! Rate engine: every enabled service plus the table, over one cart.
//!
//! The engine is pure. It takes a distance that was already looked up and
//! never touches the network or a cache, so a single instance can be shared
//! across threads.

use crate::envelope::{CartItem, Envelope};
use crate::error::{RateError, Result};
use crate::service::Service;
use crate::split::DriverSplitPolicy;
use crate::table::TableRates;
use crate::units::StoreUnits;
use crate::CostResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Slug used for the table-rate quote.
pub const TABLE_RATE_SLUG: &str = "table_rate";

/// Everything the engine needs to price a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Services in display order
    pub services: Vec<Service>,
    /// Table rates, offered after the services when enabled
    pub table: TableRates,
    /// Units the cart items are given in
    pub units: StoreUnits,
    /// Policy for services that do not choose their own
    pub default_split_policy: DriverSplitPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            services: vec![Service::instant(), Service::same_day()],
            table: TableRates::default(),
            units: StoreUnits::default(),
            default_split_policy: DriverSplitPolicy::default(),
        }
    }
}

/// A cart normalised to kg/cm with its envelope and subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    /// Items in kg/cm
    pub items: Vec<CartItem>,
    /// Aggregate envelope
    pub envelope: Envelope,
    /// Order amount used by table matching
    pub subtotal: f64,
}

impl Cart {
    /// Normalise `items` from `units` and aggregate them.
    ///
    /// Without an explicit subtotal the line totals are summed.
    pub fn new(items: &[CartItem], units: StoreUnits, subtotal: Option<f64>) -> Self {
        let items = units.normalize_items(items);
        let envelope = Envelope::from_items(&items);
        let subtotal = subtotal
            .unwrap_or_else(|| items.iter().map(|item| item.line_total).sum())
            .max(0.0);

        Self {
            items,
            envelope,
            subtotal,
        }
    }

    /// Total units in the cart.
    pub fn quantity(&self) -> u32 {
        self.envelope.quantity
    }
}

/// What a quote is computed against.
#[derive(Debug, Clone, Copy)]
pub enum RateTarget<'a> {
    /// A named service
    Service(&'a Service),
    /// The table
    Table(&'a TableRates),
}

impl RateTarget<'_> {
    /// Stable identifier, also the last segment of the rate id.
    pub fn slug(&self) -> &str {
        match self {
            RateTarget::Service(service) => &service.slug,
            RateTarget::Table(_) => TABLE_RATE_SLUG,
        }
    }
}

/// One target's result. Failures are soft: they skip the target only.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Target slug
    pub slug: String,
    /// Cost, or why the target cannot ship this cart
    pub outcome: Result<CostResult>,
}

impl Quote {
    /// The cost when the target can ship.
    pub fn cost(&self) -> Option<&CostResult> {
        self.outcome.as_ref().ok()
    }
}

/// The rate engine.
#[derive(Debug, Clone, Default)]
pub struct RateEngine {
    config: EngineConfig,
}

impl RateEngine {
    /// Create an engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration this engine prices with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a cart in this engine's store units.
    pub fn cart(&self, items: &[CartItem], subtotal: Option<f64>) -> Cart {
        Cart::new(items, self.config.units, subtotal)
    }

    /// Enabled services followed by the table when it has rows.
    pub fn targets(&self) -> Vec<RateTarget<'_>> {
        let mut targets: Vec<_> = self
            .config
            .services
            .iter()
            .filter(|service| service.enabled)
            .map(RateTarget::Service)
            .collect();

        let table = &self.config.table;
        if table.enabled && !table.rows.is_empty() {
            targets.push(RateTarget::Table(table));
        }
        targets
    }

    /// Price one target.
    pub fn calculate(
        &self,
        target: RateTarget<'_>,
        distance: f64,
        cart: &Cart,
    ) -> Result<CostResult> {
        match target {
            RateTarget::Service(service) => service.calculate_cost_with(
                self.config.default_split_policy,
                distance,
                &cart.envelope,
                &cart.items,
            ),
            RateTarget::Table(table) => {
                table.calculate_cost(distance, cart.subtotal, cart.quantity(), &cart.items)
            }
        }
    }

    /// Price every target.
    ///
    /// ```
    /// use gosend_rates::{CartItem, RateEngine};
    ///
    /// let engine = RateEngine::default();
    /// let cart = engine.cart(&[CartItem::new(5.0, 10.0, 10.0, 10.0, 1)], None);
    /// let quotes = engine.quote(10.0, &cart);
    ///
    /// assert_eq!(quotes.len(), 2);
    /// assert_eq!(quotes[0].cost().unwrap().total, 25000.0);
    /// ```
    pub fn quote(&self, distance: f64, cart: &Cart) -> Vec<Quote> {
        self.targets()
            .into_iter()
            .map(|target| {
                let outcome = self.calculate(target, distance, cart);
                if let Err(err) = &outcome {
                    log_skipped(target.slug(), err);
                }
                Quote {
                    slug: target.slug().to_string(),
                    outcome,
                }
            })
            .collect()
    }
}

pub(crate) fn log_skipped(slug: &str, err: &RateError) {
    debug!(
        target_slug = slug,
        code = err.code() as u32,
        reason = %err,
        "Rate skipped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RatePerClass, RateRule};
    use crate::units::WeightUnit;

    fn engine_with_table() -> RateEngine {
        let mut config = EngineConfig::default();
        config.table = TableRates {
            enabled: true,
            rows: vec![RateRule {
                max_distance: 30.0,
                rate_per_class: RatePerClass::from([(0, 1000.0)]),
                ..Default::default()
            }],
            ..Default::default()
        };
        RateEngine::new(config)
    }

    #[test]
    fn test_end_to_end_instant() {
        let engine = RateEngine::default();
        let cart = engine.cart(&[CartItem::new(5.0, 10.0, 10.0, 10.0, 1)], None);

        let quotes = engine.quote(10.0, &cart);
        let instant = quotes[0].cost().unwrap();
        assert_eq!(quotes[0].slug, "instant");
        assert_eq!(instant.total, 25000.0);
        assert_eq!(instant.drivers_count, 1);
    }

    #[test]
    fn test_failure_skips_only_that_target() {
        let engine = RateEngine::default();
        // 10 kg: over same day's 7 kg, fine for instant
        let cart = engine.cart(&[CartItem::new(10.0, 10.0, 10.0, 10.0, 1)], None);

        let quotes = engine.quote(10.0, &cart);
        assert!(quotes[0].outcome.is_ok());
        assert!(matches!(
            quotes[1].outcome,
            Err(RateError::MaxWeightExceeded { .. })
        ));
    }

    #[test]
    fn test_disabled_service_and_empty_table_are_not_targets() {
        let mut config = EngineConfig::default();
        config.services[1].enabled = false;
        config.table.enabled = true;
        let engine = RateEngine::new(config);

        let slugs: Vec<_> = engine.targets().iter().map(|t| t.slug().to_string()).collect();
        assert_eq!(slugs, vec!["instant"]);
    }

    #[test]
    fn test_default_policy_applies_to_unpinned_services() {
        let mut config = EngineConfig {
            default_split_policy: DriverSplitPolicy::GreedyBinPack,
            ..EngineConfig::default()
        };
        config.services[0].limits.max_weight = 10.0;
        config.services[0].limits.multiple_drivers = true;
        let engine = RateEngine::new(config);

        let items: Vec<_> = [6.0, 6.0, 4.0, 4.0]
            .into_iter()
            .map(|kg| CartItem::new(kg, 10.0, 10.0, 10.0, 1))
            .collect();
        let cart = engine.cart(&items, None);

        // [6] [6 4] [4]
        let quotes = engine.quote(5.0, &cart);
        assert_eq!(quotes[0].cost().unwrap().drivers_count, 3);
    }

    #[test]
    fn test_table_quote_follows_services() {
        let engine = engine_with_table();
        let cart = engine.cart(&[CartItem::new(1.0, 10.0, 10.0, 10.0, 2)], None);

        let quotes = engine.quote(12.0, &cart);
        let table = quotes.last().unwrap();
        assert_eq!(table.slug, TABLE_RATE_SLUG);
        // progressive default: 1000 * 12 km * 2 units
        assert_eq!(table.cost().unwrap().total, 24000.0);
    }

    #[test]
    fn test_cart_converts_units_and_sums_subtotal() {
        let units = StoreUnits {
            weight: WeightUnit::G,
            ..Default::default()
        };
        let items = [
            CartItem::new(500.0, 10.0, 10.0, 10.0, 2).with_line_total(30000.0),
            CartItem::new(250.0, 10.0, 10.0, 10.0, 1).with_line_total(12000.0),
        ];

        let cart = Cart::new(&items, units, None);
        assert!((cart.envelope.weight - 1.25).abs() < 1e-9);
        assert_eq!(cart.subtotal, 42000.0);
        assert_eq!(cart.quantity(), 3);

        assert_eq!(Cart::new(&items, units, Some(5.0)).subtotal, 5.0);
    }
}
