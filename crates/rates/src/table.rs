//! Table rates: a list of distance/order brackets with per-class pricing.
//!
//! Matching picks the rows whose bounds contain the request, keeps those
//! with the smallest `max_distance`, and takes the first of them in table
//! order. Bounds equal to 0 are unset.

use crate::envelope::CartItem;
use crate::error::{RateError, Result};
use crate::{lenient, CostResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// How per-item costs combine into the shipment cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum TotalCostType {
    /// Cheapest item cost
    FlatLowest,
    /// Mean item cost
    FlatAverage,
    /// Most expensive item cost
    FlatHighest,
    /// One cost per product, summed (last line per product wins)
    ProgressivePerProduct,
    /// One cost per shipping class, summed (last line per class wins)
    ProgressivePerShippingClass,
    /// Item cost x quantity, summed
    ProgressiveDefault,
    /// Use the table-level setting
    #[default]
    Inherit,
}

impl TotalCostType {
    /// Configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            TotalCostType::FlatLowest => "flat__lowest",
            TotalCostType::FlatAverage => "flat__average",
            TotalCostType::FlatHighest => "flat__highest",
            TotalCostType::ProgressivePerProduct => "progressive__per_product",
            TotalCostType::ProgressivePerShippingClass => "progressive__per_shipping_class",
            TotalCostType::ProgressiveDefault => "progressive__default",
            TotalCostType::Inherit => "inherit",
        }
    }

    /// Replace `Inherit` with `fallback`, and an inherited `Inherit` with
    /// `ProgressiveDefault`.
    pub fn resolve(self, fallback: TotalCostType) -> TotalCostType {
        match (self, fallback) {
            (TotalCostType::Inherit, TotalCostType::Inherit) => TotalCostType::ProgressiveDefault,
            (TotalCostType::Inherit, other) => other,
            (own, _) => own,
        }
    }
}

impl From<String> for TotalCostType {
    fn from(value: String) -> Self {
        match value.trim() {
            "flat__lowest" => TotalCostType::FlatLowest,
            "flat__average" => TotalCostType::FlatAverage,
            "flat__highest" => TotalCostType::FlatHighest,
            "progressive__per_product" => TotalCostType::ProgressivePerProduct,
            "progressive__per_shipping_class" => TotalCostType::ProgressivePerShippingClass,
            "progressive__default" => TotalCostType::ProgressiveDefault,
            _ => TotalCostType::Inherit,
        }
    }
}

impl From<TotalCostType> for String {
    fn from(value: TotalCostType) -> Self {
        value.as_str().to_string()
    }
}

impl<'de> Deserialize<'de> for TotalCostType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        lenient::text(deserializer).map(Self::from)
    }
}

impl fmt::Display for TotalCostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a surcharge or discount is an amount or a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum AdjustmentType {
    /// Added or subtracted as is
    #[default]
    Fixed,
    /// Percentage of the running cost
    Percent,
}

impl From<String> for AdjustmentType {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("percent") {
            AdjustmentType::Percent
        } else {
            AdjustmentType::Fixed
        }
    }
}

impl From<AdjustmentType> for String {
    fn from(value: AdjustmentType) -> Self {
        match value {
            AdjustmentType::Fixed => "fixed".to_string(),
            AdjustmentType::Percent => "percent".to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for AdjustmentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        lenient::text(deserializer).map(Self::from)
    }
}

impl AdjustmentType {
    /// The amount `value` adds to (or removes from) `cost`.
    pub fn amount(self, cost: f64, value: f64) -> f64 {
        match self {
            AdjustmentType::Fixed => value,
            AdjustmentType::Percent => cost * value / 100.0,
        }
    }
}

/// Per-km rate by shipping class id; class 0 is the default rate.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RatePerClass(pub BTreeMap<u64, f64>);

impl RatePerClass {
    /// Class 0 rate.
    pub fn default_rate(&self) -> f64 {
        self.0.get(&0).copied().unwrap_or(0.0)
    }

    /// Rate for `class_id`: its override if one is configured, else the
    /// default rate.
    pub fn rate_for(&self, class_id: u64) -> f64 {
        match self.0.get(&class_id) {
            Some(rate) if class_id != 0 => *rate,
            _ => self.default_rate(),
        }
    }
}

impl<const N: usize> From<[(u64, f64); N]> for RatePerClass {
    fn from(entries: [(u64, f64); N]) -> Self {
        Self(entries.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for RatePerClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // keys arrive as strings in both TOML and JSON
        let serde_json::Value::Object(raw) = serde_json::Value::deserialize(deserializer)? else {
            return Ok(Self::default());
        };
        let rates = raw
            .into_iter()
            .filter_map(|(key, value)| {
                let class_id = key.trim().parse::<u64>().ok()?;
                let rate = lenient::number(value).unwrap_or(0.0);
                Some((class_id, rate))
            })
            .collect();
        Ok(Self(rates))
    }
}

/// One row of the rate table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateRule {
    /// Upper distance bound (inclusive)
    #[serde(deserialize_with = "lenient::number")]
    pub max_distance: f64,
    /// Lower quantity bound (0 = unset)
    #[serde(deserialize_with = "lenient::count")]
    pub min_order_quantity: u32,
    /// Upper quantity bound (0 = unset)
    #[serde(deserialize_with = "lenient::count")]
    pub max_order_quantity: u32,
    /// Lower subtotal bound (0 = unset)
    #[serde(deserialize_with = "lenient::number")]
    pub min_order_amount: f64,
    /// Upper subtotal bound (0 = unset)
    #[serde(deserialize_with = "lenient::number")]
    pub max_order_amount: f64,
    /// Per-km rate by shipping class
    pub rate_per_class: RatePerClass,
    /// Cost floor (0 = table default)
    #[serde(deserialize_with = "lenient::number")]
    pub min_cost: f64,
    /// Surcharge value
    #[serde(deserialize_with = "lenient::number")]
    pub surcharge: f64,
    /// Surcharge kind
    pub surcharge_type: AdjustmentType,
    /// Discount value
    #[serde(deserialize_with = "lenient::number")]
    pub discount: f64,
    /// Discount kind
    pub discount_type: AdjustmentType,
    /// Aggregation of item costs
    pub total_cost_type: TotalCostType,
    /// Label override (blank = table title)
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
}

/// Identity of a row for uniqueness checks.
pub type RowBounds = (u64, u32, u32, u64, u64);

impl RateRule {
    /// Whether this row applies.
    pub fn matches(&self, distance: f64, subtotal: f64, quantity: u32) -> bool {
        if distance > self.max_distance {
            return false;
        }
        if self.min_order_amount > 0.0 && subtotal < self.min_order_amount {
            return false;
        }
        if self.max_order_amount > 0.0 && subtotal > self.max_order_amount {
            return false;
        }
        if self.min_order_quantity > 0 && quantity < self.min_order_quantity {
            return false;
        }
        if self.max_order_quantity > 0 && quantity > self.max_order_quantity {
            return false;
        }
        true
    }

    /// Bounds tuple, with floats compared bitwise.
    pub fn bounds(&self) -> RowBounds {
        (
            self.max_distance.to_bits(),
            self.min_order_quantity,
            self.max_order_quantity,
            self.min_order_amount.to_bits(),
            self.max_order_amount.to_bits(),
        )
    }

    /// Cost of one unit of `item` over `distance`.
    pub fn item_cost(&self, item: &CartItem, distance: f64) -> f64 {
        self.rate_per_class.rate_for(item.shipping_class_id) * distance
    }

    /// Combine item costs according to `cost_type` (already resolved).
    pub fn aggregate(&self, items: &[CartItem], distance: f64, cost_type: TotalCostType) -> f64 {
        let lines: Vec<(&CartItem, f64)> = items
            .iter()
            .filter(|item| item.quantity > 0)
            .map(|item| (item, self.item_cost(item, distance)))
            .collect();

        if lines.is_empty() {
            return 0.0;
        }

        match cost_type {
            TotalCostType::FlatLowest => {
                lines.iter().map(|(_, c)| *c).fold(f64::INFINITY, f64::min)
            }
            TotalCostType::FlatHighest => lines.iter().map(|(_, c)| *c).fold(0.0, f64::max),
            TotalCostType::FlatAverage => {
                #[allow(clippy::cast_precision_loss)]
                let count = lines.len() as f64;
                lines.iter().map(|(_, c)| *c).sum::<f64>() / count
            }
            TotalCostType::ProgressivePerShippingClass => lines
                .iter()
                .map(|(item, cost)| (item.shipping_class_id, *cost))
                .collect::<BTreeMap<_, _>>()
                .values()
                .sum(),
            TotalCostType::ProgressivePerProduct => lines
                .iter()
                .map(|(item, cost)| (item.product_id, *cost))
                .collect::<BTreeMap<_, _>>()
                .values()
                .sum(),
            TotalCostType::ProgressiveDefault | TotalCostType::Inherit => lines
                .iter()
                .map(|(item, cost)| cost * f64::from(item.quantity))
                .sum(),
        }
    }
}

/// The table-rate variant of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRates {
    /// Offer table rates at all
    pub enabled: bool,
    /// Label when a row has no title
    pub title: String,
    /// Floor when a row has none
    pub default_min_cost: f64,
    /// Aggregation when a row says inherit
    pub default_total_cost_type: TotalCostType,
    /// Rows in priority order
    pub rows: Vec<RateRule>,
}

impl Default for TableRates {
    fn default() -> Self {
        Self {
            enabled: false,
            title: "GoSend".to_string(),
            default_min_cost: 0.0,
            default_total_cost_type: TotalCostType::ProgressiveDefault,
            rows: Vec::new(),
        }
    }
}

impl TableRates {
    /// Row that applies to the request.
    ///
    /// ```
    /// use gosend_rates::table::{RateRule, TableRates};
    ///
    /// let table = TableRates {
    ///     rows: vec![
    ///         RateRule { max_distance: 20.0, ..Default::default() },
    ///         RateRule { max_distance: 10.0, ..Default::default() },
    ///     ],
    ///     ..Default::default()
    /// };
    /// assert_eq!(table.select(5.0, 0.0, 1).unwrap().max_distance, 10.0);
    /// ```
    pub fn select(&self, distance: f64, subtotal: f64, quantity: u32) -> Result<&RateRule> {
        self.rows
            .iter()
            .filter(|row| row.matches(distance, subtotal, quantity))
            .fold(None::<&RateRule>, |best, row| match best {
                Some(current) if current.max_distance <= row.max_distance => Some(current),
                _ => Some(row),
            })
            .ok_or(RateError::NoMatchingRule {
                distance,
                subtotal,
                quantity,
            })
    }

    /// Indices of rows that repeat an earlier row's bounds.
    pub fn duplicate_rows(&self) -> Vec<(usize, usize)> {
        let mut seen: BTreeMap<RowBounds, usize> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            match seen.get(&row.bounds()) {
                Some(first) => duplicates.push((*first, index)),
                None => {
                    seen.insert(row.bounds(), index);
                }
            }
        }
        duplicates
    }

    /// Table-rate cost for the cart. Always one driver.
    pub fn calculate_cost(
        &self,
        distance: f64,
        subtotal: f64,
        quantity: u32,
        items: &[CartItem],
    ) -> Result<CostResult> {
        let row = self.select(distance, subtotal, quantity)?;
        let cost_type = row.total_cost_type.resolve(self.default_total_cost_type);

        let mut cost = row.aggregate(items, distance, cost_type);

        let min_cost = if row.min_cost > 0.0 {
            row.min_cost
        } else {
            self.default_min_cost
        };
        if min_cost > 0.0 && cost < min_cost {
            cost = min_cost;
        }

        cost += row.surcharge_type.amount(cost, row.surcharge);
        cost -= row.discount_type.amount(cost, row.discount);
        let total = cost.max(0.0);

        let label = if row.title.trim().is_empty() {
            self.title.clone()
        } else {
            row.title.clone()
        };

        debug!(
            distance,
            subtotal,
            quantity,
            max_distance = row.max_distance,
            cost_type = %cost_type,
            total,
            "Table rate calculated"
        );

        Ok(CostResult {
            total,
            drivers_count: 1,
            label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(max_distance: f64, default_rate: f64) -> RateRule {
        RateRule {
            max_distance,
            rate_per_class: RatePerClass::from([(0, default_rate)]),
            ..Default::default()
        }
    }

    fn table(rows: Vec<RateRule>) -> TableRates {
        TableRates {
            enabled: true,
            rows,
            ..Default::default()
        }
    }

    #[test]
    fn test_nearest_bound_wins() {
        let t = table(vec![row(20.0, 1.0), row(10.0, 2.0)]);
        assert_eq!(t.select(5.0, 0.0, 1).unwrap().max_distance, 10.0);
    }

    #[test]
    fn test_first_row_wins_within_group() {
        let mut first = row(10.0, 1.0);
        first.title = "first".into();
        let mut second = row(10.0, 2.0);
        second.title = "second".into();
        second.min_order_quantity = 1;

        let t = table(vec![row(30.0, 9.0), first, second]);
        assert_eq!(t.select(5.0, 0.0, 3).unwrap().title, "first");
    }

    #[test]
    fn test_no_matching_rule() {
        let t = table(vec![row(10.0, 1.0)]);
        let err = t.select(10.5, 0.0, 1).unwrap_err();
        assert!(matches!(err, RateError::NoMatchingRule { .. }));
    }

    #[test]
    fn test_amount_and_quantity_bounds() {
        let bounded = RateRule {
            min_order_amount: 100.0,
            max_order_amount: 500.0,
            min_order_quantity: 2,
            max_order_quantity: 4,
            ..row(10.0, 1.0)
        };

        assert!(bounded.matches(5.0, 100.0, 2));
        assert!(bounded.matches(5.0, 500.0, 4));
        assert!(!bounded.matches(5.0, 99.0, 2));
        assert!(!bounded.matches(5.0, 501.0, 2));
        assert!(!bounded.matches(5.0, 200.0, 1));
        assert!(!bounded.matches(5.0, 200.0, 5));
    }

    #[test]
    fn test_class_override_and_default_rate() {
        let rates = RatePerClass::from([(0, 1000.0), (7, 1500.0)]);
        assert_eq!(rates.rate_for(7), 1500.0);
        assert_eq!(rates.rate_for(3), 1000.0);
        assert_eq!(rates.rate_for(0), 1000.0);
    }

    fn cart() -> Vec<CartItem> {
        vec![
            CartItem::new(1.0, 1.0, 1.0, 1.0, 2).with_product(1).with_class(0),
            CartItem::new(1.0, 1.0, 1.0, 1.0, 1).with_product(2).with_class(7),
            CartItem::new(1.0, 1.0, 1.0, 1.0, 3).with_product(1).with_class(7),
        ]
    }

    fn priced_row() -> RateRule {
        RateRule {
            max_distance: 50.0,
            rate_per_class: RatePerClass::from([(0, 1000.0), (7, 2000.0)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_aggregations() {
        let r = priced_row();
        // item costs at 2 km: 2000, 4000, 4000
        assert_eq!(r.aggregate(&cart(), 2.0, TotalCostType::FlatLowest), 2000.0);
        assert_eq!(r.aggregate(&cart(), 2.0, TotalCostType::FlatHighest), 4000.0);
        let average = r.aggregate(&cart(), 2.0, TotalCostType::FlatAverage);
        assert!((average - 10000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_progressive_per_class_one_cost_per_class() {
        // class 0 -> 2000, class 7 -> 4000 once, although two lines are class 7
        let r = priced_row();
        assert_eq!(r.aggregate(&cart(), 2.0, TotalCostType::ProgressivePerShippingClass), 6000.0);
    }

    #[test]
    fn test_progressive_per_product_last_wins() {
        // product 1 appears twice: class 0 (2000) then class 7 (4000); last wins
        let r = priced_row();
        assert_eq!(r.aggregate(&cart(), 2.0, TotalCostType::ProgressivePerProduct), 8000.0);
    }

    #[test]
    fn test_progressive_default_multiplies_quantity() {
        let r = priced_row();
        // 2000*2 + 4000*1 + 4000*3
        assert_eq!(r.aggregate(&cart(), 2.0, TotalCostType::ProgressiveDefault), 20000.0);
    }

    #[test]
    fn test_inherit_resolution() {
        assert_eq!(
            TotalCostType::Inherit.resolve(TotalCostType::FlatHighest),
            TotalCostType::FlatHighest
        );
        assert_eq!(
            TotalCostType::Inherit.resolve(TotalCostType::Inherit),
            TotalCostType::ProgressiveDefault
        );
        assert_eq!(
            TotalCostType::FlatLowest.resolve(TotalCostType::FlatHighest),
            TotalCostType::FlatLowest
        );
    }

    #[test]
    fn test_min_cost_surcharge_discount() {
        let mut r = priced_row();
        r.min_cost = 5000.0;
        r.surcharge = 10.0;
        r.surcharge_type = AdjustmentType::Percent;
        r.discount = 500.0;
        r.discount_type = AdjustmentType::Fixed;
        r.title = "Near".into();
        let t = table(vec![r]);

        let items = vec![CartItem::new(1.0, 1.0, 1.0, 1.0, 1)];
        // 1000 x 1 km = 1000 -> floor 5000 -> +10% 5500 -> -500 = 5000
        let cost = t.calculate_cost(1.0, 0.0, 1, &items).unwrap();
        assert_eq!(cost.total, 5000.0);
        assert_eq!(cost.drivers_count, 1);
        assert_eq!(cost.label, "Near");
    }

    #[test]
    fn test_default_min_cost_and_title() {
        let t = TableRates {
            default_min_cost: 7000.0,
            title: "GoSend Table".into(),
            ..table(vec![priced_row()])
        };
        let cost = t
            .calculate_cost(1.0, 0.0, 1, &[CartItem::new(1.0, 1.0, 1.0, 1.0, 1)])
            .unwrap();
        assert_eq!(cost.total, 7000.0);
        assert_eq!(cost.label, "GoSend Table");
    }

    #[test]
    fn test_discount_never_negative() {
        let mut r = priced_row();
        r.discount = 150.0;
        r.discount_type = AdjustmentType::Percent;
        let cost = table(vec![r])
            .calculate_cost(1.0, 0.0, 1, &[CartItem::new(1.0, 1.0, 1.0, 1.0, 1)])
            .unwrap();
        assert_eq!(cost.total, 0.0);
    }

    #[test]
    fn test_duplicate_rows() {
        let t = table(vec![row(10.0, 1.0), row(20.0, 1.0), row(10.0, 5.0)]);
        assert_eq!(t.duplicate_rows(), vec![(0, 2)]);
    }

    #[test]
    fn test_malformed_row_normalised() {
        let r: RateRule = serde_json::from_str(
            r#"{
                "max_distance": "15",
                "min_order_quantity": "",
                "rate_per_class": {"0": "1200", "3": "abc", "x": 5},
                "surcharge_type": "bogus",
                "discount_type": null,
                "total_cost_type": "something",
                "title": null
            }"#,
        )
        .unwrap();

        assert_eq!(r.max_distance, 15.0);
        assert_eq!(r.min_order_quantity, 0);
        assert_eq!(r.rate_per_class.default_rate(), 1200.0);
        assert_eq!(r.rate_per_class.rate_for(3), 0.0);
        assert_eq!(r.rate_per_class.0.len(), 2);
        assert_eq!(r.surcharge_type, AdjustmentType::Fixed);
        assert_eq!(r.discount_type, AdjustmentType::Fixed);
        assert_eq!(r.total_cost_type, TotalCostType::Inherit);
        assert!(r.title.is_empty());
    }

    #[test]
    fn test_table_from_toml() {
        let t: TableRates = toml::from_str(
            r#"
            enabled = true
            default_total_cost_type = "flat__highest"

            [[rows]]
            max_distance = 10
            total_cost_type = "progressive__per_product"
            rate_per_class = { "0" = 1000, "4" = 1500 }
            "#,
        )
        .unwrap();

        assert!(t.enabled);
        assert_eq!(t.default_total_cost_type, TotalCostType::FlatHighest);
        assert_eq!(t.rows[0].rate_per_class.rate_for(4), 1500.0);
        assert_eq!(t.rows[0].total_cost_type, TotalCostType::ProgressivePerProduct);
    }

    proptest! {
        #[test]
        fn prop_zero_percent_adjustments_are_identity(
            rate in 0.0..5000.0f64,
            distance in 0.1..40.0f64,
            qty in 1u32..5,
        ) {
            let r = RateRule {
                max_distance: 50.0,
                rate_per_class: RatePerClass::from([(0, rate)]),
                surcharge: 0.0,
                surcharge_type: AdjustmentType::Percent,
                discount: 0.0,
                discount_type: AdjustmentType::Percent,
                ..Default::default()
            };
            let items = vec![CartItem::new(1.0, 1.0, 1.0, 1.0, qty)];
            let t = table(vec![r.clone()]);

            let expected = r.aggregate(&items, distance, TotalCostType::ProgressiveDefault);
            let cost = t.calculate_cost(distance, 0.0, qty, &items).unwrap();
            prop_assert_eq!(cost.total, expected);
        }
    }
}
