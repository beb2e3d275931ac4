//! Cart line items and their aggregate envelope.

use crate::lenient;
use serde::{Deserialize, Serialize};

/// One cart line: per-unit measurements plus the quantity ordered.
///
/// Every numeric field tolerates malformed input and falls back to 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartItem {
    /// Product id, used by per-product table pricing
    #[serde(default, deserialize_with = "lenient::id")]
    pub product_id: u64,
    /// Shipping class id (0 = no class)
    #[serde(default, deserialize_with = "lenient::id")]
    pub shipping_class_id: u64,
    /// Per-unit weight (kg after normalisation)
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    /// Per-unit width (cm after normalisation)
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    /// Per-unit length (cm after normalisation)
    #[serde(default, deserialize_with = "lenient::number")]
    pub length: f64,
    /// Per-unit height (cm after normalisation)
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: f64,
    /// Units ordered
    #[serde(default, deserialize_with = "lenient::count")]
    pub quantity: u32,
    /// Line total in store currency, used for the cart subtotal
    #[serde(default, deserialize_with = "lenient::number")]
    pub line_total: f64,
}

impl CartItem {
    /// Build an item from measurements only.
    pub fn new(weight: f64, width: f64, length: f64, height: f64, quantity: u32) -> Self {
        Self {
            weight: lenient::non_negative(weight),
            width: lenient::non_negative(width),
            length: lenient::non_negative(length),
            height: lenient::non_negative(height),
            quantity,
            ..Self::default()
        }
    }

    /// Set the product id.
    #[must_use]
    pub fn with_product(mut self, product_id: u64) -> Self {
        self.product_id = product_id;
        self
    }

    /// Set the shipping class id.
    #[must_use]
    pub fn with_class(mut self, shipping_class_id: u64) -> Self {
        self.shipping_class_id = shipping_class_id;
        self
    }

    /// Set the line total.
    #[must_use]
    pub fn with_line_total(mut self, line_total: f64) -> Self {
        self.line_total = lenient::non_negative(line_total);
        self
    }

    /// Weight of the whole line (weight x quantity).
    #[inline]
    pub fn line_weight(&self) -> f64 {
        lenient::non_negative(self.weight) * f64::from(self.quantity)
    }

    /// Height of the whole line when units are stacked (height x quantity).
    #[inline]
    pub fn line_height(&self) -> f64 {
        lenient::non_negative(self.height) * f64::from(self.quantity)
    }
}

/// Aggregate physical properties of a cart.
///
/// Weight and height are summed over units, width and length are the
/// largest seen on any line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Total weight (kg)
    pub weight: f64,
    /// Widest line (cm)
    pub width: f64,
    /// Longest line (cm)
    pub length: f64,
    /// Stacked height (cm)
    pub height: f64,
    /// Total units
    pub quantity: u32,
}

impl Envelope {
    /// Aggregate cart lines. Lines with quantity 0 are ignored.
    ///
    /// ```
    /// use gosend_rates::{CartItem, Envelope};
    ///
    /// let envelope = Envelope::from_items(&[
    ///     CartItem::new(2.0, 10.0, 30.0, 5.0, 3),
    ///     CartItem::new(1.0, 20.0, 15.0, 4.0, 1),
    /// ]);
    /// assert_eq!(envelope.weight, 7.0);
    /// assert_eq!(envelope.width, 20.0);
    /// assert_eq!(envelope.length, 30.0);
    /// assert_eq!(envelope.height, 19.0);
    /// assert_eq!(envelope.quantity, 4);
    /// ```
    pub fn from_items(items: &[CartItem]) -> Self {
        items
            .iter()
            .filter(|item| item.quantity > 0)
            .fold(Self::default(), |acc, item| Self {
                weight: acc.weight + item.line_weight(),
                width: acc.width.max(lenient::non_negative(item.width)),
                length: acc.length.max(lenient::non_negative(item.length)),
                height: acc.height + item.line_height(),
                quantity: acc.quantity.saturating_add(item.quantity),
            })
    }

    /// Width x length x height.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.width * self.length * self.height
    }

    /// True for an empty cart.
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}
