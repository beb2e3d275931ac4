//! Store measurement units.
//!
//! Limits are always kg and cm. Cart items may come in whatever unit the
//! store is configured with and are converted before aggregation.

use crate::envelope::CartItem;
use serde::{Deserialize, Serialize};

/// Weight unit of the store's product data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    /// Kilograms
    #[default]
    Kg,
    /// Grams
    G,
    /// Pounds
    Lbs,
    /// Ounces
    Oz,
}

impl WeightUnit {
    /// Kilograms per one of this unit.
    pub fn to_kg(self) -> f64 {
        match self {
            WeightUnit::Kg => 1.0,
            WeightUnit::G => 0.001,
            WeightUnit::Lbs => 0.453_592_37,
            WeightUnit::Oz => 0.028_349_523_125,
        }
    }
}

/// Dimension unit of the store's product data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionUnit {
    /// Centimetres
    #[default]
    Cm,
    /// Metres
    M,
    /// Millimetres
    Mm,
    /// Inches
    In,
    /// Yards
    Yd,
}

impl DimensionUnit {
    /// Centimetres per one of this unit.
    pub fn to_cm(self) -> f64 {
        match self {
            DimensionUnit::Cm => 1.0,
            DimensionUnit::M => 100.0,
            DimensionUnit::Mm => 0.1,
            DimensionUnit::In => 2.54,
            DimensionUnit::Yd => 91.44,
        }
    }
}

/// Units the store's cart data is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreUnits {
    /// Product weight unit
    pub weight: WeightUnit,
    /// Product dimension unit
    pub dimension: DimensionUnit,
}

impl StoreUnits {
    /// True when no conversion is needed.
    pub fn is_metric_base(&self) -> bool {
        self.weight == WeightUnit::Kg && self.dimension == DimensionUnit::Cm
    }

    /// Convert one item to kg/cm.
    pub fn normalize(&self, item: &CartItem) -> CartItem {
        let w = self.weight.to_kg();
        let d = self.dimension.to_cm();
        CartItem {
            weight: item.weight * w,
            width: item.width * d,
            length: item.length * d,
            height: item.height * d,
            ..item.clone()
        }
    }

    /// Convert a whole cart to kg/cm.
    pub fn normalize_items(&self, items: &[CartItem]) -> Vec<CartItem> {
        if self.is_metric_base() {
            return items.to_vec();
        }
        items.iter().map(|item| self.normalize(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grams_and_millimetres() {
        let units = StoreUnits {
            weight: WeightUnit::G,
            dimension: DimensionUnit::Mm,
        };
        let item = CartItem::new(1500.0, 100.0, 200.0, 50.0, 2);
        let converted = units.normalize(&item);

        assert!((converted.weight - 1.5).abs() < 1e-9);
        assert!((converted.width - 10.0).abs() < 1e-9);
        assert!((converted.length - 20.0).abs() < 1e-9);
        assert!((converted.height - 5.0).abs() < 1e-9);
        assert_eq!(converted.quantity, 2);
    }

    #[test]
    fn test_imperial() {
        let units = StoreUnits {
            weight: WeightUnit::Lbs,
            dimension: DimensionUnit::In,
        };
        let converted = units.normalize(&CartItem::new(10.0, 1.0, 1.0, 1.0, 1));
        assert!((converted.weight - 4.535_923_7).abs() < 1e-9);
        assert!((converted.width - 2.54).abs() < 1e-9);
    }

    #[test]
    fn test_units_deserialize_lowercase() {
        let units: StoreUnits =
            serde_json::from_str(r#"{"weight":"oz","dimension":"yd"}"#).unwrap();
        assert_eq!(units.weight, WeightUnit::Oz);
        assert_eq!(units.dimension, DimensionUnit::Yd);
        assert!(!units.is_metric_base());
    }
}
