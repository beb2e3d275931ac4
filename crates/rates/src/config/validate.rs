//! Load-time validation of settings

use super::schema::{OriginType, Settings};
use gosend_core::validation::{ValidationResult, Validator};
use std::collections::HashSet;

impl Settings {
    /// Validate everything, including the API key.
    pub fn validate(&self) -> ValidationResult {
        self.check(true)
    }

    /// Validate for pricing with a known distance: the API key may be absent.
    pub fn validate_offline(&self) -> ValidationResult {
        self.check(false)
    }

    fn check(&self, require_api_key: bool) -> ValidationResult {
        let mut result = Validator::new()
            .required("general.method_id", &self.general.method_id)
            .range("api.timeout_secs", self.api.timeout_secs, 1, 300)
            .range("api.max_retries", self.api.max_retries, 1, 10)
            .validate();

        if require_api_key {
            result.merge(Validator::new().required("api.key", &self.api.key).validate());
        }

        result.merge(self.check_origin());
        result.merge(self.check_services());
        result.merge(self.check_table());

        let offers_something = self.engine_config().services.iter().any(|s| s.enabled)
            || (self.table_rates.enabled && !self.table_rates.rows.is_empty());
        result.merge(
            Validator::new()
                .custom("services", || {
                    (!offers_something)
                        .then(|| "No enabled service and no table rate rows".to_string())
                })
                .validate(),
        );

        result
    }

    fn check_origin(&self) -> ValidationResult {
        let origin = &self.origin;
        match origin.origin_type {
            OriginType::Coordinate => {
                let mut v = Validator::new().custom("origin", || {
                    (origin.lat.is_none() || origin.lng.is_none())
                        .then(|| "Both lat and lng are required".to_string())
                });
                if let Some(lat) = origin.lat {
                    v = v.range("origin.lat", lat, -90.0, 90.0);
                }
                if let Some(lng) = origin.lng {
                    v = v.range("origin.lng", lng, -180.0, 180.0);
                }
                v.validate()
            }
            OriginType::Address => Validator::new()
                .required("origin.address", &origin.address)
                .validate(),
        }
    }

    fn check_services(&self) -> ValidationResult {
        let mut v = Validator::new();
        let mut seen = HashSet::new();

        for (index, config) in self.services.iter().enumerate() {
            let field = |name: &str| format!("services[{index}].{name}");
            let duplicate = !seen.insert(config.slug.as_str());
            let service = config.resolve();

            v = v
                .required(&field("slug"), &config.slug)
                .custom(&field("slug"), || {
                    duplicate.then(|| format!("Duplicate service slug '{}'", config.slug))
                })
                .non_negative(&field("per_km_cost"), service.pricing.per_km_cost)
                .non_negative(&field("per_km_min_distance"), service.pricing.per_km_min_distance)
                .non_negative(&field("min_cost"), service.pricing.min_cost)
                .non_negative(&field("max_cost"), service.pricing.max_cost)
                .non_negative(&field("max_weight"), service.limits.max_weight)
                .non_negative(&field("max_width"), service.limits.max_width)
                .non_negative(&field("max_length"), service.limits.max_length)
                .non_negative(&field("max_height"), service.limits.max_height)
                .non_negative(&field("max_distance"), service.limits.max_distance)
                .warn_if(
                    &field("per_km_cost"),
                    service.enabled
                        && service.pricing.per_km_cost == 0.0
                        && service.pricing.min_cost == 0.0,
                    "Service is free: no per-km cost and no minimum cost",
                );
        }

        v.validate()
    }

    fn check_table(&self) -> ValidationResult {
        let table = &self.table_rates;
        let mut v =
            Validator::new().non_negative("table_rates.default_min_cost", table.default_min_cost);

        for (first, second) in table.duplicate_rows() {
            v = v.custom(&format!("table_rates.rows[{second}]"), || {
                Some(format!("Same bounds as row {first}"))
            });
        }

        for (index, row) in table.rows.iter().enumerate() {
            v = v.warn_if(
                &format!("table_rates.rows[{index}].max_distance"),
                row.max_distance <= 0.0,
                "Row only matches a zero distance",
            );
        }

        v.warn_if(
            "table_rates.rows",
            table.enabled && table.rows.is_empty(),
            "Table rates are enabled but have no rows",
        )
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceConfig;
    use crate::table::{RatePerClass, RateRule};

    fn valid() -> Settings {
        let mut settings = Settings::default();
        settings.api.key = "key".to_string();
        settings.origin.lat = Some(-6.174_773);
        settings.origin.lng = Some(106.827_172);
        settings
    }

    fn fields(result: &ValidationResult) -> Vec<String> {
        result.errors().iter().map(|e| e.field.clone()).collect()
    }

    #[test]
    fn test_valid_settings() {
        let result = valid().validate();
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_api_key_required_unless_offline() {
        let mut settings = valid();
        settings.api.key.clear();
        assert_eq!(fields(&settings.validate()), vec!["api.key"]);
        assert!(settings.validate_offline().is_valid());
    }

    #[test]
    fn test_origin_rules() {
        let mut settings = valid();
        settings.origin.lng = None;
        assert!(fields(&settings.validate()).contains(&"origin".to_string()));

        settings.origin.lng = Some(200.0);
        assert!(fields(&settings.validate()).contains(&"origin.lng".to_string()));

        settings.origin.origin_type = OriginType::Address;
        assert!(fields(&settings.validate()).contains(&"origin.address".to_string()));
    }

    #[test]
    fn test_nothing_to_offer() {
        let mut settings = valid();
        for service in &mut settings.services {
            service.enabled = Some(false);
        }
        assert_eq!(fields(&settings.validate()), vec!["services"]);

        settings.table_rates.enabled = true;
        settings.table_rates.rows.push(RateRule {
            max_distance: 10.0,
            rate_per_class: RatePerClass::from([(0, 1000.0)]),
            ..Default::default()
        });
        assert!(settings.validate().is_valid());
    }

    #[test]
    fn test_negative_limit_and_duplicate_slug() {
        let mut settings = valid();
        let mut custom = ServiceConfig::new("instant");
        custom.max_weight = Some(-1.0);
        settings.services.push(custom);

        let fields = fields(&settings.validate());
        assert!(fields.contains(&"services[2].max_weight".to_string()));
        assert!(fields.contains(&"services[2].slug".to_string()));
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let mut settings = valid();
        let row = RateRule {
            max_distance: 10.0,
            ..Default::default()
        };
        settings.table_rates.rows = vec![row.clone(), row];
        assert_eq!(fields(&settings.validate()), vec!["table_rates.rows[1]"]);
    }
}
