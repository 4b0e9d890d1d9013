use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use fitsize_core::domain::{
    BodyMeasurements, FitPreference, Gender, MeasurementProfile, OrderLine, ProductId, ShopperId,
    SizeCode,
};
use fitsize_core::errors::DomainError;

use crate::snapshot::Snapshot;

/// Demo order history is dated relative to 2025-06-01T00:00:00Z.
pub const DEMO_ANCHOR_EPOCH_SECONDS: i64 = 1_748_736_000;
pub const DEMO_TARGET_SHOPPER: &str = "demo-target";
pub const DEMO_PRODUCT: &str = "demo-wrap-dress";
pub const DEMO_SECONDARY_PRODUCT: &str = "demo-denim";

#[derive(Debug, Clone, Copy)]
struct ShopperSeed {
    id: &'static str,
    gender: Gender,
    height_cm: i64,
    weight_kg: i64,
    chest_cm: i64,
    waist_cm: i64,
    hips_cm: i64,
    age: Option<u32>,
    fit: Option<FitPreference>,
}

#[derive(Debug, Clone, Copy)]
struct OrderSeed {
    shopper: &'static str,
    product: &'static str,
    size: &'static str,
    status: &'static str,
    rating: Option<u8>,
    days_before_anchor: i64,
}

const fn female(
    id: &'static str,
    weight_kg: i64,
    chest_cm: i64,
    waist_cm: i64,
    age: Option<u32>,
    fit: Option<FitPreference>,
) -> ShopperSeed {
    ShopperSeed {
        id,
        gender: Gender::Female,
        height_cm: 165,
        weight_kg,
        chest_cm,
        waist_cm,
        hips_cm: 96,
        age,
        fit,
    }
}

const fn order(
    shopper: &'static str,
    size: &'static str,
    status: &'static str,
    rating: Option<u8>,
    days_before_anchor: i64,
) -> OrderSeed {
    OrderSeed { shopper, product: DEMO_PRODUCT, size, status, rating, days_before_anchor }
}

const SHOPPER_SEEDS: &[ShopperSeed] = &[
    female(DEMO_TARGET_SHOPPER, 60, 88, 70, Some(32), Some(FitPreference::Comfortable)),
    female("c-01", 58, 87, 69, Some(29), Some(FitPreference::Comfortable)),
    female("c-02", 60, 88, 70, Some(33), Some(FitPreference::Comfortable)),
    female("c-03", 61, 89, 71, Some(35), Some(FitPreference::Tight)),
    female("c-04", 59, 86, 69, Some(31), None),
    female("c-05", 62, 90, 72, Some(36), Some(FitPreference::Loose)),
    female("c-06", 57, 85, 67, Some(27), None),
    female("c-07", 60, 88, 71, Some(30), Some(FitPreference::Comfortable)),
    female("c-08", 63, 91, 73, Some(38), None),
    female("c-09", 60, 87, 70, None, Some(FitPreference::Comfortable)),
    female("c-10", 58, 86, 68, Some(34), None),
    female("c-11", 64, 92, 74, Some(37), Some(FitPreference::Loose)),
    female("c-12", 59, 88, 69, Some(28), Some(FitPreference::Tight)),
    // Outside the target's cluster: other gender, other age band, other BMI band.
    ShopperSeed {
        id: "m-01",
        gender: Gender::Male,
        height_cm: 180,
        weight_kg: 78,
        chest_cm: 100,
        waist_cm: 84,
        hips_cm: 100,
        age: Some(33),
        fit: None,
    },
    female("f-senior", 60, 88, 70, Some(62), None),
    female("f-plus", 86, 104, 92, Some(34), None),
];

const ORDER_SEEDS: &[OrderSeed] = &[
    order("c-01", "M", "DELIVERED", Some(5), 20),
    order("c-02", "M", "DELIVERED", Some(5), 35),
    order("c-03", "M", "COMPLETED", Some(4), 60),
    order("c-04", "M", "DELIVERED", Some(4), 110),
    order("c-05", "L", "DELIVERED", Some(4), 40),
    order("c-05", "M", "RETURNED", Some(3), 80),
    order("c-06", "S", "DELIVERED", Some(4), 15),
    order("c-07", "M", "SHIPPED", None, 5),
    order("c-08", "L", "RETURNED", Some(2), 200),
    order("c-08", "M", "DELIVERED", Some(5), 190),
    order("c-09", "M", "DELIVERED", Some(5), 400),
    order("c-10", "M", "CANCELLED", None, 10),
    order("c-11", "L", "DELIVERED", Some(4), 70),
    order("c-12", "M", "DELIVERED", Some(4), 30),
    order("m-01", "M", "DELIVERED", Some(5), 12),
    order("f-senior", "XL", "DELIVERED", Some(5), 25),
    order("f-plus", "XL", "DELIVERED", Some(5), 25),
    OrderSeed {
        shopper: "c-02",
        product: DEMO_SECONDARY_PRODUCT,
        size: "28",
        status: "IN_TRANSIT",
        rating: None,
        days_before_anchor: 3,
    },
    OrderSeed {
        shopper: "c-04",
        product: DEMO_SECONDARY_PRODUCT,
        size: "27",
        status: "REFUNDED",
        rating: Some(2),
        days_before_anchor: 45,
    },
];

/// Deterministic cohort used by `fitsize recommend` when no snapshot is given.
pub struct DemoCohort;

impl DemoCohort {
    pub fn anchor() -> Result<DateTime<Utc>, DomainError> {
        DateTime::from_timestamp(DEMO_ANCHOR_EPOCH_SECONDS, 0).ok_or_else(|| {
            DomainError::InvariantViolation("demo anchor timestamp out of range".to_owned())
        })
    }

    pub fn snapshot() -> Result<Snapshot, DomainError> {
        let anchor = Self::anchor()?;

        let profiles =
            SHOPPER_SEEDS.iter().map(ShopperSeed::profile).collect::<Result<Vec<_>, _>>()?;
        let orders = ORDER_SEEDS.iter().map(|seed| seed.line(anchor)).collect();

        Ok(Snapshot { profiles, orders })
    }
}

impl ShopperSeed {
    fn profile(&self) -> Result<MeasurementProfile, DomainError> {
        let mut profile = MeasurementProfile::new(
            ShopperId::new(self.id),
            self.gender,
            BodyMeasurements::new(
                Decimal::from(self.height_cm),
                Decimal::from(self.weight_kg),
                Decimal::from(self.chest_cm),
                Decimal::from(self.waist_cm),
                Decimal::from(self.hips_cm),
            ),
        )?;
        if let Some(age) = self.age {
            profile = profile.with_age(age);
        }
        if let Some(fit) = self.fit {
            profile = profile.with_fit_preference(fit);
        }
        Ok(profile)
    }
}

impl OrderSeed {
    fn line(&self, anchor: DateTime<Utc>) -> OrderLine {
        OrderLine {
            shopper_id: ShopperId::new(self.shopper),
            product_id: ProductId::new(self.product),
            size: SizeCode::new(self.size),
            status: self.status.to_owned(),
            rating: self.rating,
            purchased_at: anchor - Duration::days(self.days_before_anchor),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use fitsize_core::sizing::OutcomeClassifier;

    use super::*;

    #[test]
    fn demo_cohort_is_well_formed() {
        let snapshot = DemoCohort::snapshot().expect("demo cohort builds");

        let ids: HashSet<&str> =
            snapshot.profiles.iter().map(|profile| profile.shopper_id().as_str()).collect();
        assert_eq!(ids.len(), snapshot.profiles.len(), "shopper ids are unique");
        assert!(ids.contains(DEMO_TARGET_SHOPPER));
        assert!(snapshot.orders.iter().all(|line| ids.contains(line.shopper_id.as_str())));

        let classifier = OutcomeClassifier::new();
        assert!(classifier.classify_all(&snapshot.orders).is_ok(), "every demo status is mapped");
    }

    #[test]
    fn demo_dates_are_stable() {
        let first = DemoCohort::snapshot().expect("first");
        let second = DemoCohort::snapshot().expect("second");
        assert_eq!(first, second);
        assert_eq!(DemoCohort::anchor().expect("anchor").to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }
}
