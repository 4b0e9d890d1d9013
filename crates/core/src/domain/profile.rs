use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopperId(pub String);

impl ShopperId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BellyShape {
    Flat,
    Normal,
    Round,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HipShape {
    Narrow,
    Normal,
    Wide,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChestShape {
    Slim,
    Normal,
    Broad,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FitPreference {
    Tight,
    Comfortable,
    Loose,
}

impl FitPreference {
    /// One step apart on the tight/comfortable/loose scale.
    pub fn is_adjacent_to(self, other: FitPreference) -> bool {
        matches!(
            (self, other),
            (Self::Tight, Self::Comfortable)
                | (Self::Comfortable, Self::Tight)
                | (Self::Comfortable, Self::Loose)
                | (Self::Loose, Self::Comfortable)
        )
    }
}

/// Raw body measurements in centimeters and kilograms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyMeasurements {
    pub height_cm: Decimal,
    pub weight_kg: Decimal,
    pub chest_cm: Decimal,
    pub waist_cm: Decimal,
    pub hips_cm: Decimal,
}

impl BodyMeasurements {
    pub fn new(
        height_cm: Decimal,
        weight_kg: Decimal,
        chest_cm: Decimal,
        waist_cm: Decimal,
        hips_cm: Decimal,
    ) -> Self {
        Self { height_cm, weight_kg, chest_cm, waist_cm, hips_cm }
    }

    fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("height_cm", self.height_cm),
            ("weight_kg", self.weight_kg),
            ("chest_cm", self.chest_cm),
            ("waist_cm", self.waist_cm),
            ("hips_cm", self.hips_cm),
        ];

        for (field, value) in fields {
            if value <= Decimal::ZERO {
                return Err(DomainError::InvalidMeasurement { field, value: value.to_string() });
            }
        }

        Ok(())
    }
}

/// Floating point view of the measurements used by the similarity metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasurementVector {
    pub chest: f64,
    pub waist: f64,
    pub hips: f64,
    pub height: f64,
    pub weight: f64,
}

/// One shopper's body data. BMI is always derived from height and weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MeasurementProfileRecord")]
pub struct MeasurementProfile {
    shopper_id: ShopperId,
    gender: Gender,
    #[serde(flatten)]
    measurements: BodyMeasurements,
    bmi: Decimal,
    age: Option<u32>,
    belly_shape: Option<BellyShape>,
    hip_shape: Option<HipShape>,
    chest_shape: Option<ChestShape>,
    fit_preference: Option<FitPreference>,
}

impl MeasurementProfile {
    pub fn new(
        shopper_id: ShopperId,
        gender: Gender,
        measurements: BodyMeasurements,
    ) -> Result<Self, DomainError> {
        measurements.validate()?;
        let bmi = compute_bmi(measurements.height_cm, measurements.weight_kg)?;

        Ok(Self {
            shopper_id,
            gender,
            measurements,
            bmi,
            age: None,
            belly_shape: None,
            hip_shape: None,
            chest_shape: None,
            fit_preference: None,
        })
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_belly_shape(mut self, shape: BellyShape) -> Self {
        self.belly_shape = Some(shape);
        self
    }

    pub fn with_hip_shape(mut self, shape: HipShape) -> Self {
        self.hip_shape = Some(shape);
        self
    }

    pub fn with_chest_shape(mut self, shape: ChestShape) -> Self {
        self.chest_shape = Some(shape);
        self
    }

    pub fn with_fit_preference(mut self, preference: FitPreference) -> Self {
        self.fit_preference = Some(preference);
        self
    }

    pub fn shopper_id(&self) -> &ShopperId {
        &self.shopper_id
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn measurements(&self) -> &BodyMeasurements {
        &self.measurements
    }

    pub fn bmi(&self) -> Decimal {
        self.bmi
    }

    pub fn bmi_f64(&self) -> f64 {
        self.bmi.to_f64().unwrap_or_default()
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn belly_shape(&self) -> Option<BellyShape> {
        self.belly_shape
    }

    pub fn hip_shape(&self) -> Option<HipShape> {
        self.hip_shape
    }

    pub fn chest_shape(&self) -> Option<ChestShape> {
        self.chest_shape
    }

    pub fn fit_preference(&self) -> Option<FitPreference> {
        self.fit_preference
    }

    pub fn vector(&self) -> MeasurementVector {
        let m = &self.measurements;
        MeasurementVector {
            chest: m.chest_cm.to_f64().unwrap_or_default(),
            waist: m.waist_cm.to_f64().unwrap_or_default(),
            hips: m.hips_cm.to_f64().unwrap_or_default(),
            height: m.height_cm.to_f64().unwrap_or_default(),
            weight: m.weight_kg.to_f64().unwrap_or_default(),
        }
    }
}

/// weight / height² with height converted to meters, rounded to 2 places.
pub fn compute_bmi(height_cm: Decimal, weight_kg: Decimal) -> Result<Decimal, DomainError> {
    let height_m = height_cm / Decimal::from(100);
    height_m
        .checked_mul(height_m)
        .and_then(|squared| weight_kg.checked_div(squared))
        .map(|bmi| bmi.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "bmi is undefined for height {height_cm}cm and weight {weight_kg}kg"
            ))
        })
}

/// Wire shape accepted on input; any supplied `bmi` is ignored.
#[derive(Debug, Deserialize)]
struct MeasurementProfileRecord {
    shopper_id: ShopperId,
    gender: Gender,
    #[serde(flatten)]
    measurements: BodyMeasurements,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    belly_shape: Option<BellyShape>,
    #[serde(default)]
    hip_shape: Option<HipShape>,
    #[serde(default)]
    chest_shape: Option<ChestShape>,
    #[serde(default)]
    fit_preference: Option<FitPreference>,
}

impl TryFrom<MeasurementProfileRecord> for MeasurementProfile {
    type Error = DomainError;

    fn try_from(record: MeasurementProfileRecord) -> Result<Self, Self::Error> {
        let mut profile = Self::new(record.shopper_id, record.gender, record.measurements)?;
        profile.age = record.age;
        profile.belly_shape = record.belly_shape;
        profile.hip_shape = record.hip_shape;
        profile.chest_shape = record.chest_shape;
        profile.fit_preference = record.fit_preference;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        compute_bmi, BodyMeasurements, FitPreference, Gender, MeasurementProfile, ShopperId,
    };
    use crate::errors::DomainError;

    fn measurements(height: i64, weight: i64) -> BodyMeasurements {
        BodyMeasurements::new(
            Decimal::from(height),
            Decimal::from(weight),
            Decimal::from(90),
            Decimal::from(72),
            Decimal::from(98),
        )
    }

    #[test]
    fn bmi_is_derived_with_two_fractional_digits() {
        let profile =
            MeasurementProfile::new(ShopperId::new("s-1"), Gender::Female, measurements(168, 62))
                .expect("valid profile");

        // 62 / 1.68^2 = 21.967...
        assert_eq!(profile.bmi(), Decimal::new(2197, 2));
        assert!((profile.bmi_f64() - 21.97).abs() < 1e-9);
    }

    #[test]
    fn non_positive_measurement_is_rejected() {
        let mut body = measurements(170, 65);
        body.waist_cm = Decimal::ZERO;

        let error = MeasurementProfile::new(ShopperId::new("s-2"), Gender::Male, body)
            .expect_err("zero waist must be rejected");
        assert!(matches!(error, DomainError::InvalidMeasurement { field: "waist_cm", .. }));
    }

    #[test]
    fn deserialization_recomputes_bmi_and_ignores_supplied_value() {
        let profile: MeasurementProfile = serde_json::from_value(json!({
            "shopper_id": "s-3",
            "gender": "FEMALE",
            "height_cm": "160",
            "weight_kg": "64",
            "chest_cm": "92",
            "waist_cm": "76",
            "hips_cm": "100",
            "bmi": "99.99",
            "fit_preference": "LOOSE"
        }))
        .expect("profile should deserialize");

        assert_eq!(profile.bmi(), compute_bmi(Decimal::from(160), Decimal::from(64)).unwrap());
        assert_eq!(profile.bmi(), Decimal::from(25));
        assert_eq!(profile.fit_preference(), Some(FitPreference::Loose));
        assert_eq!(profile.age(), None);
    }

    #[test]
    fn fit_adjacency_requires_comfortable_on_one_side() {
        assert!(FitPreference::Tight.is_adjacent_to(FitPreference::Comfortable));
        assert!(FitPreference::Loose.is_adjacent_to(FitPreference::Comfortable));
        assert!(!FitPreference::Tight.is_adjacent_to(FitPreference::Loose));
        assert!(!FitPreference::Comfortable.is_adjacent_to(FitPreference::Comfortable));
    }
}
