//! Candidate-pool clustering by gender, BMI band and age band

use serde::{Deserialize, Serialize};

use crate::config::{BmiBucket, Bounds, ClusteringPolicy};
use crate::domain::{Gender, MeasurementProfile, ShopperId};

/// Query bounds handed to the cluster collaborator. The collaborator owns the
/// query; this engine owns how the bounds are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterBounds {
    pub gender: Gender,
    pub bmi: Bounds,
    pub min_age: Option<u32>,
    /// `None` means the band is open-ended upward
    pub max_age: Option<u32>,
    pub plausible_bmi: Bounds,
    pub plausible_height_cm: Bounds,
    pub plausible_weight_kg: Bounds,
    pub exclude: ShopperId,
}

impl ClusterBounds {
    /// Physiologically plausible record, regardless of the target.
    pub fn is_plausible(&self, profile: &MeasurementProfile) -> bool {
        let vector = profile.vector();
        self.plausible_bmi.contains(profile.bmi_f64())
            && self.plausible_height_cm.contains(vector.height)
            && self.plausible_weight_kg.contains(vector.weight)
    }

    pub fn admits(&self, profile: &MeasurementProfile) -> bool {
        if profile.gender() != self.gender || profile.shopper_id() == &self.exclude {
            return false;
        }
        if !self.is_plausible(profile) || !self.bmi.contains(profile.bmi_f64()) {
            return false;
        }

        match profile.age() {
            // Candidates without an age are not penalized for missing data.
            None => true,
            Some(age) => {
                self.min_age.map_or(true, |min| age >= min)
                    && self.max_age.map_or(true, |max| age <= max)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterSelector {
    policy: ClusteringPolicy,
}

impl ClusterSelector {
    pub fn new(policy: ClusteringPolicy) -> Self {
        Self { policy }
    }

    pub fn bounds_for(&self, target: &MeasurementProfile) -> ClusterBounds {
        let bmi = target.bmi_f64();
        let bucket = self.bucket_for(bmi);
        let center = bucket.center();

        let lower = (center - self.policy.bmi_half_width).min(bmi);
        let upper = (center + self.policy.bmi_half_width).max(bmi);
        let plausible = self.policy.plausible_bmi;
        let band = Bounds::new(plausible.clamp(lower), plausible.clamp(upper));

        let (min_age, max_age) = match target.age() {
            Some(age) => self.age_band(age),
            None => (None, None),
        };

        ClusterBounds {
            gender: target.gender(),
            bmi: band,
            min_age,
            max_age,
            plausible_bmi: plausible,
            plausible_height_cm: self.policy.plausible_height_cm,
            plausible_weight_kg: self.policy.plausible_weight_kg,
            exclude: target.shopper_id().clone(),
        }
    }

    /// Re-apply the bounds to whatever the collaborator returned.
    pub fn select(
        &self,
        bounds: &ClusterBounds,
        population: Vec<MeasurementProfile>,
    ) -> Vec<MeasurementProfile> {
        let offered = population.len();
        let mut implausible = 0usize;

        let selected: Vec<MeasurementProfile> = population
            .into_iter()
            .filter(|profile| {
                if !bounds.is_plausible(profile) {
                    implausible += 1;
                    return false;
                }
                bounds.admits(profile)
            })
            .collect();

        if implausible > 0 {
            tracing::warn!(
                event_name = "sizing.cluster.implausible_records_dropped",
                dropped = implausible,
                offered,
                "dropped physiologically implausible candidate records"
            );
        }
        tracing::debug!(
            event_name = "sizing.cluster.selected",
            offered,
            selected = selected.len(),
            bmi_min = bounds.bmi.min,
            bmi_max = bounds.bmi.max,
            "candidate cluster selected"
        );

        selected
    }

    fn bucket_for(&self, bmi: f64) -> BmiBucket {
        let buckets = &self.policy.bmi_buckets;
        if let Some(bucket) = buckets.iter().find(|bucket| bucket.contains(bmi)) {
            return *bucket;
        }

        // Outside every bucket (or in a gap): use the nearest one.
        let fallback = BmiBucket { lower: bmi, upper: bmi };
        buckets
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (a.center() - bmi).abs();
                let db = (b.center() - bmi).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(fallback)
    }

    fn age_band(&self, age: u32) -> (Option<u32>, Option<u32>) {
        let band = self.policy.age_bands.iter().rev().find(|band| age >= band.min_age);

        match band {
            Some(band) => {
                let min = Some(age.saturating_sub(band.tolerance_years));
                let max =
                    if band.open_ended { None } else { Some(age + band.tolerance_years) };
                (min, max)
            }
            None => (None, None),
        }
    }
}

impl Default for ClusterSelector {
    fn default() -> Self {
        Self::new(ClusteringPolicy::default())
    }
}
