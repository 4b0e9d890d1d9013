//! JSON snapshot of profiles and order history.
//!
//! Shape: `{"profiles": [...], "orders": [...]}`. Profiles are validated on
//! decode (positive measurements, BMI recomputed); order statuses are kept raw
//! and only classified when the engine uses them.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fitsize_core::domain::{MeasurementProfile, OrderLine};

use crate::repositories::{InMemoryOrderRepository, InMemoryProfileRepository, RepositoryError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub profiles: Vec<MeasurementProfile>,
    #[serde(default)]
    pub orders: Vec<OrderLine>,
}

/// Repositories backing one loaded snapshot.
#[derive(Clone)]
pub struct SnapshotStores {
    pub profiles: Arc<InMemoryProfileRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self, RepositoryError> {
        let snapshot: Snapshot =
            serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(error.to_string()))?;
        snapshot.ensure_unique_shoppers()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self, RepositoryError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&raw)?;
        tracing::info!(
            event_name = "db.snapshot.loaded",
            path = %path.display(),
            profiles = snapshot.profiles.len(),
            orders = snapshot.orders.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String, RepositoryError> {
        serde_json::to_string_pretty(self)
            .map_err(|error| RepositoryError::Decode(error.to_string()))
    }

    pub fn into_stores(self) -> SnapshotStores {
        SnapshotStores {
            profiles: Arc::new(InMemoryProfileRepository::with_profiles(self.profiles)),
            orders: Arc::new(InMemoryOrderRepository::with_lines(self.orders)),
        }
    }

    fn ensure_unique_shoppers(&self) -> Result<(), RepositoryError> {
        let mut seen = BTreeSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.shopper_id()) {
                return Err(RepositoryError::Duplicate(format!(
                    "profile for shopper `{}` appears more than once",
                    profile.shopper_id()
                )));
            }
        }
        Ok(())
    }
}
