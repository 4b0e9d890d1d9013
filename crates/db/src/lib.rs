pub mod fixtures;
pub mod repositories;
pub mod snapshot;

pub use fixtures::{DemoCohort, DEMO_PRODUCT, DEMO_TARGET_SHOPPER};
pub use repositories::{
    InMemoryOrderRepository, InMemoryProfileRepository, OrderRepository, ProfileRepository,
    RepositoryError,
};
pub use snapshot::{Snapshot, SnapshotStores};
