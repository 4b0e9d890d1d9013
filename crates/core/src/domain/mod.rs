pub mod order;
pub mod profile;

pub use order::{OrderLine, OrderOutcomeEvent, OrderStatus, OutcomeClass, ProductId, SizeCode};
pub use profile::{
    BellyShape, BodyMeasurements, ChestShape, FitPreference, Gender, HipShape,
    MeasurementProfile, MeasurementVector, ShopperId,
};
