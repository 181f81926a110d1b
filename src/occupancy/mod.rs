pub mod model;
pub mod source;

pub use model::{
    BoundingBox, Detection, OccupancySample, VehicleCategory, VehicleCounts,
    DEFAULT_MIN_CONFIDENCE,
};
pub use source::{
    OccupancySource, ScriptedOccupancySource, ScriptedResponse, SimulatedOccupancySource,
};
