pub mod model;
pub mod region;
pub mod registry;
pub mod source;

pub use model::{GeoLocation, Lane, LaneId, DEFAULT_LANE_LABEL};
pub use region::{Point, RegionOfInterest};
pub use registry::LaneRegistry;
pub use source::{DirectoryLaneSource, LaneConfigSource, StaticLaneSource};
