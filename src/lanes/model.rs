use serde::{Deserialize, Serialize};

use super::region::RegionOfInterest;

pub type LaneId = u32;

/// Label used when configuration gives none.
pub const DEFAULT_LANE_LABEL: &str = "General";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub id: LaneId,
    pub region_of_interest: RegionOfInterest,
    /// Recommendation shown next to the signal; no scheduling effect.
    pub label: String,
    pub location: Option<GeoLocation>,
}

impl Lane {
    pub fn new(id: LaneId, region_of_interest: RegionOfInterest) -> Self {
        Self {
            id,
            region_of_interest,
            label: DEFAULT_LANE_LABEL.to_string(),
            location: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Eligible for rotation: positive id and a usable polygon.
    pub fn is_active(&self) -> bool {
        self.id > 0 && self.region_of_interest.is_valid()
    }
}
