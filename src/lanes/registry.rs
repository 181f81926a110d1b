use std::collections::BTreeMap;

use crate::error::CycleError;

use super::{model::Lane, model::LaneId, source::LaneConfigSource};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "lane_cycle::lanes";

use crate::log_warn;

/// Immutable, id-ordered set of lanes the scheduler rotates over.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneRegistry {
    lanes: Vec<Lane>,
}

impl LaneRegistry {
    pub fn load(source: &dyn LaneConfigSource) -> Result<Self, CycleError> {
        let lanes = source.load_lanes().map_err(CycleError::configuration)?;
        Self::from_lanes(lanes)
    }

    /// Drops lanes that cannot be serviced (id 0, degenerate polygon) and
    /// orders the rest by id. Fails when nothing usable is left or an id
    /// repeats.
    pub fn from_lanes(lanes: Vec<Lane>) -> Result<Self, CycleError> {
        let mut by_id: BTreeMap<LaneId, Lane> = BTreeMap::new();

        for lane in lanes {
            if !lane.is_active() {
                log_warn!(
                    "skipping lane {}: region of interest has {} point(s) or id is not positive",
                    lane.id,
                    lane.region_of_interest.len()
                );
                continue;
            }

            let id = lane.id;
            if by_id.insert(id, lane).is_some() {
                return Err(CycleError::Configuration(format!(
                    "lane id {id} configured more than once"
                )));
            }
        }

        if by_id.is_empty() {
            return Err(CycleError::Configuration(
                "no lane has a valid region of interest".into(),
            ));
        }

        Ok(Self {
            lanes: by_id.into_values().collect(),
        })
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane_ids(&self) -> Vec<LaneId> {
        self.lanes.iter().map(|lane| lane.id).collect()
    }

    pub fn get(&self, id: LaneId) -> Option<&Lane> {
        self.lanes
            .binary_search_by_key(&id, |lane| lane.id)
            .ok()
            .map(|idx| &self.lanes[idx])
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}
