use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::CycleError,
    lanes::{Lane, LaneId, LaneRegistry},
    occupancy::OccupancySample,
};

use super::event::PhaseEvent;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "state", content = "laneId", rename_all = "camelCase")]
pub enum SchedulerStatus {
    #[default]
    Unconfigured,
    Idle,
    Servicing(LaneId),
    Advancing,
    Stopped,
}

impl SchedulerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SchedulerStatus::Servicing(_) | SchedulerStatus::Advancing)
    }
}

/// Consistent read of the scheduler, taken under the state lock.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSnapshot {
    pub status: SchedulerStatus,
    pub run_id: Option<Uuid>,
    pub lane_order: Vec<LaneId>,
    pub active_index: Option<usize>,
    pub next_sequence: u64,
    pub reload_pending: bool,
    pub last_event: Option<PhaseEvent>,
}

/// Rotation state owned by one controller. All transitions happen under the
/// controller's lock, so `active_index` always indexes `lane_order` and the
/// recorded event always belongs to the lane being serviced.
#[derive(Debug, Default)]
pub struct SchedulerState {
    status: SchedulerStatus,
    registry: Option<Arc<LaneRegistry>>,
    lane_order: Vec<LaneId>,
    active_index: usize,
    next_sequence: u64,
    run_id: Option<Uuid>,
    staged: Option<LaneRegistry>,
    last_event: Option<PhaseEvent>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status
    }

    pub fn lane_order(&self) -> &[LaneId] {
        &self.lane_order
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Installs a registry while no lane is being serviced:
    /// `Unconfigured | Idle → Idle`.
    pub fn configure(&mut self, registry: LaneRegistry) {
        debug_assert!(!self.status.is_running());
        self.install(registry);
        self.status = SchedulerStatus::Idle;
    }

    /// Holds a registry until the next `Advancing` boundary.
    pub fn stage(&mut self, registry: LaneRegistry) {
        self.staged = Some(registry);
    }

    /// `Idle → Servicing(lane₀)`.
    pub fn begin_run(&mut self, run_id: Uuid) -> Result<LaneId, CycleError> {
        match self.status {
            SchedulerStatus::Idle => {}
            SchedulerStatus::Unconfigured => {
                return Err(CycleError::Configuration("no lanes loaded".into()))
            }
            SchedulerStatus::Stopped => return Err(CycleError::Stopped),
            SchedulerStatus::Servicing(_) | SchedulerStatus::Advancing => {
                return Err(CycleError::AlreadyRunning)
            }
        }

        let first = *self
            .lane_order
            .first()
            .ok_or_else(|| CycleError::Configuration("lane order is empty".into()))?;
        self.active_index = 0;
        self.run_id = Some(run_id);
        self.status = SchedulerStatus::Servicing(first);
        Ok(first)
    }

    pub fn active_lane(&self) -> Option<&Lane> {
        let SchedulerStatus::Servicing(lane_id) = self.status else {
            return None;
        };
        self.registry.as_ref()?.get(lane_id)
    }

    /// Commits the turn for the lane being serviced and hands out the next
    /// sequence number. `None` when no lane is in service or the sample was
    /// taken for another lane.
    pub fn record_phase(
        &mut self,
        sample: OccupancySample,
        green_seconds: u32,
        degraded: Option<String>,
    ) -> Option<PhaseEvent> {
        let lane = self.active_lane()?;
        if sample.lane_id != lane.id {
            return None;
        }

        let event = PhaseEvent {
            run_id: self.run_id.unwrap_or_else(Uuid::nil),
            sequence_number: self.next_sequence,
            lane_id: lane.id,
            label: lane.label.clone(),
            location: lane.location,
            region: lane.region_of_interest.clone(),
            sample,
            green_seconds,
            degraded,
            issued_at: Utc::now(),
        };

        self.next_sequence += 1;
        self.last_event = Some(event.clone());
        Some(event)
    }

    /// `Servicing(lane_k) → Advancing → Servicing(lane_{k+1 mod n})`. A staged
    /// registry is swapped in here and rotation restarts at index 0.
    pub fn advance(&mut self) -> Option<LaneId> {
        if !matches!(self.status, SchedulerStatus::Servicing(_)) {
            return None;
        }
        self.status = SchedulerStatus::Advancing;

        if let Some(registry) = self.staged.take() {
            self.install(registry);
        } else {
            self.active_index = (self.active_index + 1) % self.lane_order.len();
        }

        let next = self.lane_order[self.active_index];
        self.status = SchedulerStatus::Servicing(next);
        Some(next)
    }

    /// Any state → `Stopped`. Terminal.
    pub fn stop(&mut self) {
        self.status = SchedulerStatus::Stopped;
        self.staged = None;
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            status: self.status,
            run_id: self.run_id,
            lane_order: self.lane_order.clone(),
            active_index: (!self.lane_order.is_empty()).then_some(self.active_index),
            next_sequence: self.next_sequence,
            reload_pending: self.staged.is_some(),
            last_event: self.last_event.clone(),
        }
    }

    fn install(&mut self, registry: LaneRegistry) {
        self.lane_order = registry.lane_ids();
        self.registry = Some(Arc::new(registry));
        self.active_index = 0;
    }
}
