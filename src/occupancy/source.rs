use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::Mutex,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::DetectorFailure,
    lanes::{LaneId, RegionOfInterest},
};

use super::model::{BoundingBox, OccupancySample, VehicleCategory, VehicleCounts};

/// Detector boundary: counts vehicles inside one lane's region on the
/// current frame. Implementations need not enforce a timeout; the cycle
/// worker bounds every request.
pub trait OccupancySource: Send + Sync + 'static {
    fn sample(
        &self,
        lane_id: LaneId,
        region: &RegionOfInterest,
    ) -> impl Future<Output = Result<OccupancySample, DetectorFailure>> + Send;
}

#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Counts(VehicleCounts),
    Fail(DetectorFailure),
    /// Answers with counts attributed to another lane.
    ForLane(LaneId, VehicleCounts),
    /// Never answers; exercises the request timeout.
    Stall,
}

/// Replays queued responses per lane, then answers with empty counts.
#[derive(Default)]
pub struct ScriptedOccupancySource {
    inner: Mutex<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    queued: HashMap<LaneId, VecDeque<ScriptedResponse>>,
    calls: HashMap<LaneId, usize>,
}

impl ScriptedOccupancySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, lane_id: LaneId, response: ScriptedResponse) {
        self.lock().queued.entry(lane_id).or_default().push_back(response);
    }

    pub fn push_total(&self, lane_id: LaneId, cars: u32) {
        self.push(
            lane_id,
            ScriptedResponse::Counts(VehicleCounts::default().with(VehicleCategory::Car, cars)),
        );
    }

    /// Requests made for `lane_id` so far.
    pub fn calls(&self, lane_id: LaneId) -> usize {
        self.lock().calls.get(&lane_id).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl OccupancySource for ScriptedOccupancySource {
    fn sample(
        &self,
        lane_id: LaneId,
        _region: &RegionOfInterest,
    ) -> impl Future<Output = Result<OccupancySample, DetectorFailure>> + Send {
        let response = {
            let mut state = self.lock();
            *state.calls.entry(lane_id).or_insert(0) += 1;
            state
                .queued
                .get_mut(&lane_id)
                .and_then(|queue| queue.pop_front())
        };

        async move {
            match response {
                None => Ok(OccupancySample::empty(lane_id)),
                Some(ScriptedResponse::Counts(counts)) => Ok(OccupancySample::new(lane_id, counts)),
                Some(ScriptedResponse::Fail(failure)) => Err(failure),
                Some(ScriptedResponse::ForLane(other, counts)) => {
                    Ok(OccupancySample::new(other, counts))
                }
                Some(ScriptedResponse::Stall) => std::future::pending().await,
            }
        }
    }
}

/// Seeded random traffic for demos: up to `max_per_category` vehicles of
/// each class, boxes placed inside the region's bounds.
pub struct SimulatedOccupancySource {
    rng: Mutex<StdRng>,
    max_per_category: u32,
}

impl SimulatedOccupancySource {
    pub fn new(seed: u64, max_per_category: u32) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_per_category,
        }
    }

    fn draw(&self, lane_id: LaneId, region: &RegionOfInterest) -> OccupancySample {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut sample = OccupancySample::empty(lane_id);
        let (min_x, min_y, max_x, max_y) = region.bounds().unwrap_or((0, 0, 0, 0));

        for category in VehicleCategory::ALL {
            let count = rng.gen_range(0..=self.max_per_category);
            sample.counts_by_category.add(category, count);
            for _ in 0..count {
                let x = rng.gen_range(min_x..=max_x);
                let y = rng.gen_range(min_y..=max_y);
                sample
                    .bounding_boxes
                    .push(BoundingBox::new(x, y, x.saturating_add(24), y.saturating_add(16)));
            }
        }

        sample
    }
}

impl OccupancySource for SimulatedOccupancySource {
    fn sample(
        &self,
        lane_id: LaneId,
        region: &RegionOfInterest,
    ) -> impl Future<Output = Result<OccupancySample, DetectorFailure>> + Send {
        let sample = self.draw(lane_id, region);
        async move { Ok(sample) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> RegionOfInterest {
        RegionOfInterest::from_pairs(&[(10, 10), (60, 10), (60, 40)])
    }

    #[tokio::test]
    async fn scripted_source_replays_then_defaults_to_empty() {
        let source = ScriptedOccupancySource::new();
        source.push_total(1, 7);
        source.push(1, ScriptedResponse::Fail(DetectorFailure::Unavailable("camera".into())));

        let first = source.sample(1, &region()).await.unwrap();
        assert_eq!(first.total_vehicles(), 7);

        let second = source.sample(1, &region()).await.unwrap_err();
        assert_eq!(second, DetectorFailure::Unavailable("camera".into()));

        let third = source.sample(1, &region()).await.unwrap();
        assert_eq!(third, OccupancySample::empty(1));
        assert_eq!(source.calls(1), 3);
        assert_eq!(source.calls(2), 0);
    }

    #[tokio::test]
    async fn simulated_source_is_reproducible_for_a_seed() {
        let a = SimulatedOccupancySource::new(42, 6);
        let b = SimulatedOccupancySource::new(42, 6);

        for _ in 0..5 {
            let left = a.sample(3, &region()).await.unwrap();
            let right = b.sample(3, &region()).await.unwrap();
            assert_eq!(left, right);
            assert_eq!(left.bounding_boxes.len() as u64, left.total_vehicles());
            assert!(left
                .bounding_boxes
                .iter()
                .all(|b| (10..=60).contains(&b.x1) && (10..=40).contains(&b.y1)));
        }
    }
}
