use std::time::Duration;

use crate::occupancy::OccupancySample;

use super::config::GreenTimePolicy;

impl GreenTimePolicy {
    /// `clamp(round(total * weight), min, max)`, rounding half away from zero.
    /// Total for every input; there is no error path.
    pub fn green_seconds_for(&self, total_vehicles: u64) -> u32 {
        let raw = (total_vehicles as f64 * self.weight()).round();
        raw.min(self.max_green_secs() as f64)
            .max(self.min_green_secs() as f64) as u32
    }

    pub fn green_seconds(&self, sample: &OccupancySample) -> u32 {
        self.green_seconds_for(sample.total_vehicles())
    }

    pub fn green_duration(&self, sample: &OccupancySample) -> Duration {
        Duration::from_secs(self.green_seconds(sample) as u64)
    }
}
