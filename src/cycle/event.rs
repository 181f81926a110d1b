use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::{
    lanes::{GeoLocation, LaneId, RegionOfInterest},
    occupancy::OccupancySample,
};

/// One committed service turn: which lane holds green, for how long, and the
/// sample that justified it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEvent {
    pub run_id: Uuid,
    pub sequence_number: u64,
    pub lane_id: LaneId,
    pub label: String,
    pub location: Option<GeoLocation>,
    pub region: RegionOfInterest,
    pub sample: OccupancySample,
    pub green_seconds: u32,
    /// Set when the detector failed and the sample was replaced by zeros.
    pub degraded: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// Outbound telemetry. Delivery is fire-and-forget: the cycle worker
/// discards the result, so implementations must not block.
pub trait PhaseEventSink: Send + Sync {
    fn deliver(&self, event: &PhaseEvent) -> Result<()>;
}

/// Forwards events into a bounded channel, dropping them when the consumer
/// lags or has gone away.
pub struct ChannelSink {
    tx: mpsc::Sender<PhaseEvent>,
}

impl ChannelSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PhaseEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl PhaseEventSink for ChannelSink {
    fn deliver(&self, event: &PhaseEvent) -> Result<()> {
        self.tx.try_send(event.clone()).map_err(|err| match err {
            TrySendError::Full(event) => anyhow!(
                "phase event {} dropped: consumer lagging",
                event.sequence_number
            ),
            TrySendError::Closed(event) => anyhow!(
                "phase event {} dropped: consumer closed",
                event.sequence_number
            ),
        })
    }
}

/// Writes each event through the `log` facade.
pub struct LogSink;

impl PhaseEventSink for LogSink {
    fn deliver(&self, event: &PhaseEvent) -> Result<()> {
        let counts = &event.sample.counts_by_category;
        log::info!(
            target: "lane_cycle::phase",
            "#{} lane {} ({}) green {}s | car={} motorcycle={} bus={} truck={} bicycle={}{}",
            event.sequence_number,
            event.lane_id,
            event.label,
            event.green_seconds,
            counts.car,
            counts.motorcycle,
            counts.bus,
            counts.truck,
            counts.bicycle,
            event
                .degraded
                .as_deref()
                .map(|reason| format!(" [degraded: {reason}]"))
                .unwrap_or_default()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence_number: u64) -> PhaseEvent {
        PhaseEvent {
            run_id: Uuid::nil(),
            sequence_number,
            lane_id: 1,
            label: "All Vehicles".into(),
            location: None,
            region: RegionOfInterest::from_pairs(&[(0, 0), (1, 0), (0, 1)]),
            sample: OccupancySample::empty(1),
            green_seconds: 5,
            degraded: None,
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn channel_sink_drops_when_full_or_closed() {
        let (sink, mut rx) = ChannelSink::new(1);

        sink.deliver(&event(0)).unwrap();
        assert!(sink.deliver(&event(1)).is_err());
        assert_eq!(rx.recv().await.unwrap().sequence_number, 0);

        drop(rx);
        assert!(sink.deliver(&event(2)).is_err());
    }

    #[test]
    fn event_serializes_camel_case() {
        let json = serde_json::to_value(event(3)).unwrap();
        assert_eq!(json["sequenceNumber"], 3);
        assert_eq!(json["greenSeconds"], 5);
        assert_eq!(json["sample"]["countsByCategory"]["car"], 0);
        assert!(json["degraded"].is_null());
    }
}
