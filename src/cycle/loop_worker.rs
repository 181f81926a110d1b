use std::sync::Arc;

use tokio::{
    sync::Mutex,
    task::JoinError,
    time::{self, Duration},
};
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};

use crate::{
    error::DetectorFailure,
    lanes::Lane,
    occupancy::{OccupancySample, OccupancySource},
    policy::GreenTimePolicy,
};

use super::{event::PhaseEventSink, state::SchedulerState};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "lane_cycle::cycle";

use crate::{log_debug, log_error, log_info, log_warn};

pub(crate) struct CycleContext<O> {
    pub state: Arc<Mutex<SchedulerState>>,
    pub occupancy: Arc<O>,
    pub sink: Arc<dyn PhaseEventSink>,
    pub policy: GreenTimePolicy,
    pub detector_timeout: Duration,
}

/// Services lanes one at a time until cancelled: sample, allocate, emit,
/// hold green, advance. Suspends only while awaiting the detector and while
/// holding green; cancellation is observed at both. Leaving the loop for any
/// reason other than cancellation moves the scheduler to `Stopped`.
pub(crate) async fn cycle_loop<O: OccupancySource>(
    ctx: CycleContext<O>,
    cancel_token: CancellationToken,
) {
    service_lanes(&ctx, &cancel_token).await;

    if !cancel_token.is_cancelled() {
        let mut guard = ctx.state.lock().await;
        log_error!(
            "cycle worker exited unexpectedly after {} phase(s), stopping",
            guard.next_sequence()
        );
        guard.stop();
    }
}

async fn service_lanes<O: OccupancySource>(
    ctx: &CycleContext<O>,
    cancel_token: &CancellationToken,
) {
    loop {
        let lane = {
            let guard = ctx.state.lock().await;
            guard.active_lane().cloned()
        };
        let Some(lane) = lane else {
            log_warn!("no lane in service, cycle worker exiting");
            break;
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("cycle cancelled while sampling lane {}", lane.id);
                break;
            }
            outcome = sample_lane(&ctx.occupancy, &lane, ctx.detector_timeout) => outcome,
        };

        let (sample, degraded) = match outcome {
            Ok(sample) => (sample, None),
            Err(failure) => {
                log_warn!("lane {} sampled as empty: {failure}", lane.id);
                (OccupancySample::empty(lane.id), Some(failure.to_string()))
            }
        };
        let green_seconds = ctx.policy.green_seconds(&sample);

        let event = {
            let mut guard = ctx.state.lock().await;
            if cancel_token.is_cancelled() {
                break;
            }
            guard.record_phase(sample, green_seconds, degraded)
        };
        let Some(event) = event else {
            log_warn!("lane {} left service before its phase was recorded", lane.id);
            break;
        };

        log_debug!(
            "phase #{} lane {} green {}s ({} vehicles)",
            event.sequence_number,
            event.lane_id,
            green_seconds,
            event.sample.total_vehicles()
        );
        let _ = ctx.sink.deliver(&event);

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("cycle cancelled while holding green for lane {}", lane.id);
                break;
            }
            _ = time::sleep(ctx.policy.green_duration(&event.sample)) => {}
        }

        let next = ctx.state.lock().await.advance();
        match next {
            Some(next) => log_debug!("advancing from lane {} to lane {next}", lane.id),
            None => break,
        }
    }
}

/// Runs the request on its own task so a panicking detector costs one turn
/// instead of the worker. Dropping the returned future (timeout or
/// cancellation) aborts the request.
async fn sample_lane<O: OccupancySource>(
    source: &Arc<O>,
    lane: &Lane,
    timeout: Duration,
) -> Result<OccupancySample, DetectorFailure> {
    let request = {
        let source = Arc::clone(source);
        let lane_id = lane.id;
        let region = lane.region_of_interest.clone();
        AbortOnDropHandle::new(tokio::spawn(async move {
            source.sample(lane_id, &region).await
        }))
    };

    let sample = match time::timeout(timeout, request).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => return Err(crashed_request(join_err)),
        Err(_) => return Err(DetectorFailure::Timeout(timeout)),
    };

    if sample.lane_id != lane.id {
        return Err(DetectorFailure::Malformed(format!(
            "sample for lane {} returned while servicing lane {}",
            sample.lane_id, lane.id
        )));
    }

    Ok(sample)
}

fn crashed_request(err: JoinError) -> DetectorFailure {
    if !err.is_panic() {
        return DetectorFailure::Unavailable(format!("request aborted: {err}"));
    }

    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    DetectorFailure::Unavailable(format!("detector panicked: {message}"))
}
