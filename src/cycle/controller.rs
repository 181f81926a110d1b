use std::sync::Arc;

use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::CycleError,
    lanes::{LaneConfigSource, LaneRegistry},
    occupancy::OccupancySource,
    settings::ControllerSettings,
};

use super::{
    event::PhaseEventSink,
    loop_worker::{cycle_loop, CycleContext},
    state::{SchedulerSnapshot, SchedulerState, SchedulerStatus},
};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "lane_cycle::cycle";

use crate::{log_error, log_info, log_warn};

struct CycleWorker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Lifecycle surface for one intersection: `start`, `stop`, `reload_lanes`,
/// plus consistent snapshots for status queries. Cheap to clone; clones
/// drive the same scheduler.
pub struct CycleController<O: OccupancySource> {
    state: Arc<Mutex<SchedulerState>>,
    lanes: Arc<dyn LaneConfigSource>,
    occupancy: Arc<O>,
    sink: Arc<dyn PhaseEventSink>,
    settings: ControllerSettings,
    worker: Arc<Mutex<Option<CycleWorker>>>,
}

impl<O: OccupancySource> Clone for CycleController<O> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            lanes: self.lanes.clone(),
            occupancy: self.occupancy.clone(),
            sink: self.sink.clone(),
            settings: self.settings.clone(),
            worker: self.worker.clone(),
        }
    }
}

impl<O: OccupancySource> CycleController<O> {
    pub fn new(
        settings: ControllerSettings,
        lanes: Arc<dyn LaneConfigSource>,
        occupancy: Arc<O>,
        sink: Arc<dyn PhaseEventSink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::new())),
            lanes,
            occupancy,
            sink,
            settings,
            worker: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.state.lock().await.status()
    }

    pub async fn snapshot(&self) -> SchedulerSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Loads lanes if none are configured yet, then begins servicing the
    /// lowest lane id. A configuration failure leaves the scheduler
    /// `Unconfigured`.
    pub async fn start(&self) -> Result<SchedulerSnapshot, CycleError> {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return Err(CycleError::AlreadyRunning);
        }

        let status = self.state.lock().await.status();
        let registry = match status {
            SchedulerStatus::Stopped => return Err(CycleError::Stopped),
            SchedulerStatus::Servicing(_) | SchedulerStatus::Advancing => {
                return Err(CycleError::AlreadyRunning)
            }
            SchedulerStatus::Unconfigured => Some(self.load_registry().await.map_err(|err| {
                log_warn!("start refused: {err}");
                err
            })?),
            SchedulerStatus::Idle => None,
        };

        {
            let mut state = self.state.lock().await;
            if state.status() == SchedulerStatus::Stopped {
                return Err(CycleError::Stopped);
            }
            if let Some(registry) = registry {
                state.configure(registry);
            }

            let run_id = Uuid::new_v4();
            let first = state.begin_run(run_id)?;
            log_info!(
                "lane cycle {run_id} started over lanes {:?}, servicing lane {first}",
                state.lane_order()
            );
        }

        let cancel_token = CancellationToken::new();
        let ctx = CycleContext {
            state: self.state.clone(),
            occupancy: self.occupancy.clone(),
            sink: self.sink.clone(),
            policy: self.settings.policy,
            detector_timeout: self.settings.detector_timeout(),
        };
        let handle = tokio::spawn(cycle_loop(ctx, cancel_token.clone()));
        *worker = Some(CycleWorker {
            handle,
            cancel_token,
        });
        drop(worker);

        Ok(self.snapshot().await)
    }

    /// Cancels the worker and moves to `Stopped`. The worker gets
    /// `shutdown_grace` to observe cancellation before it is aborted.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;

        if let Some(CycleWorker {
            mut handle,
            cancel_token,
        }) = worker.take()
        {
            cancel_token.cancel();
            let grace = self.settings.shutdown_grace();
            match time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log_error!("cycle worker failed to join: {err}"),
                Err(_) => {
                    log_warn!("cycle worker still running after {grace:?}, aborting");
                    handle.abort();
                }
            }
        }

        let mut state = self.state.lock().await;
        if state.status() != SchedulerStatus::Stopped {
            state.stop();
            log_info!("lane cycle stopped after {} phase(s)", state.next_sequence());
        }
    }

    /// Rebuilds the registry from the configuration source. While a run is
    /// in progress the new registry waits for the next lane boundary;
    /// otherwise it applies immediately. A failed load keeps the current
    /// registry.
    pub async fn reload_lanes(&self) -> Result<(), CycleError> {
        let _worker = self.worker.lock().await;

        if self.state.lock().await.status() == SchedulerStatus::Stopped {
            return Err(CycleError::Stopped);
        }

        let registry = self.load_registry().await.map_err(|err| {
            log_warn!("lane reload rejected: {err}");
            err
        })?;

        let mut state = self.state.lock().await;
        match state.status() {
            SchedulerStatus::Stopped => Err(CycleError::Stopped),
            SchedulerStatus::Unconfigured | SchedulerStatus::Idle => {
                log_info!("lanes configured: {:?}", registry.lane_ids());
                state.configure(registry);
                Ok(())
            }
            SchedulerStatus::Servicing(_) | SchedulerStatus::Advancing => {
                log_info!(
                    "lanes {:?} staged for the next lane boundary",
                    registry.lane_ids()
                );
                state.stage(registry);
                Ok(())
            }
        }
    }

    /// Lane sources may touch the filesystem, so the load runs on the
    /// blocking pool and never holds the state lock.
    async fn load_registry(&self) -> Result<LaneRegistry, CycleError> {
        let lanes = Arc::clone(&self.lanes);
        tokio::task::spawn_blocking(move || LaneRegistry::load(lanes.as_ref()))
            .await
            .map_err(|err| CycleError::Configuration(format!("lane loader failed: {err}")))?
    }
}
