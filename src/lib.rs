pub mod cycle;
pub mod error;
pub mod lanes;
pub mod occupancy;
pub mod policy;
pub mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

pub use cycle::{
    ChannelSink, CycleController, LogSink, PhaseEvent, PhaseEventSink, SchedulerSnapshot,
    SchedulerStatus,
};
pub use error::{CycleError, DetectorFailure};
pub use lanes::{DirectoryLaneSource, Lane, LaneConfigSource, LaneRegistry, RegionOfInterest};
pub use occupancy::{OccupancySample, OccupancySource, SimulatedOccupancySource, VehicleCategory};
pub use policy::GreenTimePolicy;
pub use settings::{ControllerSettings, SettingsStore};

const DEFAULT_SETTINGS_FILE: &str = "lane-cycle.json";

/// Initialise `env_logger`. `RUST_LOG` directives win; otherwise Info, or
/// Debug when `LANE_CYCLE_DEBUG` is `1`/`true`.
pub fn init_logging() {
    let debug_mode = std::env::var("LANE_CYCLE_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Entry point for the `lane-cycle` binary: reads settings (first argument,
/// default `lane-cycle.json`), cycles the lanes saved under `lanesDir` with
/// simulated occupancy, and runs until Ctrl-C. SIGHUP reloads lanes.
pub fn run() {
    init_logging();

    log::info!("lane-cycle starting up...");

    let result = (|| -> Result<()> {
        let settings_path = std::env::args()
            .nth(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        let store = SettingsStore::new(settings_path)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;
        runtime.block_on(drive(store.settings()))
    })();

    if let Err(err) = result {
        log::error!("lane-cycle exited with error: {err:#}");
        std::process::exit(1);
    }
}

async fn drive(settings: ControllerSettings) -> Result<()> {
    let lanes = Arc::new(DirectoryLaneSource::new(&settings.lanes_dir));
    let occupancy = Arc::new(SimulatedOccupancySource::new(
        settings.simulation.seed,
        settings.simulation.max_per_category,
    ));
    let controller = CycleController::new(settings, lanes, occupancy, Arc::new(LogSink));

    controller.start().await?;
    wait_for_shutdown(&controller).await?;

    log::info!("shutdown requested");
    controller.stop().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown<O: OccupancySource>(controller: &CycleController<O>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                return result.context("failed to listen for Ctrl-C");
            }
            _ = hangup.recv() => {
                if let Err(err) = controller.reload_lanes().await {
                    log::warn!("lane reload failed: {err}");
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown<O: OccupancySource>(_controller: &CycleController<O>) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")
}
