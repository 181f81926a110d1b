use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use super::{
    model::{GeoLocation, Lane, LaneId, DEFAULT_LANE_LABEL},
    region::RegionOfInterest,
};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "lane_cycle::lanes";

use crate::{log_info, log_warn};

/// File in the areas directory carrying per-lane display metadata.
pub const LANE_METADATA_FILE: &str = "lanes.json";

/// Supplies the lane set each time the registry is (re)built.
pub trait LaneConfigSource: Send + Sync {
    fn load_lanes(&self) -> Result<Vec<Lane>>;
}

/// In-memory lane set. `replace` swaps what the next load returns.
pub struct StaticLaneSource {
    lanes: Mutex<Vec<Lane>>,
}

impl StaticLaneSource {
    pub fn new(lanes: Vec<Lane>) -> Self {
        Self {
            lanes: Mutex::new(lanes),
        }
    }

    pub fn replace(&self, lanes: Vec<Lane>) {
        let mut guard = match self.lanes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = lanes;
    }
}

impl LaneConfigSource for StaticLaneSource {
    fn load_lanes(&self) -> Result<Vec<Lane>> {
        let guard = match self.lanes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(guard.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct LaneMetadata {
    label: Option<String>,
    location: Option<GeoLocation>,
}

/// Reads ROI polygons saved by the region editor: one `<lane id>.txt` (or
/// `.json`) file per lane, each a JSON array of `{"x": .., "y": ..}` points.
/// An optional `lanes.json` maps lane ids to labels and signal locations.
pub struct DirectoryLaneSource {
    dir: PathBuf,
}

impl DirectoryLaneSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_metadata(&self) -> Result<HashMap<LaneId, LaneMetadata>> {
        let path = self.dir.join(LANE_METADATA_FILE);
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read lane metadata {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid lane metadata in {}", path.display()))
    }
}

impl LaneConfigSource for DirectoryLaneSource {
    fn load_lanes(&self) -> Result<Vec<Lane>> {
        if !self.dir.is_dir() {
            bail!("areas directory {} does not exist", self.dir.display());
        }

        let mut metadata = self.load_metadata()?;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?;

        let mut lanes = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list {}", self.dir.display()))?
                .path();
            let Some(id) = roi_file_lane_id(&path) else {
                continue;
            };

            let region = match read_region(&path) {
                Ok(region) => region,
                Err(err) => {
                    log_warn!("skipping lane {id}: {err:#}");
                    continue;
                }
            };

            let meta = metadata.remove(&id).unwrap_or_default();
            lanes.push(Lane {
                id,
                region_of_interest: region,
                label: meta.label.unwrap_or_else(|| DEFAULT_LANE_LABEL.to_string()),
                location: meta.location,
            });
        }

        lanes.sort_by_key(|lane| lane.id);
        log_info!("loaded {} lane region(s) from {}", lanes.len(), self.dir.display());
        Ok(lanes)
    }
}

fn roi_file_lane_id(path: &Path) -> Option<LaneId> {
    if path.file_name().and_then(|name| name.to_str()) == Some(LANE_METADATA_FILE) {
        return None;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("txt") | Some("json") => {}
        _ => return None,
    }
    path.file_stem()?.to_str()?.parse().ok()
}

fn read_region(path: &Path) -> Result<RegionOfInterest> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid region of interest in {}", path.display()))
}
