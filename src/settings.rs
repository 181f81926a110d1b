use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::policy::GreenTimePolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerSettings {
    pub policy: GreenTimePolicy,
    /// Upper bound on a single occupancy request.
    pub detector_timeout_ms: u64,
    /// How long `stop()` waits for the worker before aborting it.
    pub shutdown_grace_ms: u64,
    /// Directory of saved lane regions.
    pub lanes_dir: PathBuf,
    /// Capacity of the phase-event channel handed to consumers.
    pub event_buffer: usize,
    pub simulation: SimulationSettings,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            policy: GreenTimePolicy::default(),
            detector_timeout_ms: 100,
            shutdown_grace_ms: 500,
            lanes_dir: PathBuf::from("data/areas"),
            event_buffer: 64,
            simulation: SimulationSettings::default(),
        }
    }
}

impl ControllerSettings {
    pub fn detector_timeout(&self) -> Duration {
        Duration::from_millis(self.detector_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Traffic generator used by the `lane-cycle` binary in place of a detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationSettings {
    pub seed: u64,
    pub max_per_category: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 7,
            max_per_category: 6,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ControllerSettings>,
}

impl SettingsStore {
    /// Reads `path` if it exists, otherwise starts from defaults. Invalid
    /// JSON or an invalid policy is an error rather than a silent default.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            ControllerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> ControllerSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-reads the file. The previous settings stay in place on error.
    pub fn reload(&self) -> Result<()> {
        let data = read_settings(&self.path)?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = data;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<ControllerSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid settings in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("lane-cycle-settings-{}.json", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("lane-cycle-absent-{}.json", Uuid::new_v4()));
        let store = SettingsStore::new(path).unwrap();
        let settings = store.settings();

        assert_eq!(settings, ControllerSettings::default());
        assert_eq!(settings.detector_timeout(), Duration::from_millis(100));
        assert_eq!(settings.policy.min_green_secs(), 5);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = scratch_file(
            r#"{"detectorTimeoutMs": 40, "policy": {"maxGreen": 60}, "lanesDir": "/tmp/areas"}"#,
        );
        let settings = SettingsStore::new(path.clone()).unwrap().settings();

        assert_eq!(settings.detector_timeout_ms, 40);
        assert_eq!(settings.shutdown_grace_ms, 500);
        assert_eq!(settings.policy.max_green_secs(), 60);
        assert_eq!(settings.policy.weight(), 1.5);
        assert_eq!(settings.lanes_dir, PathBuf::from("/tmp/areas"));

        fs::remove_file(path).ok();
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let path = scratch_file(r#"{"policy": {"minGreen": 40, "maxGreen": 10}}"#);
        assert!(SettingsStore::new(path.clone()).is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn reload_keeps_previous_settings_on_error() {
        let path = scratch_file(r#"{"eventBuffer": 8}"#);
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.settings().event_buffer, 8);

        fs::write(&path, r#"{"eventBuffer": 16}"#).unwrap();
        store.reload().unwrap();
        assert_eq!(store.settings().event_buffer, 16);

        fs::write(&path, "{not json").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.settings().event_buffer, 16);

        fs::remove_file(path).ok();
    }
}
