use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEIGHT: f64 = 1.5;
pub const DEFAULT_MIN_GREEN_SECS: u32 = 5;
pub const DEFAULT_MAX_GREEN_SECS: u32 = 35;

/// Tunables for the green-time allocation. Construction validates the
/// bounds, so every instance maps any vehicle count into `[min, max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "PolicyFields", into = "PolicyFields")]
pub struct GreenTimePolicy {
    weight: f64,
    min_green_secs: u32,
    max_green_secs: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PolicyFields {
    /// Seconds of green per detected vehicle.
    weight: f64,
    /// Fairness floor; an empty lane still gets this much.
    min_green: u32,
    /// Cap keeping one congested lane from monopolising the cycle.
    max_green: u32,
}

impl Default for PolicyFields {
    fn default() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
            min_green: DEFAULT_MIN_GREEN_SECS,
            max_green: DEFAULT_MAX_GREEN_SECS,
        }
    }
}

impl TryFrom<PolicyFields> for GreenTimePolicy {
    type Error = anyhow::Error;

    fn try_from(fields: PolicyFields) -> Result<Self> {
        GreenTimePolicy::new(fields.weight, fields.min_green, fields.max_green)
    }
}

impl From<GreenTimePolicy> for PolicyFields {
    fn from(policy: GreenTimePolicy) -> Self {
        Self {
            weight: policy.weight,
            min_green: policy.min_green_secs,
            max_green: policy.max_green_secs,
        }
    }
}

impl Default for GreenTimePolicy {
    fn default() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
            min_green_secs: DEFAULT_MIN_GREEN_SECS,
            max_green_secs: DEFAULT_MAX_GREEN_SECS,
        }
    }
}

impl GreenTimePolicy {
    pub fn new(weight: f64, min_green_secs: u32, max_green_secs: u32) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            bail!("green-time weight must be a finite non-negative number, got {weight}");
        }
        if min_green_secs > max_green_secs {
            bail!("minimum green ({min_green_secs}s) exceeds maximum green ({max_green_secs}s)");
        }

        Ok(Self {
            weight,
            min_green_secs,
            max_green_secs,
        })
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn min_green_secs(&self) -> u32 {
        self.min_green_secs
    }

    pub fn max_green_secs(&self) -> u32 {
        self.max_green_secs
    }
}
