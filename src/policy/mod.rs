pub mod allocation;
pub mod config;

pub use config::{
    GreenTimePolicy, DEFAULT_MAX_GREEN_SECS, DEFAULT_MIN_GREEN_SECS, DEFAULT_WEIGHT,
};
