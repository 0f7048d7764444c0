// src/config.rs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::scoring::ScoringConfig;
use crate::stability::StabilityConfig;
use crate::tracking::QuadTrackerConfig;

/// Top-level configuration for the tracking core. Every field has a
/// documented default, so partial YAML files work.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: QuadTrackerConfig,
    pub stability: StabilityConfig,
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
