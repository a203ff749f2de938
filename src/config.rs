//! # Engine Configuration
//! Tuning knobs for the rollup engine, loaded from a JSON file with
//! per-field serde defaults. A missing or unreadable file silently
//! falls back to the defaults so the engine always boots.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

/// Env var overriding the config file location.
pub const ENV_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";
/// Default config file location, relative to the runtime working dir.
pub const DEFAULT_CONFIG_PATH: &str = "engine_config.json";

fn default_proposal_stage_name() -> String {
    // Tag name the ingestion pipeline assigns to paid proposal articles.
    "提案（有料記事）".to_string()
}

fn default_spike_sigma() -> f64 {
    2.0
}

fn default_above_average_factor() -> f64 {
    1.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Exact name of the primary classification that marks the funnel's
    /// proposal stage.
    #[serde(default = "default_proposal_stage_name")]
    pub proposal_stage_name: String,
    /// Spike threshold multiplier: mean + sigma × population stddev.
    #[serde(default = "default_spike_sigma")]
    pub spike_sigma: f64,
    /// Above-average threshold multiplier: mean × factor.
    #[serde(default = "default_above_average_factor")]
    pub above_average_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proposal_stage_name: default_proposal_stage_name(),
            spike_sigma: default_spike_sigma(),
            above_average_factor: default_above_average_factor(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; fall back to defaults on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Load from `ENGINE_CONFIG_PATH`, or the default location.
    pub fn load() -> Self {
        let path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_file(path)
    }
}
