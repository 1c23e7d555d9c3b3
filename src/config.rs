// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Cohesix Codex
// Date Modified: 2026-10-17

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::entity::{demo_entities, Snapshot};
use crate::error::{MirrorError, Result};
use crate::source::{FileSnapshots, SharedSnapshots, SimulatedValues, SnapshotSource};
use crate::updater::ReconcileTrigger;

/// Environment variable naming the active config file.
pub const CONFIG_ENV: &str = "NODEMIRROR_CONFIG";

/// Parameters of the simulated value source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub min: f64,
    pub max: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            min: 0.0,
            max: 99.0,
        }
    }
}

impl SimulationConfig {
    pub fn values(&self) -> SimulatedValues {
        SimulatedValues::new(self.seed, self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub tick_interval_ms: u64,
    /// Snapshot document to poll; the demo namespace is served when unset.
    pub snapshot_path: Option<PathBuf>,
    pub reconcile: ReconcileTrigger,
    pub simulation: SimulationConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            snapshot_path: None,
            reconcile: ReconcileTrigger::OnAdvance,
            simulation: SimulationConfig::default(),
        }
    }
}

impl MirrorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| MirrorError::Config(e.to_string()))?;
        config.tick_interval()?;
        if config.simulation.max < config.simulation.min {
            return Err(MirrorError::Config(format!(
                "simulation range {}..{} is empty",
                config.simulation.min, config.simulation.max
            )));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| MirrorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Config named by `NODEMIRROR_CONFIG`, or defaults when the variable
    /// is unset or the file cannot be used.
    pub fn load_active() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                warn!("[config] using default config: {e}");
                Self::default()
            }
        }
    }

    pub fn tick_interval(&self) -> Result<Duration> {
        if self.tick_interval_ms == 0 {
            return Err(MirrorError::Config(
                "tick_interval_ms must be positive".to_owned(),
            ));
        }
        Ok(Duration::from_millis(self.tick_interval_ms))
    }

    /// Source for entity snapshots: the configured file, or an in-memory
    /// source seeded with the demo namespace.
    pub fn snapshot_source(&self) -> Box<dyn SnapshotSource> {
        match &self.snapshot_path {
            Some(path) => Box::new(FileSnapshots::new(path.clone())),
            None => Box::new(SharedSnapshots::new(Snapshot::new(1, demo_entities()))),
        }
    }
}
