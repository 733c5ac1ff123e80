//! Host configuration, loaded from RON.

use std::path::{Path, PathBuf};

use battle_core::battle::{check_dimensions, MAX_BATTLEFIELD_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Battle host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Width of battles created without explicit bounds.
    pub default_width: u32,
    /// Height of battles created without explicit bounds.
    pub default_height: u32,
    /// Maximum fractions per battle.
    pub max_fractions: usize,
    /// Maximum ships per fraction.
    pub max_ships_per_fraction: usize,
    /// Unlock battles from memory after this many idle seconds.
    pub idle_eviction_secs: u64,
    /// Directory for file-backed persistence; in-memory when absent.
    pub snapshot_dir: Option<PathBuf>,
    /// Buffered notifications per subscriber before it starts lagging.
    pub notification_capacity: usize,
    /// Replay the event log when loading a battle and reject divergent ones.
    pub verify_replay_on_load: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_width: 1000,
            default_height: 800,
            max_fractions: 8,
            max_ships_per_fraction: 50,
            idle_eviction_secs: 900,
            snapshot_dir: None,
            notification_capacity: 256,
            verify_replay_on_load: true,
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse a configuration from a RON string. Missing fields take defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the host cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.default_width, self.default_height).map_err(|_| {
            ServerError::InvalidConfig(format!(
                "default battle bounds must be between 1 and {MAX_BATTLEFIELD_SIZE}"
            ))
        })?;
        if self.max_fractions == 0 || self.max_ships_per_fraction == 0 {
            return Err(ServerError::InvalidConfig(
                "fraction and ship limits must be positive".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(ServerError::InvalidConfig(
                "notification capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
