//! Configuration loading for MargaNav

use crate::error::{MargaError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MargaConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub sequencer: SequencerConfig,
}

/// Inbound path/command and outbound status transport
#[derive(Clone, Debug, Deserialize)]
pub struct BridgeConfig {
    /// TCP bind address for observers and command sources (default: 0.0.0.0:5560)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Which navigation backend receives the goals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Goal server reachable over TCP
    #[default]
    Tcp,
    /// In-process simulated backend that succeeds every goal
    Mock,
}

/// Navigation backend settings
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Goal server address (default: 127.0.0.1:5570)
    #[serde(default = "default_backend_address")]
    pub address: String,

    /// Connection timeout in milliseconds (default: 5000)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Simulated travel time per goal for the mock backend (default: 0)
    #[serde(default)]
    pub mock_goal_duration_ms: u64,
}

/// Waypoint sequencing parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SequencerConfig {
    /// Frame every goal is expressed in (default: "map")
    #[serde(default = "default_goal_frame_id")]
    pub goal_frame_id: String,

    /// Full passes over the path for the "loop" command (default: 3)
    #[serde(default = "default_loop_passes")]
    pub loop_passes: u32,

    /// Consecutive rejected/aborted goals that halt a run (0 = never halt)
    #[serde(default)]
    pub max_consecutive_failures: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            address: default_backend_address(),
            connect_timeout_ms: default_connect_timeout(),
            mock_goal_duration_ms: 0,
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            goal_frame_id: default_goal_frame_id(),
            loop_passes: default_loop_passes(),
            max_consecutive_failures: 0,
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:5560".to_string()
}
fn default_backend_address() -> String {
    "127.0.0.1:5570".to_string()
}
fn default_connect_timeout() -> u64 {
    5000
}
fn default_goal_frame_id() -> String {
    "map".to_string()
}
fn default_loop_passes() -> u32 {
    3
}

impl MargaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MargaError::Config(format!("Failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: MargaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sequencer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sequencer.loop_passes == 0 {
            return Err(MargaError::Config(
                "sequencer.loop_passes must be at least 1".into(),
            ));
        }
        if self.sequencer.goal_frame_id.trim().is_empty() {
            return Err(MargaError::Config(
                "sequencer.goal_frame_id must not be empty".into(),
            ));
        }
        Ok(())
    }
}
