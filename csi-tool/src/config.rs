//! TOML scenario for the `simulate` subcommand

use anyhow::{Context, Result};
use interfaces::csi_log::CsiLogConfig;
use layers::phy::srs::SrsResourceConfiguration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Synthetic sounding scenario
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Bandwidth of the grid in PRB
    #[serde(default = "default_nof_prb")]
    pub nof_prb: u16,
    /// Numerology of the carrier
    #[serde(default = "default_numerology")]
    pub numerology: u8,
    /// Receive ports to process
    #[serde(default = "default_rx_ports")]
    pub rx_ports: Vec<u8>,
    /// UE identity attached to every occasion (0 disables CSI capture)
    #[serde(default = "default_rnti")]
    pub rnti: u16,
    /// Number of sounding occasions
    #[serde(default = "default_occasions")]
    pub occasions: u32,
    /// Signal-to-noise ratio per resource element
    #[serde(default = "default_snr_db")]
    pub snr_db: f32,
    /// Propagation delay of the synthetic channel
    #[serde(default)]
    pub delay_ns: f64,
    /// Seed of the channel and noise generator
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// SRS resource
    pub resource: SrsResourceConfiguration,
    /// CSI capture
    #[serde(default)]
    pub csi_log: CsiLogConfig,
}

fn default_nof_prb() -> u16 {
    52
}

fn default_numerology() -> u8 {
    1
}

fn default_rx_ports() -> Vec<u8> {
    vec![0]
}

fn default_rnti() -> u16 {
    0x4601
}

fn default_occasions() -> u32 {
    10
}

fn default_snr_db() -> f32 {
    20.0
}

fn default_seed() -> u64 {
    1
}

impl SimulationConfig {
    /// Load a scenario from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
