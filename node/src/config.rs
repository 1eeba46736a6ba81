//! Node configuration with TOML file support.
//!
//! One nested section per component. Amounts are written as decimal strings
//! because raw units exceed what TOML integers can carry.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kestrel_types::{Amount, Network};

use crate::error::NodeError;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub opencl: OpenclSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSection {
    /// Which network to join.
    #[serde(default = "default_network")]
    pub network: Network,

    /// Data directory for the block store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// UDP/TCP port for peering and bootstrap.
    #[serde(default = "default_peering_port")]
    pub peering_port: u16,

    /// Size of the reader pool.
    #[serde(default = "default_io_threads")]
    pub io_threads: usize,

    /// Generate representative votes for blocks we see.
    #[serde(default)]
    pub enable_voting: bool,

    /// Global outbound bytes per second; zero means unlimited.
    #[serde(default)]
    pub bandwidth_limit: u64,

    /// Balance below which an account does not count as a representative
    /// (decimal raw units).
    #[serde(default = "default_vote_minimum")]
    pub vote_minimum: String,

    /// Receivables below this amount are skipped by auto-receive
    /// (decimal raw units).
    #[serde(default = "default_receive_minimum")]
    pub receive_minimum: String,

    /// Simultaneous bootstrap connections.
    #[serde(default = "default_bootstrap_connections")]
    pub bootstrap_connections: usize,

    /// Unchecked entries older than this many seconds are swept.
    #[serde(default = "default_unchecked_cutoff_secs")]
    pub unchecked_cutoff_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OpenclSection {
    /// Delegate proof-of-work generation to an OpenCL device.
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub platform: u32,
    #[serde(default)]
    pub device: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> Network {
    Network::Dev
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./kestrel_data")
}

fn default_peering_port() -> u16 {
    Network::Dev.default_port()
}

fn default_io_threads() -> usize {
    4
}

fn default_vote_minimum() -> String {
    // 2^96 raw — small balances do not make a representative.
    "79228162514264337593543950336".to_string()
}

fn default_receive_minimum() -> String {
    "1".to_string()
}

fn default_bootstrap_connections() -> usize {
    4
}

fn default_unchecked_cutoff_secs() -> u64 {
    4 * 3600
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            peering_port: default_peering_port(),
            io_threads: default_io_threads(),
            enable_voting: false,
            bandwidth_limit: 0,
            vote_minimum: default_vote_minimum(),
            receive_minimum: default_receive_minimum(),
            bootstrap_connections: default_bootstrap_connections(),
            unchecked_cutoff_secs: default_unchecked_cutoff_secs(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, NodeError> {
        toml::from_str(text).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn vote_minimum(&self) -> Result<Amount, NodeError> {
        parse_amount(&self.node.vote_minimum, "node.vote_minimum")
    }

    pub fn receive_minimum(&self) -> Result<Amount, NodeError> {
        parse_amount(&self.node.receive_minimum, "node.receive_minimum")
    }
}

fn parse_amount(text: &str, key: &str) -> Result<Amount, NodeError> {
    text.parse::<u128>()
        .map(Amount::raw)
        .map_err(|_| NodeError::Config(format!("{key} is not a decimal raw amount: {text}")))
}
