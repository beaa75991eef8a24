use clap::Parser;
use thiserror::Error;

use std::time::Duration;

/// Leading zero hex digits required of a proof digest
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Digest length in hex digits; a higher difficulty can never be met
const MAX_DIFFICULTY: usize = 64;

/// Errors in the node configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Difficulty must be between 1 and {max}, got {got}")]
    InvalidDifficulty { got: usize, max: usize },

    #[error("Mining reward must be a finite, non-negative number, got {0}")]
    InvalidReward(f64),

    #[error("Peer timeout must be at least one second")]
    InvalidPeerTimeout,
}

/// Configuration of a ledger node
#[derive(Debug, Clone, Parser)]
#[command(name = "pow_ledger", version, about = "Proof-of-work ledger node")]
pub struct NodeConfig {
    /// Address the HTTP server binds to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Leading zero hex digits required by the proof of work
    #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY)]
    pub difficulty: usize,

    /// Amount credited to this node for every mined block
    #[arg(long, default_value_t = 1.0)]
    pub mining_reward: f64,

    /// Seconds to wait for a peer's chain during conflict resolution
    #[arg(long, default_value_t = 5)]
    pub peer_timeout_secs: u64,

    /// Reject transactions without a valid signature (mining rewards excepted)
    #[arg(long)]
    pub require_signatures: bool,

    /// Peer to register at startup, e.g. http://127.0.0.1:5001 (repeatable)
    #[arg(long = "peer")]
    pub peers: Vec<String>,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty == 0 || self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidDifficulty {
                got: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }

        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(ConfigError::InvalidReward(self.mining_reward));
        }

        if self.peer_timeout_secs == 0 {
            return Err(ConfigError::InvalidPeerTimeout);
        }

        Ok(())
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig::parse_from(["pow_ledger"])
    }
}
