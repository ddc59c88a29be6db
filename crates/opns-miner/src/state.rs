//! Mining statistics and reports printed by the CLI.

use crate::pow::PowResult;
use opns_core::difficulty::format_hash_rate;
use opns_core::hash::hash_to_display_hex;
use serde::{Deserialize, Serialize};

/// Mining statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiningStats {
    /// Total hashes computed.
    pub total_hashes: u64,
    /// Current hash rate (hashes per second).
    pub hash_rate: f64,
    /// Characters mined and broadcast.
    pub characters_mined: u32,
    /// Time spent searching for proofs of work, in milliseconds.
    pub elapsed_ms: f64,
    /// Txid of the most recent broadcast.
    pub last_txid: Option<String>,
}

impl MiningStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one proof-of-work search.
    pub fn record_pow(&mut self, pow: &PowResult) {
        self.total_hashes += pow.attempts;
        self.elapsed_ms += pow.elapsed.as_secs_f64() * 1000.0;
        self.update_hash_rate();
    }

    /// Account for a broadcast claim.
    pub fn record_claim(&mut self, txid: &str) {
        self.characters_mined += 1;
        self.last_txid = Some(txid.to_string());
    }

    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        if self.elapsed_ms > 0.0 {
            self.hash_rate = (self.total_hashes as f64) / (self.elapsed_ms / 1000.0);
        }
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        format_hash_rate(self.hash_rate)
    }
}

/// Output of a standalone proof-of-work search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PowReport {
    /// Nonce as hex.
    pub nonce: String,
    /// Digest in display byte order.
    pub hash: String,
    pub hashes: u64,
}

impl From<&PowResult> for PowReport {
    fn from(result: &PowResult) -> Self {
        PowReport {
            nonce: hex::encode(result.nonce),
            hash: hash_to_display_hex(&result.hash),
            hashes: result.attempts,
        }
    }
}
