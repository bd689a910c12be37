//! Block structure and proof-of-work sealing

use crate::error::Result;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// An ordered batch of transactions sealed by proof-of-work and linked to
/// its predecessor by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    #[serde(rename = "prev_hash")]
    pub previous_hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    /// Populated only by [`Block::mine`] and preserved verbatim across
    /// serialization; never recomputed silently.
    pub hash: Option<String>,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        difficulty: u32,
    ) -> Self {
        Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            difficulty,
            hash: None,
        }
    }

    /// Canonical key-sorted JSON of the transaction list. Going through
    /// `serde_json::Value` gives ordered object keys, so the encoding is
    /// stable no matter how the block was built or loaded.
    fn canonical_transactions(&self) -> Result<String> {
        Ok(serde_json::to_value(&self.transactions)?.to_string())
    }

    /// Hash over `index`, `timestamp`, the canonical transaction list,
    /// `previous_hash` and `nonce`. `difficulty` is not part of the input;
    /// it is enforced separately as the required prefix of the result.
    pub fn compute_hash(&self) -> Result<String> {
        let content = format!(
            "{}{}{}{}{}",
            self.index,
            self.timestamp,
            self.canonical_transactions()?,
            self.previous_hash,
            self.nonce
        );
        Ok(hex::encode(Sha256::digest(content.as_bytes())))
    }

    /// Whether a hash satisfies this block's proof-of-work prefix.
    pub fn meets_difficulty(&self, hash: &str) -> bool {
        hash.bytes().take(self.difficulty as usize).all(|b| b == b'0')
            && hash.len() >= self.difficulty as usize
    }

    /// Brute-force nonce search until the hash carries `difficulty` leading
    /// zero hex characters. Stores and returns the winning hash. CPU-bound,
    /// runs to completion; no upper bound on iterations is assumed.
    pub fn mine(&mut self) -> Result<String> {
        info!(index = self.index, difficulty = self.difficulty, "mining block");
        loop {
            let attempt = self.compute_hash()?;
            if self.meets_difficulty(&attempt) {
                info!(index = self.index, nonce = self.nonce, hash = %attempt, "block mined");
                self.hash = Some(attempt.clone());
                return Ok(attempt);
            }
            self.nonce += 1;
            if self.nonce % 100_000 == 0 {
                debug!(index = self.index, nonce = self.nonce, "still mining");
            }
        }
    }
}
