//! The chain itself: an append-only sequence of blocks plus the FIFO
//! pending queue, with validation, mining, persistence and balance replay.

use crate::block::Block;
use crate::crypto::Address;
use crate::error::{LedgerError, Result};
use crate::transaction::{Transaction, TxKind, SYSTEM_FUND_SENDER};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Fixed reward credited to the miner of each block.
pub const MINING_REWARD: f64 = 10.0;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Single source of balance truth. The chain and the pending queue are
/// owned exclusively; all mutation goes through the operations below and
/// boundary layers read through the accessors.
pub struct Ledger {
    difficulty: u32,
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

impl Ledger {
    /// Creates a ledger and mines its genesis block: index 0, previous
    /// hash `"0"`, a single system-funding transaction to `funder`.
    pub fn new(difficulty: u32, funder: Address, fund_amount: f64) -> Result<Self> {
        let difficulty = difficulty.max(1);

        let mut genesis = Block::new(
            0,
            now_ms(),
            vec![Transaction::system_fund(funder, fund_amount)],
            GENESIS_PREVIOUS_HASH.to_string(),
            difficulty,
        );
        let hash = genesis.mine()?;
        info!(hash = %hash, "genesis block created");

        Ok(Ledger {
            difficulty,
            chain: vec![genesis],
            pending: Vec::new(),
        })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// The chain is never empty: genesis exists from construction.
    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain always holds genesis")
    }

    /// Validates and enqueues a transaction. SystemFund transactions bypass
    /// validation by policy; anything else failing [`Transaction::is_valid`]
    /// is rejected with the pool unchanged. Returns the new queue length.
    pub fn submit(&mut self, transaction: Transaction) -> Result<usize> {
        if transaction.kind != TxKind::SystemFund && !transaction.is_valid() {
            warn!(id = %transaction.id, sender = %transaction.sender, "rejected invalid transaction");
            return Err(LedgerError::InvalidTransaction(format!(
                "Transaction {} failed validation",
                transaction.id
            )));
        }

        self.pending.push(transaction);
        info!(pending = self.pending.len(), "transaction enqueued");
        Ok(self.pending.len())
    }

    /// Drains the pending queue into a new mined block.
    ///
    /// An empty queue is an ordinary outcome (`Ok(None)`), not an error.
    /// The reward transaction is prepended to the batch, and the queue is
    /// cleared only after the mined block has been appended, so a mining
    /// failure never loses submitted transactions.
    pub fn mine_pending(&mut self, miner: &Address) -> Result<Option<Block>> {
        if self.pending.is_empty() {
            info!("nothing to mine");
            return Ok(None);
        }

        let mut transactions = Vec::with_capacity(self.pending.len() + 1);
        transactions.push(Transaction::mining_reward(miner.clone(), MINING_REWARD));
        transactions.extend(self.pending.iter().cloned());

        let previous = self.last_block();
        let previous_hash = previous.hash.clone().ok_or(LedgerError::ChainIntegrity {
            index: previous.index,
            reason: "tip block has no hash".to_string(),
        })?;

        let mut block = Block::new(
            self.chain.len() as u64,
            now_ms(),
            transactions,
            previous_hash,
            self.difficulty,
        );
        block.mine()?;

        self.chain.push(block.clone());
        self.pending.clear();

        info!(
            index = block.index,
            transactions = block.transactions.len(),
            miner = %miner,
            "block appended"
        );
        Ok(Some(block))
    }

    /// [`Ledger::mine_pending`] followed by [`Ledger::save`]. A block is
    /// only fully committed once both the append and the save succeed; if
    /// the save fails the distinct mined-but-not-persisted error is
    /// returned so callers never report durability they do not have.
    pub fn mine_pending_and_persist(
        &mut self,
        miner: &Address,
        path: impl AsRef<Path>,
    ) -> Result<Option<Block>> {
        let Some(block) = self.mine_pending(miner)? else {
            return Ok(None);
        };

        if let Err(e) = self.save(&path) {
            return Err(LedgerError::MinedButNotPersisted {
                index: block.index,
                reason: e.to_string(),
            });
        }
        Ok(Some(block))
    }

    /// Full chain audit. For every block after genesis: the stored hash
    /// matches a recomputation, the link to the predecessor holds, the
    /// proof-of-work prefix holds for the block's own difficulty, and
    /// every non-system-fund transaction is valid. Short-circuits with the
    /// index of the first faulting block.
    pub fn validate(&self) -> Result<()> {
        debug!(length = self.chain.len(), "auditing chain");
        for i in 1..self.chain.len() {
            let current = &self.chain[i];
            let previous = &self.chain[i - 1];
            let index = current.index;

            let stored = current.hash.as_deref().ok_or(LedgerError::ChainIntegrity {
                index,
                reason: "block has no hash".to_string(),
            })?;

            if current.compute_hash()? != stored {
                return Err(LedgerError::ChainIntegrity {
                    index,
                    reason: "stored hash does not match block contents".to_string(),
                });
            }

            let previous_stored = previous.hash.as_deref().ok_or(LedgerError::ChainIntegrity {
                index: previous.index,
                reason: "block has no hash".to_string(),
            })?;
            if current.previous_hash != previous_stored {
                return Err(LedgerError::ChainIntegrity {
                    index,
                    reason: "previous_hash does not match predecessor".to_string(),
                });
            }

            if !current.meets_difficulty(stored) {
                return Err(LedgerError::ChainIntegrity {
                    index,
                    reason: format!(
                        "hash does not satisfy the proof-of-work prefix for difficulty {}",
                        current.difficulty
                    ),
                });
            }

            for tx in &current.transactions {
                if tx.kind == TxKind::SystemFund {
                    continue;
                }
                if !tx.is_valid() {
                    return Err(LedgerError::ChainIntegrity {
                        index,
                        reason: format!("invalid transaction {}", tx.id),
                    });
                }
            }
        }
        Ok(())
    }

    /// Boolean form of [`Ledger::validate`] for boundary callers.
    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "chain audit failed");
                false
            }
        }
    }

    /// Replays the whole chain to derive a balance: debit when the address
    /// is the sender (unless the sender is the system funding identity),
    /// otherwise credit when it is the recipient.
    ///
    /// O(total transactions) per query. There is no cached balance table:
    /// corruption is caught by full replay validation, and an incremental
    /// model would change those repair semantics.
    pub fn balance_of(&self, address: &Address) -> f64 {
        let mut balance = 0.0;
        for block in &self.chain {
            for tx in &block.transactions {
                if &tx.sender == address && tx.sender.as_str() != SYSTEM_FUND_SENDER {
                    balance -= tx.amount;
                } else if &tx.recipient == address {
                    balance += tx.amount;
                }
            }
        }
        debug!(address = %address, balance, "balance replayed");
        balance
    }

    /// Hash protecting the persisted file as a whole: SHA-256 of the
    /// canonical key-sorted JSON of the chain data.
    fn chain_hash_of(chain_data: &Value) -> String {
        hex::encode(Sha256::digest(chain_data.to_string().as_bytes()))
    }

    /// Writes `{"chain_data": [...], "chain_hash": "<hex>"}`, recomputing
    /// the chain hash over the freshly serialized chain every time.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let chain_data = serde_json::to_value(&self.chain)?;
        let chain_hash = Self::chain_hash_of(&chain_data);
        let document = json!({
            "chain_data": chain_data,
            "chain_hash": chain_hash,
        });

        fs::write(path, serde_json::to_string_pretty(&document)?)?;
        info!(path = %path.display(), blocks = self.chain.len(), "ledger saved");
        Ok(())
    }

    /// Loads and verifies a persisted chain, replacing the in-memory chain
    /// only after every check passes:
    ///
    /// 1. the file parses and carries both `chain_data` and `chain_hash`;
    /// 2. the recomputed chain hash matches the stored one;
    /// 3. every block's stored hash matches a recomputation of its fields;
    /// 4. every stored hash satisfies its stored difficulty's prefix;
    /// 5. the full chain audit passes.
    ///
    /// Any rejection leaves the in-memory ledger exactly as it was.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            LedgerError::Persistence(format!("Cannot read ledger file {}: {}", path.display(), e))
        })?;
        let document: Value = serde_json::from_str(&contents).map_err(|e| {
            LedgerError::Persistence(format!("Malformed ledger file {}: {}", path.display(), e))
        })?;

        let chain_data = document
            .get("chain_data")
            .ok_or_else(|| LedgerError::Persistence("File has no chain_data".to_string()))?;
        let stored_chain_hash = document
            .get("chain_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Persistence("File has no chain_hash".to_string()))?;

        if Self::chain_hash_of(chain_data) != stored_chain_hash {
            warn!(path = %path.display(), "chain hash mismatch, refusing to load");
            return Err(LedgerError::ChainIntegrity {
                index: 0,
                reason: "chain hash does not match file contents; data may have been modified"
                    .to_string(),
            });
        }

        let blocks: Vec<Block> = serde_json::from_value(chain_data.clone()).map_err(|e| {
            LedgerError::Persistence(format!("Malformed chain data: {}", e))
        })?;
        if blocks.is_empty() {
            return Err(LedgerError::Persistence("File holds an empty chain".to_string()));
        }

        for block in &blocks {
            let stored = block.hash.as_deref().ok_or(LedgerError::ChainIntegrity {
                index: block.index,
                reason: "block has no hash".to_string(),
            })?;
            if block.compute_hash()? != stored {
                return Err(LedgerError::ChainIntegrity {
                    index: block.index,
                    reason: "stored hash does not match block contents".to_string(),
                });
            }
            if !block.meets_difficulty(stored) {
                return Err(LedgerError::ChainIntegrity {
                    index: block.index,
                    reason: format!(
                        "hash does not satisfy the proof-of-work prefix for difficulty {}",
                        block.difficulty
                    ),
                });
            }
        }

        let candidate = Ledger {
            difficulty: self.difficulty,
            chain: blocks,
            pending: Vec::new(),
        };
        candidate.validate()?;

        self.chain = candidate.chain;
        info!(path = %path.display(), blocks = self.chain.len(), "ledger loaded and verified");
        Ok(())
    }
}
