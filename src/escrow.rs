//! Deadline-gated transfer intents, executed at most once.

use crate::crypto::Address;
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::transaction::{Transaction, UNCHECKED_SIGNATURE};
use crate::wallet::Wallet;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{info, warn};

/// A commitment to transfer `amount` before `deadline`. Creating one moves
/// no funds and reserves nothing: the sender can still spend the committed
/// amount elsewhere before execution. That is a known limitation of the
/// no-lock design, not something execution compensates for.
#[derive(Debug, Clone, Serialize)]
pub struct Escrow {
    pub sender: Address,
    pub recipient: Address,
    pub amount: f64,
    /// Milliseconds since the Unix epoch.
    pub deadline: u64,
    pub executed: bool,
}

/// Result of executing an escrow. All three are ordinary outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscrowOutcome {
    /// Executed before the deadline; the transfer was submitted to the ledger.
    Transferred,
    /// Executed after the deadline; funds never moved, so nothing is
    /// submitted and the refund is purely a reported outcome.
    Refunded,
    /// Already executed earlier; calling again changes nothing.
    AlreadyExecuted,
}

/// Owns the registry of active contracts. Callers hold a handle to the
/// manager; nothing else mutates the map.
#[derive(Debug, Default)]
pub struct EscrowManager {
    contracts: HashMap<String, Escrow>,
}

impl EscrowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a contract and returns its id. No funds move here.
    pub fn create(
        &mut self,
        sender: Address,
        recipient: Address,
        amount: f64,
        deadline: u64,
    ) -> Result<String> {
        if amount <= 0.0 {
            return Err(LedgerError::InvalidTransaction(
                "Escrow amount must be positive".to_string(),
            ));
        }
        if sender.is_empty() || recipient.is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "Escrow requires both sender and recipient".to_string(),
            ));
        }

        let created = chrono::Utc::now().timestamp_millis() as u64;
        let id = hex::encode(Sha256::digest(
            format!("{}{}{}{}{}", sender, recipient, amount, deadline, created).as_bytes(),
        ));

        info!(id = %id, sender = %sender, recipient = %recipient, amount, deadline, "escrow created");
        self.contracts.insert(
            id.clone(),
            Escrow {
                sender,
                recipient,
                amount,
                deadline,
                executed: false,
            },
        );
        Ok(id)
    }

    /// Executes a contract at time `now` (milliseconds).
    ///
    /// Before the deadline the transfer is submitted to the ledger, signed
    /// with `wallet` when one is provided and otherwise carrying the
    /// trust-mode placeholder signature. After the deadline nothing is
    /// submitted: funds never moved, so the refund is only a signal.
    /// `executed` flips to true exactly once; later calls are idempotent.
    pub fn execute(
        &mut self,
        id: &str,
        now: u64,
        ledger: &mut Ledger,
        wallet: Option<&Wallet>,
    ) -> Result<EscrowOutcome> {
        let contract = self.contracts.get_mut(id).ok_or_else(|| {
            LedgerError::InvalidTransaction(format!("Unknown escrow contract {}", id))
        })?;

        if contract.executed {
            info!(id = %id, "escrow already executed");
            return Ok(EscrowOutcome::AlreadyExecuted);
        }

        if now <= contract.deadline {
            let mut tx = Transaction::new_at(
                contract.sender.clone(),
                contract.recipient.clone(),
                contract.amount,
                now,
            );
            match wallet {
                Some(wallet) => tx.sign(wallet)?,
                None => tx.signature = Some(UNCHECKED_SIGNATURE.to_string()),
            }
            ledger.submit(tx)?;

            contract.executed = true;
            info!(id = %id, amount = contract.amount, "escrow executed, transfer submitted");
            Ok(EscrowOutcome::Transferred)
        } else {
            contract.executed = true;
            warn!(id = %id, "escrow past deadline, reporting refund");
            Ok(EscrowOutcome::Refunded)
        }
    }

    /// Status query for a contract id.
    pub fn get(&self, id: &str) -> Option<&Escrow> {
        self.contracts.get(id)
    }
}
