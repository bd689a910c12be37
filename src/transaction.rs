//! Signed value-transfer records

use crate::crypto::{self, Address};
use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Reserved sender identity of the genesis funding transaction. Exempt from
/// signature and balance rules.
pub const SYSTEM_FUND_SENDER: &str = "SYSTEM_INITIAL_FUND";

/// Reserved sender identity of mining reward transactions.
pub const MINING_REWARD_SENDER: &str = "MINING_REWARD";

/// Trust-mode signature placeholder, accepted by [`Transaction::verify_signature`]
/// without cryptographic verification. This exists so integration setups can
/// exercise the transfer path without distributing real keys; it must never
/// be accepted by a deployment that expects end-to-end signatures.
pub const UNCHECKED_SIGNATURE: &str = "UNCHECKED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    User,
    SystemFund,
    MiningReward,
}

/// A single value transfer. Immutable after construction except for
/// `signature`, which is set exactly once by [`Transaction::sign`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: String,
    pub sender: Address,
    pub recipient: Address,
    pub amount: f64,
    #[serde(rename = "transaction_type")]
    pub kind: TxKind,
    pub signature: Option<String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Transaction {
    /// Creates a user transfer stamped with the current time.
    pub fn new(sender: Address, recipient: Address, amount: f64) -> Self {
        Self::new_at(
            sender,
            recipient,
            amount,
            chrono::Utc::now().timestamp_millis() as u64,
        )
    }

    /// Creates a user transfer with an explicit timestamp. This is the one
    /// canonical constructor; wire formats with other field spellings are
    /// adapted at the boundary, not here.
    pub fn new_at(sender: Address, recipient: Address, amount: f64, timestamp: u64) -> Self {
        let id = Self::compute_id(&sender, &recipient, amount, timestamp);
        debug!(id = %id, sender = %sender, recipient = %recipient, amount, "transaction created");

        Transaction {
            id,
            sender,
            recipient,
            amount,
            kind: TxKind::User,
            signature: None,
            timestamp,
        }
    }

    /// Creates the genesis funding transaction.
    pub fn system_fund(recipient: Address, amount: f64) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() as u64;
        let sender = Address::from(SYSTEM_FUND_SENDER);
        let id = Self::compute_id(&sender, &recipient, amount, timestamp);

        Transaction {
            id,
            sender,
            recipient,
            amount,
            kind: TxKind::SystemFund,
            signature: None,
            timestamp,
        }
    }

    /// Creates a mining reward transaction.
    pub fn mining_reward(recipient: Address, amount: f64) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() as u64;
        let sender = Address::from(MINING_REWARD_SENDER);
        let id = Self::compute_id(&sender, &recipient, amount, timestamp);

        Transaction {
            id,
            sender,
            recipient,
            amount,
            kind: TxKind::MiningReward,
            signature: None,
            timestamp,
        }
    }

    /// Content hash identifying this transaction. The amount enters in its
    /// decimal string form so the hash survives re-serialization.
    fn compute_id(sender: &Address, recipient: &Address, amount: f64, timestamp: u64) -> String {
        let data = format!("{}{}{}{}", sender, recipient, amount, timestamp);
        hex::encode(Sha256::digest(data.as_bytes()))
    }

    /// The byte-exact message covered by the signature: a key-sorted JSON
    /// object of `{amount, receiver, sender, timestamp}`. serde_json's
    /// default object representation is ordered, so signing and verifying
    /// sides always produce identical bytes.
    pub fn message_to_sign(&self) -> String {
        serde_json::json!({
            "sender": self.sender,
            "receiver": self.recipient,
            "amount": self.amount.to_string(),
            "timestamp": self.timestamp,
        })
        .to_string()
    }

    /// Signs this transaction with the sender's wallet. The signature is
    /// set exactly once.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<()> {
        if self.signature.is_some() {
            return Err(LedgerError::InvalidTransaction(
                "Transaction already signed".to_string(),
            ));
        }
        if wallet.address() != &self.sender {
            return Err(LedgerError::InvalidTransaction(
                "Wallet address does not match sender".to_string(),
            ));
        }

        let signature = wallet.sign(self.message_to_sign().as_bytes())?;
        self.signature = Some(hex::encode(signature));
        debug!(id = %self.id, "transaction signed");
        Ok(())
    }

    /// Field-level validity. A SystemFund transaction is always valid: it
    /// seeds genesis funds and is trusted without any field checks.
    /// Signature verification is a separate layered check, see
    /// [`Transaction::verify_signature`].
    pub fn is_valid(&self) -> bool {
        if self.kind == TxKind::SystemFund {
            return true;
        }

        !self.sender.is_empty() && !self.recipient.is_empty() && self.amount > 0.0
    }

    /// Cryptographic signature check, independent of [`Transaction::is_valid`].
    /// System and reward kinds pass without a signature; the documented
    /// [`UNCHECKED_SIGNATURE`] placeholder passes without verification.
    /// Never raises: malformed input yields `false`.
    pub fn verify_signature(&self, public_key_bytes: &[u8]) -> bool {
        if self.kind != TxKind::User {
            return true;
        }

        match self.signature.as_deref() {
            None => false,
            Some(UNCHECKED_SIGNATURE) => true,
            Some(sig_hex) => match hex::decode(sig_hex) {
                Ok(sig) => crypto::verify(
                    public_key_bytes,
                    self.message_to_sign().as_bytes(),
                    &sig,
                ),
                Err(_) => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = Transaction::new_at(addr("alice"), addr("bob"), 12.5, 1_700_000_000_000);
        let b = Transaction::new_at(addr("alice"), addr("bob"), 12.5, 1_700_000_000_000);
        assert_eq!(a.id, b.id);

        let c = Transaction::new_at(addr("alice"), addr("bob"), 12.5, 1_700_000_000_001);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_canonical_round_trip() {
        let mut tx = Transaction::new_at(addr("alice"), addr("bob"), 100.0, 1_700_000_000_000);
        tx.signature = Some("deadbeef".to_string());

        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(tx, back);
        assert_eq!(tx.id, back.id);
        assert_eq!(tx.timestamp, back.timestamp);
    }

    #[test]
    fn test_wire_field_names() {
        let tx = Transaction::system_fund(addr("alice"), 10.0);
        let value = serde_json::to_value(&tx).unwrap();

        assert!(value.get("transaction_id").is_some());
        assert_eq!(value["transaction_type"], "SYSTEM_FUND");
        assert!(value["signature"].is_null());
    }

    #[test]
    fn test_message_to_sign_is_key_sorted() {
        let tx = Transaction::new_at(addr("alice"), addr("bob"), 5.0, 1_700_000_000_000);
        let message = tx.message_to_sign();
        // serde_json orders object keys, so "amount" leads and "timestamp" trails.
        assert!(message.starts_with("{\"amount\""));
        assert!(message.contains("\"receiver\""));
        assert!(message.ends_with("}"));

        // Byte-identical across calls.
        assert_eq!(message, tx.message_to_sign());
    }

    #[test]
    fn test_sign_and_verify() {
        let wallet = Wallet::generate(None);
        let mut tx = Transaction::new(wallet.address.clone(), addr("bob"), 25.0);

        tx.sign(&wallet).unwrap();
        assert!(tx.signature.is_some());
        assert!(tx.verify_signature(&wallet.public_key_bytes()));

        // A different key does not verify.
        let other = Wallet::generate(None);
        assert!(!tx.verify_signature(&other.public_key_bytes()));
    }

    #[test]
    fn test_sign_is_one_shot() {
        let wallet = Wallet::generate(None);
        let mut tx = Transaction::new(wallet.address.clone(), addr("bob"), 25.0);

        tx.sign(&wallet).unwrap();
        assert!(matches!(
            tx.sign(&wallet),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_sign_requires_matching_sender() {
        let wallet = Wallet::generate(None);
        let mut tx = Transaction::new(addr("someone-else"), addr("bob"), 25.0);
        assert!(tx.sign(&wallet).is_err());
        assert!(tx.signature.is_none());
    }

    #[test]
    fn test_is_valid_rules() {
        assert!(Transaction::new(addr("a"), addr("b"), 1.0).is_valid());
        assert!(!Transaction::new(addr("a"), addr("b"), 0.0).is_valid());
        assert!(!Transaction::new(addr("a"), addr("b"), -5.0).is_valid());
        assert!(!Transaction::new(addr(""), addr("b"), 1.0).is_valid());
        assert!(!Transaction::new(addr("a"), addr(""), 1.0).is_valid());

        // SystemFund skips every field check.
        assert!(Transaction::system_fund(addr(""), 0.0).is_valid());
    }

    #[test]
    fn test_unsigned_user_transaction_fails_signature_check() {
        let wallet = Wallet::generate(None);
        let tx = Transaction::new(wallet.address.clone(), addr("bob"), 1.0);
        assert!(!tx.verify_signature(&wallet.public_key_bytes()));
    }

    #[test]
    fn test_reward_kinds_exempt_from_signatures() {
        let reward = Transaction::mining_reward(addr("miner"), 10.0);
        assert!(reward.verify_signature(&[]));

        let fund = Transaction::system_fund(addr("alice"), 1_000_000.0);
        assert!(fund.verify_signature(&[]));
    }

    #[test]
    fn test_unchecked_signature_trust_mode() {
        let mut tx = Transaction::new(addr("alice"), addr("bob"), 1.0);
        tx.signature = Some(UNCHECKED_SIGNATURE.to_string());
        // Passes the layered check without any key material.
        assert!(tx.verify_signature(&[]));
    }
}
