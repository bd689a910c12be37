//! Wallet operations: key ownership, signing, and file persistence

use crate::crypto::{Address, KeyPair};
use crate::error::{LedgerError, Result};
use secp256k1::constants::COMPACT_SIGNATURE_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// On-disk wallet format. The secret key is stored as hex; the address is
/// written out for convenience but the key remains the source of truth.
#[derive(Debug, Serialize, Deserialize)]
struct WalletFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    address: Address,
    secret_key: String,
    created: String,
}

/// A key pair with its derived address.
///
/// The private key lives only here; transactions and blocks never hold it.
pub struct Wallet {
    keypair: KeyPair,
    pub name: Option<String>,
    pub address: Address,
    pub created: String,
}

impl Wallet {
    /// Generates a fresh wallet with a random key pair.
    pub fn generate(name: Option<String>) -> Self {
        let keypair = KeyPair::generate();
        let address = keypair.address();
        debug!(address = %address, "generated new wallet");

        Wallet {
            keypair,
            name,
            address,
            created: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Reconstructs a wallet from raw private key bytes.
    pub fn from_private_key(bytes: &[u8]) -> Result<Self> {
        let keypair = KeyPair::from_secret_bytes(bytes)?;
        let address = keypair.address();

        Ok(Wallet {
            keypair,
            name: None,
            address,
            created: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Reconstructs a wallet from a hex-encoded private key.
    pub fn from_private_key_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| LedgerError::KeyFormat(format!("Invalid secret key hex: {}", e)))?;
        Self::from_private_key(&bytes)
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.keypair.secret_key.secret_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; secp256k1::constants::PUBLIC_KEY_SIZE] {
        self.keypair.public_key_bytes()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Signs an arbitrary message with this wallet's private key.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE]> {
        self.keypair.sign(message)
    }

    /// Writes the wallet to a JSON file, creating parent directories as
    /// needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = WalletFile {
            name: self.name.clone(),
            address: self.address.clone(),
            secret_key: self.secret_key_hex(),
            created: self.created.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "wallet saved");
        Ok(())
    }

    /// Loads a wallet from a JSON file. Fails closed on a missing or
    /// malformed file; the address is re-derived from the stored key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            LedgerError::Persistence(format!("Cannot read wallet file {}: {}", path.display(), e))
        })?;
        let file: WalletFile = serde_json::from_str(&contents).map_err(|e| {
            LedgerError::Persistence(format!("Malformed wallet file {}: {}", path.display(), e))
        })?;

        let mut wallet = Self::from_private_key_hex(&file.secret_key)?;
        wallet.name = file.name;
        wallet.created = file.created;
        info!(path = %path.display(), address = %wallet.address, "wallet loaded");
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use tempfile::TempDir;

    #[test]
    fn test_generate_has_hex_address() {
        let wallet = Wallet::generate(Some("alice".to_string()));
        assert_eq!(wallet.name, Some("alice".to_string()));
        assert_eq!(wallet.address.as_str().len(), 40);
        assert!(!wallet.created.is_empty());
    }

    #[test]
    fn test_distinct_wallets_distinct_addresses() {
        let alice = Wallet::generate(None);
        let bob = Wallet::generate(None);
        assert_ne!(alice.address, bob.address);
        assert_ne!(alice.secret_key_hex(), bob.secret_key_hex());
    }

    #[test]
    fn test_sign_and_verify() {
        let wallet = Wallet::generate(None);
        let message = b"pay bob 10";
        let signature = wallet.sign(message).unwrap();
        assert!(crypto::verify(&wallet.public_key_bytes(), message, &signature));
    }

    #[test]
    fn test_round_trip_through_private_key() {
        let wallet = Wallet::generate(None);
        let rebuilt = Wallet::from_private_key_hex(&wallet.secret_key_hex()).unwrap();
        assert_eq!(wallet.address, rebuilt.address);
    }

    #[test]
    fn test_from_private_key_rejects_garbage() {
        assert!(matches!(
            Wallet::from_private_key_hex("not hex at all"),
            Err(LedgerError::KeyFormat(_))
        ));
        assert!(Wallet::from_private_key(&[0u8; 5]).is_err());
    }

    #[test]
    fn test_save_and_load() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("wallets").join("alice.json");

        let original = Wallet::generate(Some("alice".to_string()));
        original.save(&path)?;
        assert!(path.exists());

        let loaded = Wallet::load(&path)?;
        assert_eq!(original.address, loaded.address);
        assert_eq!(original.name, loaded.name);
        assert_eq!(original.created, loaded.created);
        assert_eq!(original.secret_key_hex(), loaded.secret_key_hex());

        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails_closed() {
        let dir = TempDir::new().unwrap();
        let result = Wallet::load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(LedgerError::Persistence(_))));
    }
}
