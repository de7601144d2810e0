//! Encrypted keystore for the sweeper wallet
//!
//! One wallet per data directory, stored as `wallet.json`. The private key is
//! sealed with AES-256-GCM under an Argon2id-derived key (see [`cipher`]).
//! Creation never overwrites an existing wallet.

pub mod cipher;

use crate::config::{DEFAULT_WALLET_PASSWORD, WALLET_PASSWORD_ENV};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::hex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const WALLET_FILE: &str = "wallet.json";
const KEYSTORE_VERSION: u32 = 1;

/// On-disk keystore document.
#[derive(Debug, Serialize, Deserialize)]
struct KeystoreFile {
    version: u32,
    address: String,
    crypto: CryptoParams,
}

#[derive(Debug, Serialize, Deserialize)]
struct CryptoParams {
    kdf: String,
    salt: String,
    cipher: String,
    nonce: String,
    ciphertext: String,
}

/// Manages the single wallet keystore under a data directory.
pub struct Keystore {
    path: PathBuf,
}

impl Keystore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(WALLET_FILE),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Generate a fresh wallet and persist it encrypted.
    ///
    /// Fails with [`Error::WalletExists`] if a keystore file is already
    /// present; an existing wallet must be removed explicitly.
    pub fn create(&self) -> Result<SecureWallet> {
        if self.exists() {
            return Err(Error::WalletExists);
        }

        let password = keystore_password();
        let wallet = SecureWallet::random();
        let key = wallet.to_key_bytes();
        let sealed = cipher::seal(&key, password.expose_secret())?;

        let doc = KeystoreFile {
            version: KEYSTORE_VERSION,
            address: wallet.address_string(),
            crypto: CryptoParams {
                kdf: "argon2id".to_string(),
                salt: hex::encode(sealed.salt),
                cipher: "aes-256-gcm".to_string(),
                nonce: hex::encode(sealed.nonce),
                ciphertext: hex::encode(&sealed.ciphertext),
            },
        };

        self.write_atomic(&doc)?;
        info!(address = %wallet.address(), path = %self.path.display(), "Created wallet keystore");
        Ok(wallet)
    }

    /// Load and decrypt the wallet.
    pub fn load(&self) -> Result<SecureWallet> {
        let doc = self.read()?;
        let sealed = doc.sealed_key()?;
        let password = keystore_password();
        let key = cipher::open(&sealed, password.expose_secret())?;
        SecureWallet::from_key_bytes(&key)
    }

    /// Decrypt and return the raw private key as a 0x-hex string.
    ///
    /// Callers are expected to hand the string straight to the user; it is
    /// never logged or persisted by this crate.
    pub fn export_private_key(&self) -> Result<String> {
        let doc = self.read()?;
        let sealed = doc.sealed_key()?;
        let password = keystore_password();
        let key = cipher::open(&sealed, password.expose_secret())?;
        Ok(format!("0x{}", hex::encode(key.as_ref())))
    }

    fn read(&self) -> Result<KeystoreFile> {
        if !self.exists() {
            return Err(Error::WalletMissing);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_atomic(&self, doc: &KeystoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(doc)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeystoreFile {
    fn sealed_key(&self) -> Result<cipher::SealedKey> {
        let salt: [u8; cipher::SALT_LEN] = hex::decode(&self.crypto.salt)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| Error::DecryptionFailed("malformed salt".into()))?;
        let nonce: [u8; cipher::NONCE_LEN] = hex::decode(&self.crypto.nonce)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| Error::DecryptionFailed("malformed nonce".into()))?;
        let ciphertext = hex::decode(&self.crypto.ciphertext)
            .map_err(|_| Error::DecryptionFailed("malformed ciphertext".into()))?;
        Ok(cipher::SealedKey {
            salt,
            nonce,
            ciphertext,
        })
    }
}

fn keystore_password() -> SecretString {
    match std::env::var(WALLET_PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => SecretString::from(p),
        _ => {
            warn!(
                "{} not set, using the default keystore password",
                WALLET_PASSWORD_ENV
            );
            SecretString::from(DEFAULT_WALLET_PASSWORD)
        }
    }
}
