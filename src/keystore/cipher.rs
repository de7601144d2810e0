//! Password-based encryption of the wallet private key
//!
//! Argon2id derives a 256-bit key from the keystore password; AES-256-GCM
//! seals the raw private key with a random nonce. The AEAD tag means a wrong
//! password fails cleanly - no partial or garbage key bytes ever escape.

use crate::{Error, Result};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::Rng;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Encrypted private key blob plus the parameters needed to open it.
#[derive(Debug, Clone)]
pub struct SealedKey {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

fn derive_key(password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut key = Zeroizing::new([0u8; 32]);
    argon2::Argon2::default()
        .hash_password_into(password.as_bytes(), salt, key.as_mut())
        .map_err(|e| Error::Config(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

/// Seal a raw 32-byte private key under a password.
pub fn seal(private_key: &[u8; 32], password: &str) -> Result<SealedKey> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut salt);
    rand::thread_rng().fill(&mut nonce);

    let key = derive_key(password, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|_| Error::Config("AES key must be 32 bytes".into()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), private_key.as_slice())
        .map_err(|e| Error::Config(format!("keystore encryption failed: {}", e)))?;

    Ok(SealedKey {
        salt,
        nonce,
        ciphertext,
    })
}

/// Open a sealed key. Fails with `DecryptionFailed` on a wrong password or
/// corrupted blob; the plaintext is zeroized when the caller drops it.
pub fn open(sealed: &SealedKey, password: &str) -> Result<Zeroizing<[u8; 32]>> {
    let key = derive_key(password, &sealed.salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|_| Error::Config("AES key must be 32 bytes".into()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| Error::DecryptionFailed("wrong password or corrupted keystore".into()))?;

    if plaintext.len() != 32 {
        return Err(Error::DecryptionFailed(format!(
            "unexpected key length: {} bytes",
            plaintext.len()
        )));
    }

    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&plaintext);
    // Scrub the intermediate buffer as well.
    let mut plaintext = plaintext;
    zeroize::Zeroize::zeroize(&mut plaintext);
    Ok(out)
}
