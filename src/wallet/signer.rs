//! In-memory wallet around a local private key signer
//!
//! The raw key lives only inside `PrivateKeySigner`; `Debug` redacts it and
//! construction from raw bytes takes zeroizing buffers so decrypted keystore
//! material is scrubbed as soon as the signer owns a copy.

use crate::{Error, Result};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use zeroize::Zeroizing;

/// A wallet that can sign transactions without exposing its private key.
pub struct SecureWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl SecureWallet {
    /// Generate a wallet with a fresh random key.
    pub fn random() -> Self {
        let signer = PrivateKeySigner::random();
        let address = signer.address();
        Self { signer, address }
    }

    /// Build a wallet from raw decrypted key bytes.
    pub fn from_key_bytes(key: &Zeroizing<[u8; 32]>) -> Result<Self> {
        let signer = PrivateKeySigner::from_slice(key.as_ref())
            .map_err(|e| Error::Wallet(format!("invalid private key: {}", e)))?;
        let address = signer.address();
        Ok(Self { signer, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 checksummed address string.
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Copy out the raw private key for sealing into the keystore.
    pub fn to_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signer.credential().to_bytes().into())
    }

    /// Sign an EIP-1559 transaction, returning the raw encoded bytes and the
    /// transaction hash.
    pub fn sign_eip1559(&self, tx: TxEip1559) -> Result<(Bytes, B256)> {
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| Error::Wallet(format!("signing failed: {}", e)))?;
        let envelope = TxEnvelope::Eip1559(tx.into_signed(signature));
        let hash = *envelope.tx_hash();
        Ok((envelope.encoded_2718().into(), hash))
    }
}

impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known anvil/hardhat dev key, never funded on mainnet.
    fn test_key() -> Zeroizing<[u8; 32]> {
        let bytes: [u8; 32] =
            alloy::hex::decode("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
                .unwrap()
                .try_into()
                .unwrap();
        Zeroizing::new(bytes)
    }

    #[test]
    fn derives_expected_address() {
        let wallet = SecureWallet::from_key_bytes(&test_key()).unwrap();
        assert_eq!(
            wallet.address_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn key_bytes_roundtrip() {
        let key = test_key();
        let wallet = SecureWallet::from_key_bytes(&key).unwrap();
        assert_eq!(*wallet.to_key_bytes(), *key);
    }

    #[test]
    fn debug_redacts_signer() {
        let wallet = SecureWallet::random();
        let rendered = format!("{:?}", wallet);
        assert!(rendered.contains("[REDACTED]"));
        let key_hex = alloy::hex::encode(wallet.to_key_bytes().as_ref());
        assert!(!rendered.contains(&key_hex));
    }

    #[test]
    fn signs_a_minimal_transaction() {
        use alloy::primitives::{TxKind, U256};

        let wallet = SecureWallet::from_key_bytes(&test_key()).unwrap();
        let tx = TxEip1559 {
            chain_id: 8453,
            nonce: 0,
            gas_limit: 21_000,
            max_fee_per_gas: 1_000_000_000,
            max_priority_fee_per_gas: 100_000_000,
            to: TxKind::Call(Address::ZERO),
            value: U256::from(1u64),
            ..Default::default()
        };
        let (raw, hash) = wallet.sign_eip1559(tx).unwrap();
        assert!(!raw.is_empty());
        // Typed tx envelope, EIP-1559 type byte.
        assert_eq!(raw[0], 0x02);
        assert_ne!(hash, B256::ZERO);
    }
}
