//! Wallet signing

pub mod signer;

pub use signer::SecureWallet;
