//! Error types for the sweeper agent

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("wallet already exists; remove the keystore file explicitly before creating a new one")]
    WalletExists,

    #[error("wallet does not exist; run create-wallet first")]
    WalletMissing,

    #[error("failed to decrypt keystore: {0}; check SWEEPER_WALLET_PASSWORD")]
    DecryptionFailed(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("no liquidity pool found for {token}; tried V3 fee tiers 0.05%/0.3%/1% and the V4 hook pool. The token may have no WETH pair on base")]
    NoLiquidityFound { token: Address },

    #[error("network error: {0}")]
    Network(String),

    #[error("contract call failed: {0}")]
    ContractCallFailed(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Transient errors may be retried at the RPC boundary; everything else
    /// propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
