//! Sweep target configuration and swap history types

pub mod store;

use crate::router::{PoolQuote, PoolVersion};
use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::{SweepStore, HISTORY_DISPLAY_LIMIT};

/// The configured sweep target, persisted as `sweep.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepConfig {
    pub target_token: Address,
    pub token_symbol: String,
    pub network: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    /// Broadcast but not yet seen in a receipt. May still confirm.
    Pending,
    Confirmed,
    Failed,
}

/// One line of `sweeps.jsonl`. Records are immutable; a status change is a
/// new line with the same attempt id, and readers keep the last line per
/// attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRecord {
    pub attempt_id: String,
    pub timestamp: DateTime<Utc>,
    pub token: Address,
    pub amount_in_wei: U256,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub amount_out_raw: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pool_version: Option<PoolVersion>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fee_tier: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub v4_hooks: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tx_hash: Option<B256>,
    pub status: SwapStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl SwapRecord {
    /// A fresh attempt id: millisecond timestamp plus a random suffix so
    /// concurrent attempts never collide.
    pub fn new_attempt_id(now: DateTime<Utc>) -> String {
        use rand::Rng;
        let suffix: u32 = rand::thread_rng().gen_range(0..0xffff_ffff);
        format!("{}-{:08x}", now.timestamp_millis(), suffix)
    }

    /// Record for a quoted attempt, before any terminal status is known.
    pub fn quoted(attempt_id: String, token: Address, amount_in: U256, quote: &PoolQuote) -> Self {
        Self {
            attempt_id,
            timestamp: Utc::now(),
            token,
            amount_in_wei: amount_in,
            amount_out_raw: Some(quote.amount_out()),
            pool_version: Some(quote.version()),
            fee_tier: quote.fee_tier(),
            v4_hooks: quote.hooks(),
            tx_hash: None,
            status: SwapStatus::Pending,
            error: None,
        }
    }

    /// Record for an attempt that failed before any transaction existed.
    pub fn failed_before_submit(
        attempt_id: String,
        token: Address,
        amount_in: U256,
        error: String,
    ) -> Self {
        Self {
            attempt_id,
            timestamp: Utc::now(),
            token,
            amount_in_wei: amount_in,
            amount_out_raw: None,
            pool_version: None,
            fee_tier: None,
            v4_hooks: None,
            tx_hash: None,
            status: SwapStatus::Failed,
            error: Some(error),
        }
    }

    /// Superseding line carrying a new status for the same attempt.
    pub fn with_status(&self, status: SwapStatus, error: Option<String>) -> Self {
        Self {
            status,
            error,
            timestamp: Utc::now(),
            ..self.clone()
        }
    }
}
