//! Hybrid V3/V4 swap routing

pub mod contracts;
pub mod executor;
pub mod resolver;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

pub use executor::{SendOutcome, SwapExecutor, SwapOutcome};
pub use resolver::{PoolResolver, QuoteProbe, RpcQuoteProbe};

/// Which Uniswap generation a swap routes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolVersion {
    V3,
    V4,
}

/// Identifies a V4 pool. V4 pools are keyed by the full
/// (hooks, fee, tick spacing) tuple, not a fee tier alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V4PoolParams {
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

impl V4PoolParams {
    /// The default hook-managed token/WETH pool (dynamic fee).
    pub fn default_hook_pool() -> Self {
        Self {
            fee: crate::config::V4_DYNAMIC_FEE,
            tick_spacing: crate::config::V4_DEFAULT_TICK_SPACING,
            hooks: crate::config::DEFAULT_V4_HOOKS,
        }
    }
}

/// A resolved pool plus its quoted output for the probe amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolQuote {
    V3 { fee: u32, amount_out: U256 },
    V4 { params: V4PoolParams, amount_out: U256 },
}

impl PoolQuote {
    pub fn version(&self) -> PoolVersion {
        match self {
            PoolQuote::V3 { .. } => PoolVersion::V3,
            PoolQuote::V4 { .. } => PoolVersion::V4,
        }
    }

    pub fn amount_out(&self) -> U256 {
        match self {
            PoolQuote::V3 { amount_out, .. } | PoolQuote::V4 { amount_out, .. } => *amount_out,
        }
    }

    pub fn fee_tier(&self) -> Option<u32> {
        match self {
            PoolQuote::V3 { fee, .. } => Some(*fee),
            PoolQuote::V4 { .. } => None,
        }
    }

    pub fn hooks(&self) -> Option<Address> {
        match self {
            PoolQuote::V3 { .. } => None,
            PoolQuote::V4 { params, .. } => Some(params.hooks),
        }
    }
}
