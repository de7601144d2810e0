//! Configuration for the sweeper agent
//!
//! The agent runs against exactly one network (Base mainnet). Contract
//! addresses, the gas reserve, and the keystore password policy all live
//! here so the rest of the crate never hardcodes them.

pub mod rpc;

use crate::{Error, Result};
use alloy::primitives::{address, Address};
use std::path::PathBuf;
use std::time::Duration;

pub use rpc::resolve_rpc_url;

/// Network identifier persisted in the sweep config.
pub const NETWORK: &str = "base";

/// Base mainnet chain id.
pub const CHAIN_ID: u64 = 8453;

/// Wallet password environment variable name.
pub const WALLET_PASSWORD_ENV: &str = "SWEEPER_WALLET_PASSWORD";

/// Fallback keystore password when SWEEPER_WALLET_PASSWORD is unset.
///
/// Kept for parity with single-user local installs; `Keystore::create`
/// logs a warning whenever it is used.
pub const DEFAULT_WALLET_PASSWORD: &str = "sweeper-default";

/// Data directory override, mainly for tests.
pub const HOME_ENV: &str = "SWEEPER_HOME";

/// Native currency withheld from every swap so the wallet can still pay
/// for a follow-up transaction (0.001 ETH).
pub const GAS_RESERVE_WEI: u128 = 1_000_000_000_000_000;

/// Minimum-out slippage tolerance for V3 swaps, in basis points (1%).
pub const SLIPPAGE_BPS: u64 = 100;

/// V3 fee tiers probed in fixed preference order: 0.05%, 0.30%, 1.00%.
pub const FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

/// How long a swap waits for its receipt before recording `pending`.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Contract addresses on Base mainnet.
pub mod contracts {
    use alloy::primitives::{address, Address};

    pub const WETH: Address = address!("0x4200000000000000000000000000000000000006");
    pub const QUOTER_V2: Address = address!("0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a");
    pub const SWAP_ROUTER_02: Address = address!("0x2626664c2603336E57B271c5C0b26F421741e481");
    pub const UNIVERSAL_ROUTER: Address = address!("0x6fF5693b99212Da76ad316178A184AB56D299b43");
    pub const V4_QUOTER: Address = address!("0x0d5e0F971ED27FBfF6c2837bf31316121532048D");

    /// Universal Router sentinel meaning "the router itself".
    pub const ADDRESS_THIS: Address = address!("0x0000000000000000000000000000000000000002");
}

/// Hook contract for the default V4 fallback pool (token/WETH, dynamic fee).
pub const DEFAULT_V4_HOOKS: Address = address!("0xb429d62f8f3bFFb98CdB9569533eA23bF0Ba28CC");

/// Dynamic-fee flag used by hook-managed V4 pools.
pub const V4_DYNAMIC_FEE: u32 = 0x800000;

/// Tick spacing of the default V4 fallback pool.
pub const V4_DEFAULT_TICK_SPACING: i32 = 200;

/// Resolve the user-scoped data directory holding the keystore and the
/// sweep config (`$SWEEPER_HOME`, else `~/.sweeper`).
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME")
        .ok_or_else(|| Error::Config("HOME is not set; set SWEEPER_HOME explicitly".into()))?;
    Ok(PathBuf::from(home).join(".sweeper"))
}

/// Runtime configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// JSON-RPC endpoint for Base.
    pub rpc_url: String,
    /// Directory holding wallet.json / sweep.json / sweeps.jsonl.
    pub data_dir: PathBuf,
    /// Receipt polling timeout.
    pub receipt_timeout: Duration,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rpc_url: resolve_rpc_url(),
            data_dir: data_dir()?,
            receipt_timeout: RECEIPT_TIMEOUT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_honors_override() {
        std::env::set_var(HOME_ENV, "/tmp/sweeper-test-home");
        assert_eq!(data_dir().unwrap(), PathBuf::from("/tmp/sweeper-test-home"));
        std::env::remove_var(HOME_ENV);
    }

    #[test]
    fn fee_tiers_are_in_preference_order() {
        assert_eq!(FEE_TIERS, [500, 3_000, 10_000]);
    }
}
