//! RPC endpoint resolution
//!
//! Priority:
//! 1. `BASE_RPC_URL` - explicit endpoint (recommended for production)
//! 2. `ALCHEMY_API_KEY` - builds the Base mainnet Alchemy URL
//! 3. Public RPC fallback - rate limited, for testing only

/// Per-chain URL (highest priority).
pub const BASE_RPC_URL_ENV: &str = "BASE_RPC_URL";

/// Provider API key, used when no explicit URL is set.
pub const ALCHEMY_API_KEY_ENV: &str = "ALCHEMY_API_KEY";

/// Public Base RPC (rate limited).
pub const PUBLIC_RPC: &str = "https://mainnet.base.org";

/// Resolve the Base JSON-RPC endpoint from the environment.
pub fn resolve_rpc_url() -> String {
    if let Ok(url) = std::env::var(BASE_RPC_URL_ENV) {
        tracing::debug!("Using BASE_RPC_URL for Base");
        return url;
    }

    if let Ok(key) = std::env::var(ALCHEMY_API_KEY_ENV) {
        tracing::info!("Building Base RPC URL from ALCHEMY_API_KEY");
        return format!("https://base-mainnet.g.alchemy.com/v2/{}", key);
    }

    tracing::warn!("No RPC configured for Base, using public RPC (rate limited)");
    PUBLIC_RPC.to_string()
}
