//! High-level agent tying the keystore, chain client, router, and sweep
//! store together. Every command-surface action maps to one method here.

use crate::chain::{format_units, parse_units, ChainClient, TokenBalance};
use crate::config::{AgentConfig, CHAIN_ID, NETWORK};
use crate::keystore::Keystore;
use crate::router::{SendOutcome, SwapExecutor, SwapOutcome};
use crate::sweep::{SwapRecord, SweepConfig, SweepStore, HISTORY_DISPLAY_LIMIT};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Wallet address plus formatted native balance.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub address: String,
    pub balance_eth: String,
    pub balance_wei: U256,
}

/// Target config plus recent history, for `get_sweep_config`.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub target: Option<SweepConfig>,
    pub recent_swaps: Vec<SwapRecord>,
}

/// A token balance response with the token identity attached.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBalanceSummary {
    pub token: Address,
    pub symbol: String,
    pub balance: String,
    pub raw: U256,
    pub decimals: u8,
}

pub struct SweeperAgent {
    client: ChainClient,
    keystore: Keystore,
    store: Arc<SweepStore>,
    executor: SwapExecutor,
}

impl SweeperAgent {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = ChainClient::new(&config.rpc_url, CHAIN_ID)?;
        let keystore = Keystore::open(&config.data_dir);
        let store = Arc::new(SweepStore::open(&config.data_dir));
        let executor = SwapExecutor::new(client.clone(), store.clone(), config.receipt_timeout);
        Ok(Self {
            client,
            keystore,
            store,
            executor,
        })
    }

    /// Create the wallet. Fails if one already exists.
    pub fn create_wallet(&self) -> Result<String> {
        let wallet = self.keystore.create()?;
        Ok(wallet.address_string())
    }

    pub async fn wallet_summary(&self) -> Result<WalletSummary> {
        let wallet = self.keystore.load()?;
        let balance_wei = self.client.native_balance(wallet.address()).await?;
        Ok(WalletSummary {
            address: wallet.address_string(),
            balance_eth: format_units(balance_wei, 18),
            balance_wei,
        })
    }

    pub fn export_private_key(&self) -> Result<String> {
        self.keystore.export_private_key()
    }

    /// Validate and persist a new sweep target. The token's symbol is read
    /// on-chain before anything is written; a token that cannot answer
    /// `symbol()` is rejected.
    pub async fn set_target_token(&self, token_address: &str) -> Result<SweepConfig> {
        let token = parse_address(token_address)?;
        let symbol = self
            .client
            .token_symbol(token)
            .await
            .map_err(|e| match e {
                Error::ContractCallFailed(msg) => Error::ContractCallFailed(format!(
                    "{} does not look like an ERC-20: {}",
                    token_address, msg
                )),
                other => other,
            })?;
        let config = SweepConfig {
            target_token: token,
            token_symbol: symbol,
            network: NETWORK.to_string(),
        };
        self.store.set_target(&config)?;
        info!(token = %config.target_token, symbol = %config.token_symbol, "Sweep target set");
        Ok(config)
    }

    /// Current target plus recent history. Pending attempts are reconciled
    /// against the chain first so the view is as fresh as one receipt query
    /// per pending record can make it.
    pub async fn sweep_config(&self) -> Result<SweepSummary> {
        self.executor.reconcile().await?;
        Ok(SweepSummary {
            target: self.store.target()?,
            recent_swaps: self.store.recent(HISTORY_DISPLAY_LIMIT)?,
        })
    }

    /// Balance of `token_address`, or of the configured target when omitted.
    pub async fn token_balance(&self, token_address: Option<&str>) -> Result<TokenBalanceSummary> {
        let token = match token_address {
            Some(s) => parse_address(s)?,
            None => self.target_token()?,
        };
        let wallet = self.keystore.load()?;
        let TokenBalance {
            raw,
            formatted,
            symbol,
            decimals,
        } = self.client.token_balance(token, wallet.address()).await?;
        Ok(TokenBalanceSummary {
            token,
            symbol,
            balance: formatted,
            raw,
            decimals,
        })
    }

    /// Swap `amount_eth` of native ETH into the target token (or an explicit
    /// token address).
    pub async fn buy_token(
        &self,
        token_address: Option<&str>,
        amount_eth: &str,
    ) -> Result<SwapOutcome> {
        let token = match token_address {
            Some(s) => parse_address(s)?,
            None => self.target_token()?,
        };
        let requested_wei = parse_units(amount_eth, 18)?;
        let wallet = self.keystore.load()?;
        self.executor.sweep(&wallet, token, requested_wei).await
    }

    /// Send native ETH (`token` = "eth") or an ERC-20 from the wallet.
    pub async fn send_token(&self, token: &str, to: &str, amount: &str) -> Result<SendOutcome> {
        let to = parse_address(to)?;
        let wallet = self.keystore.load()?;
        if token.eq_ignore_ascii_case("eth") {
            let amount_wei = parse_units(amount, 18)?;
            self.executor.send_native(&wallet, to, amount_wei).await
        } else {
            let token = parse_address(token)?;
            let decimals = self.client.token_decimals(token).await?;
            let amount_raw = parse_units(amount, decimals)?;
            self.executor
                .send_erc20(&wallet, token, to, amount_raw)
                .await
        }
    }

    fn target_token(&self) -> Result<Address> {
        self.store
            .target()?
            .map(|c| c.target_token)
            .ok_or_else(|| {
                Error::NotConfigured("no sweep target set; run set-target first".into())
            })
    }
}

fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s.trim())
        .map_err(|_| Error::InvalidAddress(format!("{} is not a valid address", s)))
}
