//! JSON-RPC client for Base
//!
//! Thin wrapper over an alloy HTTP provider. Read paths retry transient
//! transport failures with bounded backoff; contract reverts surface
//! immediately and are never retried.

use crate::chain::erc20::{format_units, IERC20};
use crate::{Error, Result};
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(250);
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Minimum priority fee, 1.5 gwei.
const MIN_PRIORITY_FEE: u128 = 1_500_000_000;

/// Outcome of waiting for a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Confirmed,
    Reverted,
    /// No receipt within the timeout. The transaction may still land.
    Pending,
}

/// An ERC-20 balance with on-chain metadata.
#[derive(Debug, Clone)]
pub struct TokenBalance {
    pub raw: U256,
    pub formatted: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
pub struct ChainClient {
    url: url::Url,
    chain_id: u64,
}

impl ChainClient {
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC URL {}: {}", rpc_url, e)))?;
        Ok(Self { url, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub(crate) fn provider(&self) -> impl Provider {
        ProviderBuilder::new().connect_http(self.url.clone())
    }

    /// Retry `f` on transient errors with doubling backoff. Reverts and other
    /// non-transient failures return on the first occurrence.
    pub(crate) async fn with_backoff<T, F, Fut>(&self, label: &str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = BACKOFF_BASE;
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(%label, attempt, error = %e, "Transient RPC error, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Network(format!("{} exhausted retries", label))))
    }

    pub async fn native_balance(&self, address: Address) -> Result<U256> {
        self.with_backoff("native_balance", || async {
            let provider = self.provider();
            provider
                .get_balance(address)
                .await
                .map_err(|e| Error::Network(format!("eth_getBalance: {}", e)))
        })
        .await
    }

    pub async fn token_symbol(&self, token: Address) -> Result<String> {
        self.with_backoff("token_symbol", || async {
            let provider = self.provider();
            let contract = IERC20::new(token, &provider);
            contract
                .symbol()
                .call()
                .await
                .map_err(|e| classify_call_err("symbol()", e))
        })
        .await
    }

    pub async fn token_decimals(&self, token: Address) -> Result<u8> {
        self.with_backoff("token_decimals", || async {
            let provider = self.provider();
            let contract = IERC20::new(token, &provider);
            contract
                .decimals()
                .call()
                .await
                .map_err(|e| classify_call_err("decimals()", e))
        })
        .await
    }

    /// Token balance with decimals and symbol read on-chain. A contract that
    /// answers neither `decimals()` nor `balanceOf()` is not a usable ERC-20.
    pub async fn token_balance(&self, token: Address, owner: Address) -> Result<TokenBalance> {
        let decimals = self.token_decimals(token).await?;
        let raw = self
            .with_backoff("token_balance", || async {
                let provider = self.provider();
                let contract = IERC20::new(token, &provider);
                contract
                    .balanceOf(owner)
                    .call()
                    .await
                    .map_err(|e| classify_call_err("balanceOf()", e))
            })
            .await?;
        let symbol = match self.token_symbol(token).await {
            Ok(s) => s,
            Err(e) => {
                debug!(%token, error = %e, "Token has no symbol(), using placeholder");
                "UNKNOWN".to_string()
            }
        };
        Ok(TokenBalance {
            raw,
            formatted: format_units(raw, decimals),
            symbol,
            decimals,
        })
    }

    pub async fn nonce(&self, address: Address) -> Result<u64> {
        self.with_backoff("nonce", || async {
            let provider = self.provider();
            provider
                .get_transaction_count(address)
                .pending()
                .await
                .map_err(|e| Error::Network(format!("eth_getTransactionCount: {}", e)))
        })
        .await
    }

    /// EIP-1559 fee pair: `max_fee = base_fee * 2 + priority`, with the
    /// priority fee floored at 1.5 gwei.
    pub async fn gas_fees(&self) -> Result<(u128, u128)> {
        self.with_backoff("gas_fees", || async {
            let provider = self.provider();
            let gas_price = provider
                .get_gas_price()
                .await
                .map_err(|e| Error::Network(format!("eth_gasPrice: {}", e)))?;
            let block = provider
                .get_block_by_number(BlockNumberOrTag::Latest)
                .await
                .map_err(|e| Error::Network(format!("eth_getBlockByNumber: {}", e)))?
                .ok_or_else(|| Error::Network("latest block unavailable".into()))?;
            let base_fee = block
                .header
                .base_fee_per_gas
                .map(u128::from)
                .unwrap_or(gas_price);

            let priority = MIN_PRIORITY_FEE.max(gas_price / 10);
            let max_fee = base_fee * 2 + priority;
            Ok((max_fee, priority))
        })
        .await
    }

    /// Gas estimate with a 20% buffer.
    pub async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.with_backoff("estimate_gas", || {
            let tx = tx.clone();
            async move {
                let provider = self.provider();
                let estimate = provider
                    .estimate_gas(tx)
                    .await
                    .map_err(|e| classify_rpc_err("eth_estimateGas", e))?;
                Ok(estimate + estimate / 5)
            }
        })
        .await
    }

    /// Broadcast a signed transaction. Transient failures are retried; the
    /// retry is idempotent because a node that already has the transaction
    /// in its pool counts as a successful broadcast.
    pub async fn submit_raw(&self, raw: &Bytes, tx_hash: B256) -> Result<B256> {
        self.with_backoff("submit_raw", || async {
            let provider = self.provider();
            match provider.send_raw_transaction(raw).await {
                Ok(pending) => Ok(*pending.tx_hash()),
                Err(e) => {
                    let msg = e.to_string();
                    if msg.contains("already known") || msg.contains("already imported") {
                        debug!(%tx_hash, "Transaction already in mempool");
                        Ok(tx_hash)
                    } else {
                        Err(classify_rpc_err("eth_sendRawTransaction", e))
                    }
                }
            }
        })
        .await
    }

    /// Poll for a receipt until `timeout`. Returns `Pending` on timeout; the
    /// transaction may still confirm later, so callers must not treat it as
    /// failed.
    pub async fn poll_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<ReceiptStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let provider = self.provider();
            match provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(if receipt.status() {
                        ReceiptStatus::Confirmed
                    } else {
                        ReceiptStatus::Reverted
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(%tx_hash, error = %e, "Receipt poll failed, will retry");
                }
            }
            if tokio::time::Instant::now() + RECEIPT_POLL_INTERVAL > deadline {
                return Ok(ReceiptStatus::Pending);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// The chain operations swap execution depends on. [`ChainClient`] is the
/// production implementation; tests substitute their own.
#[async_trait::async_trait]
pub trait ChainOps: Send + Sync {
    fn chain_id(&self) -> u64;
    async fn native_balance(&self, address: Address) -> Result<U256>;
    async fn token_balance(&self, token: Address, owner: Address) -> Result<TokenBalance>;
    async fn nonce(&self, address: Address) -> Result<u64>;
    async fn gas_fees(&self) -> Result<(u128, u128)>;
    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;
    async fn submit_raw(&self, raw: &Bytes, tx_hash: B256) -> Result<B256>;
    async fn poll_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<ReceiptStatus>;
}

#[async_trait::async_trait]
impl ChainOps for ChainClient {
    fn chain_id(&self) -> u64 {
        ChainClient::chain_id(self)
    }

    async fn native_balance(&self, address: Address) -> Result<U256> {
        ChainClient::native_balance(self, address).await
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<TokenBalance> {
        ChainClient::token_balance(self, token, owner).await
    }

    async fn nonce(&self, address: Address) -> Result<u64> {
        ChainClient::nonce(self, address).await
    }

    async fn gas_fees(&self) -> Result<(u128, u128)> {
        ChainClient::gas_fees(self).await
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        ChainClient::estimate_gas(self, tx).await
    }

    async fn submit_raw(&self, raw: &Bytes, tx_hash: B256) -> Result<B256> {
        ChainClient::submit_raw(self, raw, tx_hash).await
    }

    async fn poll_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<ReceiptStatus> {
        ChainClient::poll_receipt(self, tx_hash, timeout).await
    }
}

/// Classify a contract-binding call error: reverts are terminal, everything
/// else is a transport problem worth retrying.
fn classify_call_err(label: &str, e: alloy::contract::Error) -> Error {
    let msg = e.to_string();
    if msg.contains("revert") || msg.contains("execution reverted") {
        Error::ContractCallFailed(format!("{} reverted: {}", label, msg))
    } else {
        Error::Network(format!("{}: {}", label, msg))
    }
}

fn classify_rpc_err(label: &str, e: impl std::fmt::Display) -> Error {
    let msg = e.to_string();
    if msg.contains("revert") || msg.contains("execution reverted") {
        Error::ContractCallFailed(format!("{}: {}", label, msg))
    } else {
        Error::Network(format!("{}: {}", label, msg))
    }
}
