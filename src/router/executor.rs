//! Swap execution
//!
//! Drives one swap attempt through quote, sign, broadcast, and receipt. All
//! signing and submission runs under a single async mutex so concurrent
//! callers never race the wallet nonce; reads (balances, quotes) never take
//! that lock.
//!
//! Record discipline: the attempt is written to the history as `pending`
//! before any signing, superseded with the tx hash once the broadcast
//! outcome is known. A crash mid-broadcast therefore leaves a pending line
//! for reconciliation instead of silently dropping an on-chain transaction.
//! An ambiguous broadcast (transient network failure after the hash was
//! computed locally) is also left `pending`, never marked failed.

use crate::chain::erc20::IERC20;
use crate::chain::{ChainClient, ChainOps, ReceiptStatus};
use crate::config::contracts::{SWAP_ROUTER_02, UNIVERSAL_ROUTER};
use crate::config::{GAS_RESERVE_WEI, SLIPPAGE_BPS};
use crate::router::contracts::{v3_swap_calldata, v4_swap_calldata};
use crate::router::resolver::{PoolResolver, QuoteProbe, RpcQuoteProbe};
use crate::router::{PoolQuote, PoolVersion};
use crate::sweep::{SwapRecord, SwapStatus, SweepStore};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::consensus::TxEip1559;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::sol_types::SolCall;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Result of a completed (or still pending) swap attempt.
#[derive(Debug, Clone, Serialize)]
pub struct SwapOutcome {
    pub attempt_id: String,
    pub token: Address,
    pub amount_in_wei: U256,
    pub quoted_out: U256,
    pub pool_version: PoolVersion,
    pub fee_tier: Option<u32>,
    pub tx_hash: B256,
    pub status: SwapStatus,
}

/// Result of a native or token transfer.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub tx_hash: B256,
    pub status: SwapStatus,
}

pub struct SwapExecutor {
    chain: Arc<dyn ChainOps>,
    probe: Arc<dyn QuoteProbe>,
    store: Arc<SweepStore>,
    signing_lock: Mutex<()>,
    receipt_timeout: Duration,
}

impl SwapExecutor {
    pub fn new(client: ChainClient, store: Arc<SweepStore>, receipt_timeout: Duration) -> Self {
        let probe = Arc::new(RpcQuoteProbe::new(client.clone()));
        Self::from_parts(Arc::new(client), probe, store, receipt_timeout)
    }

    /// Assemble an executor from its seams.
    pub fn from_parts(
        chain: Arc<dyn ChainOps>,
        probe: Arc<dyn QuoteProbe>,
        store: Arc<SweepStore>,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            probe,
            store,
            signing_lock: Mutex::new(()),
            receipt_timeout,
        }
    }

    /// Swap `requested_wei` of native ETH (minus the gas reserve) into
    /// `token`. Exactly one history record exists per attempt that produced
    /// a quote; validation failures leave no trace.
    pub async fn sweep(
        &self,
        wallet: &SecureWallet,
        token: Address,
        requested_wei: U256,
    ) -> Result<SwapOutcome> {
        let reserve = U256::from(GAS_RESERVE_WEI);
        if requested_wei <= reserve {
            return Err(Error::InsufficientBalance(format!(
                "requested {} wei does not cover the {} wei gas reserve",
                requested_wei, GAS_RESERVE_WEI
            )));
        }
        let amount_in = requested_wei - reserve;

        let balance = self.chain.native_balance(wallet.address()).await?;
        if balance < requested_wei {
            return Err(Error::InsufficientBalance(format!(
                "wallet holds {} wei, requested {}",
                balance, requested_wei
            )));
        }

        let attempt_id = SwapRecord::new_attempt_id(Utc::now());

        // Quoting
        let resolver = PoolResolver::new(self.probe.as_ref());
        let quote = match resolver.resolve(token, amount_in).await {
            Ok(q) => q,
            Err(e @ Error::NoLiquidityFound { .. }) => {
                self.store.append(&SwapRecord::failed_before_submit(
                    attempt_id,
                    token,
                    amount_in,
                    e.to_string(),
                ))?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let record = SwapRecord::quoted(attempt_id.clone(), token, amount_in, &quote);

        let (router, calldata) =
            match self.build_calldata(token, wallet.address(), amount_in, &quote) {
                Ok(built) => built,
                Err(e) => {
                    self.store
                        .append(&record.with_status(SwapStatus::Failed, Some(e.to_string())))?;
                    return Err(e);
                }
            };

        // The attempt is on disk before any signing happens.
        self.store.append(&record)?;

        // Signing and Submitted, serialized on the wallet
        let tx_hash = {
            let _guard = self.signing_lock.lock().await;
            let (raw, hash) = match self.prepare_signed(wallet, router, amount_in, calldata).await
            {
                Ok(signed) => signed,
                Err(e) => {
                    self.store
                        .append(&record.with_status(SwapStatus::Failed, Some(e.to_string())))?;
                    return Err(e);
                }
            };
            match self.chain.submit_raw(&raw, hash).await {
                Ok(h) => h,
                Err(e) if e.is_transient() => {
                    // The node may have accepted the transaction even though
                    // the response was lost. Not a terminal outcome.
                    let mut ambiguous = record.with_status(
                        SwapStatus::Pending,
                        Some(format!("broadcast outcome unknown: {}", e)),
                    );
                    ambiguous.tx_hash = Some(hash);
                    self.store.append(&ambiguous)?;
                    warn!(tx_hash = %hash, "Broadcast outcome unknown, leaving attempt pending");
                    return Err(e);
                }
                Err(e) => {
                    self.store
                        .append(&record.with_status(SwapStatus::Failed, Some(e.to_string())))?;
                    return Err(e);
                }
            }
        };

        let mut record = record;
        record.tx_hash = Some(tx_hash);
        self.store.append(&record)?;
        info!(%tx_hash, attempt_id = %record.attempt_id, "Swap submitted");

        let status = self.finalize(&record, tx_hash).await?;
        Ok(SwapOutcome {
            attempt_id,
            token,
            amount_in_wei: amount_in,
            quoted_out: quote.amount_out(),
            pool_version: quote.version(),
            fee_tier: quote.fee_tier(),
            tx_hash,
            status,
        })
    }

    /// Send native ETH, leaving the gas reserve untouched.
    pub async fn send_native(
        &self,
        wallet: &SecureWallet,
        to: Address,
        amount_wei: U256,
    ) -> Result<SendOutcome> {
        let balance = self.chain.native_balance(wallet.address()).await?;
        let needed = amount_wei
            .checked_add(U256::from(GAS_RESERVE_WEI))
            .ok_or_else(|| Error::InvalidAmount("amount overflows".into()))?;
        if balance < needed {
            return Err(Error::InsufficientBalance(format!(
                "wallet holds {} wei, need {} including the gas reserve",
                balance, needed
            )));
        }
        self.transfer(wallet, to, amount_wei, Bytes::new()).await
    }

    /// Send an ERC-20 token from the wallet.
    pub async fn send_erc20(
        &self,
        wallet: &SecureWallet,
        token: Address,
        to: Address,
        amount_raw: U256,
    ) -> Result<SendOutcome> {
        let held = self.chain.token_balance(token, wallet.address()).await?;
        if held.raw < amount_raw {
            return Err(Error::InsufficientBalance(format!(
                "wallet holds {} raw units, requested {}",
                held.raw, amount_raw
            )));
        }
        let calldata: Bytes = IERC20::transferCall {
            to,
            amount: amount_raw,
        }
        .abi_encode()
        .into();
        self.transfer(wallet, token, U256::ZERO, calldata).await
    }

    /// Re-check receipts for attempts still recorded as `pending` and append
    /// the terminal status for any that have since landed.
    pub async fn reconcile(&self) -> Result<Vec<SwapRecord>> {
        let mut updated = Vec::new();
        for record in self.store.pending()? {
            let Some(tx_hash) = record.tx_hash else {
                continue;
            };
            match self.chain.poll_receipt(tx_hash, Duration::ZERO).await? {
                ReceiptStatus::Confirmed => {
                    let newer = record.with_status(SwapStatus::Confirmed, None);
                    self.store.append(&newer)?;
                    info!(%tx_hash, "Reconciled pending swap as confirmed");
                    updated.push(newer);
                }
                ReceiptStatus::Reverted => {
                    let newer =
                        record.with_status(SwapStatus::Failed, Some("reverted on-chain".into()));
                    self.store.append(&newer)?;
                    warn!(%tx_hash, "Reconciled pending swap as reverted");
                    updated.push(newer);
                }
                ReceiptStatus::Pending => {}
            }
        }
        Ok(updated)
    }

    fn build_calldata(
        &self,
        token: Address,
        recipient: Address,
        amount_in: U256,
        quote: &PoolQuote,
    ) -> Result<(Address, Bytes)> {
        match quote {
            PoolQuote::V3 { fee, amount_out } => {
                let min_out = v3_min_out(*amount_out);
                let data = v3_swap_calldata(token, recipient, amount_in, min_out, *fee)?;
                Ok((SWAP_ROUTER_02, data))
            }
            PoolQuote::V4 { params, .. } => {
                let amount = u128::try_from(amount_in)
                    .map_err(|_| Error::InvalidAmount("amount exceeds uint128".into()))?;
                let deadline = U256::from(Utc::now().timestamp() as u64 + 600);
                let data = v4_swap_calldata(token, amount, deadline, params)?;
                Ok((UNIVERSAL_ROUTER, data))
            }
        }
    }

    async fn prepare_signed(
        &self,
        wallet: &SecureWallet,
        to: Address,
        value: U256,
        calldata: Bytes,
    ) -> Result<(Bytes, B256)> {
        let nonce = self.chain.nonce(wallet.address()).await?;
        let (max_fee, priority) = self.chain.gas_fees().await?;
        let request = TransactionRequest {
            from: Some(wallet.address()),
            to: Some(TxKind::Call(to)),
            value: Some(value),
            input: TransactionInput::new(calldata.clone()),
            ..Default::default()
        };
        let gas_limit = self.chain.estimate_gas(request).await?;

        let tx = TxEip1559 {
            chain_id: self.chain.chain_id(),
            nonce,
            gas_limit,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority,
            to: TxKind::Call(to),
            value,
            input: calldata,
            ..Default::default()
        };
        wallet.sign_eip1559(tx)
    }

    async fn finalize(&self, record: &SwapRecord, tx_hash: B256) -> Result<SwapStatus> {
        match self.chain.poll_receipt(tx_hash, self.receipt_timeout).await? {
            ReceiptStatus::Confirmed => {
                self.store
                    .append(&record.with_status(SwapStatus::Confirmed, None))?;
                info!(%tx_hash, "Swap confirmed");
                Ok(SwapStatus::Confirmed)
            }
            ReceiptStatus::Reverted => {
                self.store.append(
                    &record.with_status(SwapStatus::Failed, Some("reverted on-chain".into())),
                )?;
                warn!(%tx_hash, "Swap reverted on-chain");
                Ok(SwapStatus::Failed)
            }
            ReceiptStatus::Pending => {
                // Not terminal. The record stays pending for reconcile().
                warn!(%tx_hash, "No receipt before timeout, leaving attempt pending");
                Ok(SwapStatus::Pending)
            }
        }
    }

    async fn transfer(
        &self,
        wallet: &SecureWallet,
        to: Address,
        value: U256,
        calldata: Bytes,
    ) -> Result<SendOutcome> {
        let tx_hash = {
            let _guard = self.signing_lock.lock().await;
            let (raw, hash) = self.prepare_signed(wallet, to, value, calldata).await?;
            self.chain.submit_raw(&raw, hash).await?
        };
        info!(%tx_hash, "Transfer submitted");
        let status = match self.chain.poll_receipt(tx_hash, self.receipt_timeout).await? {
            ReceiptStatus::Confirmed => SwapStatus::Confirmed,
            ReceiptStatus::Reverted => SwapStatus::Failed,
            ReceiptStatus::Pending => SwapStatus::Pending,
        };
        Ok(SendOutcome { tx_hash, status })
    }
}

/// Minimum acceptable V3 output: the quote less the slippage tolerance.
fn v3_min_out(quoted: U256) -> U256 {
    quoted * U256::from(10_000 - SLIPPAGE_BPS) / U256::from(10_000u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TokenBalance;
    use crate::router::V4PoolParams;
    use crate::sweep::store::HISTORY_FILE;
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[derive(Clone, Copy)]
    enum SubmitBehavior {
        Accept,
        NetworkError,
        Reject,
    }

    struct MockChain {
        balance: U256,
        submit: SubmitBehavior,
        receipt: ReceiptStatus,
    }

    impl MockChain {
        fn funded(submit: SubmitBehavior, receipt: ReceiptStatus) -> Self {
            Self {
                balance: U256::from(10u64).pow(U256::from(20u64)),
                submit,
                receipt,
            }
        }
    }

    #[async_trait]
    impl ChainOps for MockChain {
        fn chain_id(&self) -> u64 {
            8453
        }

        async fn native_balance(&self, _address: Address) -> Result<U256> {
            Ok(self.balance)
        }

        async fn token_balance(&self, _token: Address, _owner: Address) -> Result<TokenBalance> {
            Ok(TokenBalance {
                raw: U256::MAX,
                formatted: "0".to_string(),
                symbol: "MOCK".to_string(),
                decimals: 18,
            })
        }

        async fn nonce(&self, _address: Address) -> Result<u64> {
            Ok(7)
        }

        async fn gas_fees(&self) -> Result<(u128, u128)> {
            Ok((2_000_000_000, 1_500_000_000))
        }

        async fn estimate_gas(&self, _tx: TransactionRequest) -> Result<u64> {
            Ok(200_000)
        }

        async fn submit_raw(&self, _raw: &Bytes, tx_hash: B256) -> Result<B256> {
            match self.submit {
                SubmitBehavior::Accept => Ok(tx_hash),
                SubmitBehavior::NetworkError => Err(Error::Network("connection reset".into())),
                SubmitBehavior::Reject => {
                    Err(Error::ContractCallFailed("nonce too low".into()))
                }
            }
        }

        async fn poll_receipt(&self, _tx_hash: B256, _timeout: Duration) -> Result<ReceiptStatus> {
            Ok(self.receipt)
        }
    }

    struct FixedProbe {
        v3_out: Option<u64>,
    }

    #[async_trait]
    impl QuoteProbe for FixedProbe {
        async fn v3_quote(
            &self,
            _token_out: Address,
            _amount_in: U256,
            fee: u32,
        ) -> Result<Option<U256>> {
            if fee == 3_000 {
                Ok(self.v3_out.map(U256::from))
            } else {
                Ok(None)
            }
        }

        async fn v4_quote(
            &self,
            _token_out: Address,
            _amount_in: U256,
            _params: &V4PoolParams,
        ) -> Result<Option<U256>> {
            Ok(None)
        }
    }

    fn executor_with(
        dir: &TempDir,
        chain: MockChain,
        probe: FixedProbe,
    ) -> (SwapExecutor, Arc<SweepStore>) {
        let store = Arc::new(SweepStore::open(dir.path()));
        let exec = SwapExecutor::from_parts(
            Arc::new(chain),
            Arc::new(probe),
            store.clone(),
            Duration::from_secs(1),
        );
        (exec, store)
    }

    fn token() -> Address {
        Address::repeat_byte(0x11)
    }

    fn requested() -> U256 {
        U256::from(GAS_RESERVE_WEI) * U256::from(3u64)
    }

    #[test]
    fn min_out_applies_one_percent_slippage() {
        assert_eq!(v3_min_out(U256::from(10_000u64)), U256::from(9_900u64));
        assert_eq!(v3_min_out(U256::ZERO), U256::ZERO);
    }

    #[tokio::test]
    async fn amount_at_or_below_reserve_is_rejected_without_a_record() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Confirmed);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(1) });
        let wallet = SecureWallet::random();

        let err = exec
            .sweep(&wallet, token(), U256::from(GAS_RESERVE_WEI))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance(_)));
        assert!(store.history().unwrap().is_empty());

        let err = exec.sweep(&wallet, token(), U256::ZERO).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance(_)));
        assert!(store.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_liquidity_appends_exactly_one_failed_record() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Confirmed);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: None });
        let wallet = SecureWallet::random();

        let err = exec.sweep(&wallet, token(), requested()).await.unwrap_err();
        assert!(matches!(err, Error::NoLiquidityFound { .. }));

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SwapStatus::Failed);
        assert!(history[0].tx_hash.is_none());
        assert_eq!(
            history[0].amount_in_wei,
            requested() - U256::from(GAS_RESERVE_WEI)
        );
    }

    #[tokio::test]
    async fn confirmed_swap_leaves_one_confirmed_record() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Confirmed);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let wallet = SecureWallet::random();

        let outcome = exec.sweep(&wallet, token(), requested()).await.unwrap();
        assert_eq!(outcome.status, SwapStatus::Confirmed);
        assert_eq!(outcome.fee_tier, Some(3_000));

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SwapStatus::Confirmed);
        assert_eq!(history[0].tx_hash, Some(outcome.tx_hash));
    }

    #[tokio::test]
    async fn record_is_durable_before_broadcast() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Confirmed);
        let (exec, _store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let wallet = SecureWallet::random();

        exec.sweep(&wallet, token(), requested()).await.unwrap();

        // Three lines: pending before signing, pending with the hash after
        // broadcast, then the terminal status.
        let raw = std::fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"], "pending");
        assert!(lines[0].get("tx_hash").is_none());
        assert_eq!(lines[1]["status"], "pending");
        assert!(lines[1].get("tx_hash").is_some());
        assert_eq!(lines[2]["status"], "confirmed");
    }

    #[tokio::test]
    async fn receipt_timeout_leaves_attempt_pending() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Pending);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let wallet = SecureWallet::random();

        let outcome = exec.sweep(&wallet, token(), requested()).await.unwrap();
        assert_eq!(outcome.status, SwapStatus::Pending);

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tx_hash, Some(outcome.tx_hash));
    }

    #[tokio::test]
    async fn ambiguous_broadcast_is_recorded_pending_with_the_hash() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::NetworkError, ReceiptStatus::Pending);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let wallet = SecureWallet::random();

        let err = exec.sweep(&wallet, token(), requested()).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));

        // The node may have accepted the transaction, so the attempt must
        // stay pending for reconciliation, never failed.
        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SwapStatus::Pending);
        assert!(history[0].tx_hash.is_some());
    }

    #[tokio::test]
    async fn definitive_broadcast_rejection_is_recorded_failed() {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::funded(SubmitBehavior::Reject, ReceiptStatus::Pending);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let wallet = SecureWallet::random();

        let err = exec.sweep(&wallet, token(), requested()).await.unwrap_err();
        assert!(matches!(err, Error::ContractCallFailed(_)));

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SwapStatus::Failed);
    }

    #[tokio::test]
    async fn reconcile_resolves_pending_attempts() {
        let dir = TempDir::new().unwrap();

        // First run times out waiting for the receipt.
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Pending);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let wallet = SecureWallet::random();
        exec.sweep(&wallet, token(), requested()).await.unwrap();
        assert_eq!(store.pending().unwrap().len(), 1);

        // Later the receipt is available.
        let chain = MockChain::funded(SubmitBehavior::Accept, ReceiptStatus::Confirmed);
        let (exec, store) = executor_with(&dir, chain, FixedProbe { v3_out: Some(500) });
        let updated = exec.reconcile().await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].status, SwapStatus::Confirmed);
        assert!(store.pending().unwrap().is_empty());
    }
}
