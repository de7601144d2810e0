//! Pool discovery for WETH -> token swaps
//!
//! Probes V3 fee tiers in a fixed preference order and takes the first pool
//! that quotes a nonzero output. First match wins; this is deliberately not a
//! best-price search, matching the router the swaps execute through. Only
//! when no V3 tier answers does resolution fall back to the V4 hook pool.

use crate::chain::ChainClient;
use crate::config::contracts::{QUOTER_V2, V4_QUOTER, WETH};
use crate::config::FEE_TIERS;
use crate::router::contracts::{fee_u24, v4_pool_key, IQuoterV2, IV4Quoter};
use crate::router::{PoolQuote, V4PoolParams};
use crate::{Error, Result};
use alloy::primitives::aliases::U160;
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use tracing::{debug, info};

/// On-chain quote source. `Ok(None)` means "no pool at these parameters"
/// (the quoter reverted); transport failures are errors.
#[async_trait]
pub trait QuoteProbe: Send + Sync {
    async fn v3_quote(&self, token_out: Address, amount_in: U256, fee: u32)
        -> Result<Option<U256>>;

    async fn v4_quote(
        &self,
        token_out: Address,
        amount_in: U256,
        params: &V4PoolParams,
    ) -> Result<Option<U256>>;
}

/// Quoter-contract backed probe.
pub struct RpcQuoteProbe {
    client: ChainClient,
}

impl RpcQuoteProbe {
    pub fn new(client: ChainClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuoteProbe for RpcQuoteProbe {
    async fn v3_quote(
        &self,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> Result<Option<U256>> {
        let fee_tier = fee_u24(fee)?;
        self.client
            .with_backoff("v3_quote", || async {
                let provider = self.client.provider();
                let quoter = IQuoterV2::new(QUOTER_V2, &provider);
                let params = IQuoterV2::QuoteExactInputSingleParams {
                    tokenIn: WETH,
                    tokenOut: token_out,
                    amountIn: amount_in,
                    fee: fee_tier,
                    sqrtPriceLimitX96: U160::ZERO,
                };
                match quoter.quoteExactInputSingle(params).call().await {
                    Ok(ret) => Ok(Some(ret.amountOut)),
                    Err(e) => quote_miss_or_error("quoteExactInputSingle", e),
                }
            })
            .await
    }

    async fn v4_quote(
        &self,
        token_out: Address,
        amount_in: U256,
        params: &V4PoolParams,
    ) -> Result<Option<U256>> {
        let exact_amount = u128::try_from(amount_in)
            .map_err(|_| Error::InvalidAmount("amount exceeds uint128".into()))?;
        let (pool_key, zero_for_one) = v4_pool_key(token_out, params)?;
        self.client
            .with_backoff("v4_quote", || {
                let pool_key = pool_key.clone();
                async move {
                    let provider = self.client.provider();
                    let quoter = IV4Quoter::new(V4_QUOTER, &provider);
                    let params = IV4Quoter::QuoteExactSingleParams {
                        poolKey: pool_key,
                        zeroForOne: zero_for_one,
                        exactAmount: exact_amount,
                        hookData: Bytes::new(),
                    };
                    match quoter.quoteExactInputSingle(params).call().await {
                        Ok(ret) => Ok(Some(ret.amountOut)),
                        Err(e) => quote_miss_or_error("V4 quoteExactInputSingle", e),
                    }
                }
            })
            .await
    }
}

/// A reverting quoter means the pool does not exist or has no liquidity at
/// those parameters; anything else is a real transport failure.
fn quote_miss_or_error(label: &str, e: alloy::contract::Error) -> Result<Option<U256>> {
    let msg = e.to_string();
    if msg.contains("revert") || msg.contains("execution reverted") {
        Ok(None)
    } else {
        Err(Error::Network(format!("{}: {}", label, msg)))
    }
}

pub struct PoolResolver<'a> {
    probe: &'a dyn QuoteProbe,
}

impl<'a> PoolResolver<'a> {
    pub fn new(probe: &'a dyn QuoteProbe) -> Self {
        Self { probe }
    }

    /// Find a pool for a WETH -> token swap of `amount_in`.
    pub async fn resolve(&self, token: Address, amount_in: U256) -> Result<PoolQuote> {
        if amount_in.is_zero() {
            return Err(Error::InvalidAmount("swap amount must be positive".into()));
        }

        for fee in FEE_TIERS {
            match self.probe.v3_quote(token, amount_in, fee).await? {
                Some(amount_out) if !amount_out.is_zero() => {
                    info!(%token, fee, %amount_out, "Resolved V3 pool");
                    return Ok(PoolQuote::V3 { fee, amount_out });
                }
                _ => {
                    debug!(%token, fee, "No V3 pool at this fee tier");
                }
            }
        }

        let params = V4PoolParams::default_hook_pool();
        match self.probe.v4_quote(token, amount_in, &params).await? {
            Some(amount_out) if !amount_out.is_zero() => {
                info!(%token, hooks = %params.hooks, %amount_out, "Resolved V4 hook pool");
                Ok(PoolQuote::V4 { params, amount_out })
            }
            _ => Err(Error::NoLiquidityFound { token }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::PoolVersion;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockProbe {
        v3: HashMap<u32, U256>,
        v4: Option<U256>,
        calls: Mutex<Vec<String>>,
    }

    impl MockProbe {
        fn new(v3: &[(u32, u64)], v4: Option<u64>) -> Self {
            Self {
                v3: v3.iter().map(|(f, o)| (*f, U256::from(*o))).collect(),
                v4: v4.map(U256::from),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteProbe for MockProbe {
        async fn v3_quote(
            &self,
            _token_out: Address,
            _amount_in: U256,
            fee: u32,
        ) -> Result<Option<U256>> {
            self.calls.lock().unwrap().push(format!("v3:{}", fee));
            Ok(self.v3.get(&fee).copied())
        }

        async fn v4_quote(
            &self,
            _token_out: Address,
            _amount_in: U256,
            _params: &V4PoolParams,
        ) -> Result<Option<U256>> {
            self.calls.lock().unwrap().push("v4".to_string());
            Ok(self.v4)
        }
    }

    fn token() -> Address {
        Address::repeat_byte(0x11)
    }

    #[tokio::test]
    async fn first_matching_tier_wins_and_stops_probing() {
        let probe = MockProbe::new(&[(3_000, 777), (10_000, 999_999)], None);
        let quote = PoolResolver::new(&probe)
            .resolve(token(), U256::from(100u64))
            .await
            .unwrap();

        assert_eq!(
            quote,
            PoolQuote::V3 {
                fee: 3_000,
                amount_out: U256::from(777u64)
            }
        );
        // 10000 is never probed even though it quotes a better price.
        assert_eq!(probe.calls(), vec!["v3:500", "v3:3000"]);
    }

    #[tokio::test]
    async fn lowest_tier_checked_first() {
        let probe = MockProbe::new(&[(500, 5)], None);
        let quote = PoolResolver::new(&probe)
            .resolve(token(), U256::from(100u64))
            .await
            .unwrap();
        assert_eq!(quote.fee_tier(), Some(500));
        assert_eq!(probe.calls(), vec!["v3:500"]);
    }

    #[tokio::test]
    async fn falls_back_to_v4_hook_pool() {
        let probe = MockProbe::new(&[], Some(1234));
        let quote = PoolResolver::new(&probe)
            .resolve(token(), U256::from(100u64))
            .await
            .unwrap();

        assert_eq!(quote.version(), PoolVersion::V4);
        assert_eq!(quote.amount_out(), U256::from(1234u64));
        assert_eq!(quote.hooks(), Some(crate::config::DEFAULT_V4_HOOKS));
        assert_eq!(probe.calls(), vec!["v3:500", "v3:3000", "v3:10000", "v4"]);
    }

    #[tokio::test]
    async fn no_pool_anywhere_is_no_liquidity() {
        let probe = MockProbe::new(&[], None);
        let err = PoolResolver::new(&probe)
            .resolve(token(), U256::from(100u64))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoLiquidityFound { token: t } if t == token()));
    }

    #[tokio::test]
    async fn zero_quote_is_treated_as_no_pool() {
        let probe = MockProbe::new(&[(500, 0)], Some(0));
        let err = PoolResolver::new(&probe)
            .resolve(token(), U256::from(100u64))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoLiquidityFound { .. }));
    }

    #[test]
    fn zero_amount_rejected_before_any_probe() {
        let probe = MockProbe::new(&[(500, 5)], None);
        let err = tokio_test::block_on(PoolResolver::new(&probe).resolve(token(), U256::ZERO))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
        assert!(probe.calls().is_empty());
    }
}
