//! Uniswap contract bindings and calldata builders
//!
//! V3 swaps go through SwapRouter02 directly. V4 swaps go through the
//! Universal Router, which takes a command byte string plus one ABI-encoded
//! input per command; the V4_SWAP command nests its own action byte string.

use crate::config::contracts::{ADDRESS_THIS, WETH};
use crate::router::V4PoolParams;
use crate::{Error, Result};
use alloy::primitives::aliases::{I24, U160, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

sol! {
    /// V4 pool identifier. Currencies are ordered by address.
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    /// Swap parameters for the V4 SWAP_EXACT_IN_SINGLE action.
    struct V4ExactInputSingle {
        PoolKey poolKey;
        bool zeroForOne;
        uint128 amountIn;
        uint128 amountOutMinimum;
        bytes hookData;
    }

    #[sol(rpc)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }

    #[sol(rpc)]
    interface IV4Quoter {
        struct QuoteExactSingleParams {
            PoolKey poolKey;
            bool zeroForOne;
            uint128 exactAmount;
            bytes hookData;
        }

        function quoteExactInputSingle(QuoteExactSingleParams memory params)
            external
            returns (uint256 amountOut, uint256 gasEstimate);
    }

    interface ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);
    }

    interface IUniversalRouter {
        function execute(bytes calldata commands, bytes[] calldata inputs, uint256 deadline)
            external
            payable;
    }
}

/// Universal Router command bytes.
pub const CMD_WRAP_ETH: u8 = 0x0b;
pub const CMD_V4_SWAP: u8 = 0x10;

/// V4 router action bytes.
pub const ACTION_SWAP_EXACT_IN_SINGLE: u8 = 0x06;
pub const ACTION_SETTLE: u8 = 0x0b;
pub const ACTION_TAKE_ALL: u8 = 0x0f;

pub(crate) fn fee_u24(fee: u32) -> Result<U24> {
    U24::try_from(fee).map_err(|_| Error::Config(format!("fee {} does not fit uint24", fee)))
}

fn spacing_i24(spacing: i32) -> Result<I24> {
    I24::try_from(spacing)
        .map_err(|_| Error::Config(format!("tick spacing {} does not fit int24", spacing)))
}

/// Build the V4 pool key for a token/WETH pool. Returns the key plus the
/// swap direction for WETH-in (`zeroForOne` is true when WETH sorts first).
pub fn v4_pool_key(token: Address, params: &V4PoolParams) -> Result<(PoolKey, bool)> {
    let (currency0, currency1) = if WETH < token {
        (WETH, token)
    } else {
        (token, WETH)
    };
    let key = PoolKey {
        currency0,
        currency1,
        fee: fee_u24(params.fee)?,
        tickSpacing: spacing_i24(params.tick_spacing)?,
        hooks: params.hooks,
    };
    let zero_for_one = currency0 == WETH;
    Ok((key, zero_for_one))
}

/// SwapRouter02 `exactInputSingle` calldata for a WETH -> token swap. The
/// router wraps the attached native value itself.
pub fn v3_swap_calldata(
    token_out: Address,
    recipient: Address,
    amount_in: U256,
    amount_out_minimum: U256,
    fee: u32,
) -> Result<Bytes> {
    let call = ISwapRouter02::exactInputSingleCall {
        params: ISwapRouter02::ExactInputSingleParams {
            tokenIn: WETH,
            tokenOut: token_out,
            fee: fee_u24(fee)?,
            recipient,
            amountIn: amount_in,
            amountOutMinimum: amount_out_minimum,
            sqrtPriceLimitX96: U160::ZERO,
        },
    };
    Ok(call.abi_encode().into())
}

/// Universal Router calldata for an ETH -> token swap through a V4 hook
/// pool: WRAP_ETH into the router, then SWAP_EXACT_IN_SINGLE / SETTLE /
/// TAKE_ALL inside a V4_SWAP command. Hook pools quote through their hook,
/// so the minimum-out is left to the receipt check.
pub fn v4_swap_calldata(
    token_out: Address,
    amount_in: u128,
    deadline: U256,
    params: &V4PoolParams,
) -> Result<Bytes> {
    let (pool_key, zero_for_one) = v4_pool_key(token_out, params)?;

    let wrap_input: Bytes = (ADDRESS_THIS, U256::from(amount_in))
        .abi_encode_params()
        .into();

    let swap = V4ExactInputSingle {
        poolKey: pool_key,
        zeroForOne: zero_for_one,
        amountIn: amount_in,
        amountOutMinimum: 0,
        hookData: Bytes::new(),
    };
    let actions = Bytes::from(vec![
        ACTION_SWAP_EXACT_IN_SINGLE,
        ACTION_SETTLE,
        ACTION_TAKE_ALL,
    ]);
    let action_params: Vec<Bytes> = vec![
        swap.abi_encode().into(),
        (WETH, U256::ZERO, false).abi_encode_params().into(),
        (token_out, U256::ZERO).abi_encode_params().into(),
    ];
    let v4_input: Bytes = (actions, action_params).abi_encode_params().into();

    let commands = Bytes::from(vec![CMD_WRAP_ETH, CMD_V4_SWAP]);
    let call = IUniversalRouter::executeCall {
        commands,
        inputs: vec![wrap_input, v4_input],
        deadline,
    };
    Ok(call.abi_encode().into())
}
