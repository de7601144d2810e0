//! Base chain access

pub mod client;
pub mod erc20;

pub use client::{ChainClient, ChainOps, ReceiptStatus, TokenBalance};
pub use erc20::{format_units, parse_units};
