//! Sweeper Agent
//!
//! A single-wallet swap agent for Base:
//! - Encrypted local keystore, one wallet per install
//! - Hybrid Uniswap routing: V3 fee tiers probed in a fixed order, with a
//!   V4 hook-pool fallback
//! - Durable append-only swap history
//!
//! # Security Model
//!
//! - The private key lives AES-256-GCM encrypted on disk and is decrypted
//!   only while building a signer; decrypted bytes are zeroized on drop
//! - All signing and submission is serialized on one async mutex
//! - Key material never appears in logs or history records

pub mod actions;
pub mod agent;
pub mod chain;
pub mod config;
pub mod keystore;
pub mod router;
pub mod sweep;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use agent::SweeperAgent;
pub use config::AgentConfig;
pub use error::{Error, Result};
