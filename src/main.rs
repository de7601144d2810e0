//! Sweeper Agent CLI
//!
//! Thin clap front end over the action surface; every subcommand prints one
//! JSON envelope.

use clap::{Parser, Subcommand};
use serde_json::json;
use sweeper_agent::{actions, AgentConfig, Result, SweeperAgent};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sweeper")]
#[command(about = "Single-wallet swap agent for Base")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the wallet (fails if one already exists)
    CreateWallet,

    /// Show the wallet address and native balance
    Wallet,

    /// Print the decrypted private key
    ExportKey,

    /// Set the sweep target token
    SetTarget {
        /// ERC-20 token address
        token_address: String,
    },

    /// Show the sweep target and recent swap history
    Config,

    /// Show a token balance (defaults to the sweep target)
    Balance {
        /// ERC-20 token address
        token_address: Option<String>,
    },

    /// Swap native ETH into the target token
    Sweep {
        /// Amount of ETH to spend, gas reserve included
        amount_eth: String,

        /// Swap into this token instead of the configured target
        #[arg(long)]
        token: Option<String>,
    },

    /// Send ETH or an ERC-20 from the wallet
    Send {
        /// "eth" or an ERC-20 token address
        token: String,

        /// Recipient address
        to: String,

        /// Amount in token units
        amount: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = AgentConfig::from_env()?;
    let agent = SweeperAgent::new(&config)?;

    let (action, args) = match cli.command {
        Commands::CreateWallet => ("create_wallet", json!({})),
        Commands::Wallet => ("get_wallet", json!({})),
        Commands::ExportKey => ("export_private_key", json!({})),
        Commands::SetTarget { token_address } => {
            ("set_target_token", json!({ "token_address": token_address }))
        }
        Commands::Config => ("get_sweep_config", json!({})),
        Commands::Balance { token_address } => {
            ("get_token_balance", json!({ "token_address": token_address }))
        }
        Commands::Sweep { amount_eth, token } => (
            "buy_token",
            json!({ "amount_eth": amount_eth, "token_address": token }),
        ),
        Commands::Send { token, to, amount } => (
            "send_token",
            json!({ "token": token, "to": to, "amount": amount }),
        ),
    };

    let envelope = actions::dispatch(&agent, action, &args).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if envelope["success"] != json!(true) {
        std::process::exit(1);
    }
    Ok(())
}
