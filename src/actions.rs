//! Structured command surface
//!
//! Every action returns a JSON envelope: `{"success": true, ...}` on
//! success, `{"success": false, "error": "..."}` on failure. Errors carry
//! the next step the caller should take, never a stack trace.

use crate::agent::SweeperAgent;
use crate::config::WALLET_PASSWORD_ENV;
use crate::{Error, Result};
use serde_json::{json, Value};

/// Run one action and wrap the outcome in the success envelope.
pub async fn dispatch(agent: &SweeperAgent, action: &str, args: &Value) -> Value {
    match run(agent, action, args).await {
        Ok(mut body) => {
            if let Value::Object(map) = &mut body {
                map.insert("success".to_string(), Value::Bool(true));
            }
            body
        }
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
        }),
    }
}

async fn run(agent: &SweeperAgent, action: &str, args: &Value) -> Result<Value> {
    match action {
        "create_wallet" => {
            let address = agent.create_wallet()?;
            Ok(json!({
                "address": address,
                "note": format!("keystore password comes from {}", WALLET_PASSWORD_ENV),
            }))
        }
        "get_wallet" => {
            let summary = agent.wallet_summary().await?;
            Ok(serde_json::to_value(summary)?)
        }
        "export_private_key" => {
            let private_key = agent.export_private_key()?;
            Ok(json!({
                "private_key": private_key,
                "warning": "anyone with this key controls the wallet",
            }))
        }
        "set_target_token" => {
            let token = required_str(args, "token_address")?;
            let config = agent.set_target_token(token).await?;
            Ok(serde_json::to_value(config)?)
        }
        "get_sweep_config" => {
            let summary = agent.sweep_config().await?;
            Ok(serde_json::to_value(summary)?)
        }
        "get_token_balance" => {
            let token = optional_str(args, "token_address");
            let balance = agent.token_balance(token).await?;
            Ok(serde_json::to_value(balance)?)
        }
        "buy_token" => {
            let amount = required_str(args, "amount_eth")?;
            let token = optional_str(args, "token_address");
            let outcome = agent.buy_token(token, amount).await?;
            Ok(serde_json::to_value(outcome)?)
        }
        "send_token" => {
            let token = required_str(args, "token")?;
            let to = required_str(args, "to")?;
            let amount = required_str(args, "amount")?;
            let outcome = agent.send_token(token, to, amount).await?;
            Ok(serde_json::to_value(outcome)?)
        }
        other => Err(Error::Config(format!(
            "unknown action: {}; expected one of create_wallet, get_wallet, \
             export_private_key, set_target_token, get_sweep_config, \
             get_token_balance, buy_token, send_token",
            other
        ))),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Config(format!("missing required argument: {}", key)))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}
