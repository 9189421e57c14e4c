//! skillforge-gate CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command, LogFormat};
use color_eyre::eyre::{bail, WrapErr};
use serde_json::{json, Value};
use skillforge_gate::config::default_config_path;
use skillforge_gate::ledger::{lower_hex, parse_address, TokenAmount};
use skillforge_gate::{
    digest, AuthMode, BalanceDecision, BalanceGate, Challenge, GateConfig, IdentityVerifier,
    JsonRpcLedger, PaymentClaim, PaymentOutcome, PaymentVerifier,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration before tracing so the configured level applies;
    // init-config runs even when an existing file does not load
    let loaded = cli.to_config();
    let log_level = match (&cli.log_level, &loaded) {
        (Some(level), _) => level.clone(),
        (None, Ok(config)) => config.log_level.clone(),
        (None, Err(_)) => GateConfig::default().log_level,
    };

    // Initialize tracing; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    debug!("skillforge-gate v{}", env!("CARGO_PKG_VERSION"));

    let (report, ok) = match &cli.command {
        Command::InitConfig { path, force } => return init_config(path.clone(), *force),
        Command::Digest { file } => {
            let bytes = std::fs::read(file)
                .wrap_err_with(|| format!("failed to read {}", file.display()))?;
            (json!({ "contentHash": digest(&bytes).to_string() }), true)
        }
        Command::Balance { address } => balance(&loaded?, address).await?,
        Command::VerifyPayment {
            tx,
            from,
            to,
            amount,
        } => verify_payment(&loaded?, tx, from, to, amount).await?,
        Command::VerifyChallenge {
            address,
            signature,
            timestamp,
            optional,
        } => {
            let challenge = Challenge {
                address: address.clone(),
                signature: signature.clone(),
                issued_at: timestamp.clone(),
            };
            verify_challenge(&loaded?, &challenge, *optional)
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn init_config(path: Option<std::path::PathBuf>, force: bool) -> color_eyre::Result<ExitCode> {
    let path = path.unwrap_or_else(default_config_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    GateConfig::default().to_file(&path)?;
    info!("Wrote default configuration to {}", path.display());
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn balance(config: &GateConfig, address: &str) -> color_eyre::Result<(Value, bool)> {
    let owner = parse_address(address)?;
    let decimals = config.ledger.token_decimals;
    let threshold = TokenAmount::parse(&config.publish.min_balance_tokens, decimals)?;

    let ledger = Arc::new(JsonRpcLedger::new(&config.ledger)?);
    let decision = BalanceGate::new(ledger)
        .check_minimum_balance(owner, threshold.base_units)
        .await?;

    let balance = TokenAmount::new(decision.balance(), decimals);
    let allowed = matches!(decision, BalanceDecision::Allowed { .. });
    Ok((
        json!({
            "address": lower_hex(&owner),
            "balance": balance.to_string(),
            "requiredThreshold": threshold.to_string(),
            "canPublish": allowed,
        }),
        allowed,
    ))
}

async fn verify_payment(
    config: &GateConfig,
    tx: &str,
    from: &str,
    to: &str,
    amount: &str,
) -> color_eyre::Result<(Value, bool)> {
    let decimals = config.ledger.token_decimals;
    let claim = PaymentClaim {
        transaction_reference: tx.to_string(),
        payer: parse_address(from)?,
        payee: parse_address(to)?,
        minimum_amount: TokenAmount::parse(amount, decimals)?.base_units,
    };

    let ledger = Arc::new(JsonRpcLedger::new(&config.ledger)?);
    let outcome = PaymentVerifier::new(ledger).verify_payment(&claim).await;

    Ok(match outcome {
        PaymentOutcome::Verified(event) => (
            json!({
                "verified": true,
                "transfer": {
                    "from": lower_hex(&event.from),
                    "to": lower_hex(&event.to),
                    "amount": TokenAmount::new(event.amount, decimals).to_string(),
                },
            }),
            true,
        ),
        PaymentOutcome::Unverified(reason) => (
            json!({
                "verified": false,
                "reason": reason.code(),
                "detail": reason.to_string(),
            }),
            false,
        ),
    })
}

fn verify_challenge(config: &GateConfig, challenge: &Challenge, optional: bool) -> (Value, bool) {
    let verifier = IdentityVerifier::new(config.auth.namespace.clone());
    let mode = if optional {
        AuthMode::Optional
    } else {
        AuthMode::Mandatory
    };

    match verifier.authenticate(challenge, mode) {
        Ok(Some(identity)) => (json!({ "wallet": identity.to_lower_hex() }), true),
        Ok(None) => (json!({ "wallet": null }), true),
        Err(rejection) => (
            json!({
                "status": rejection.http_status(),
                "rejection": rejection.body(),
            }),
            false,
        ),
    }
}
