//! secp256k1 wallet generator for exercising authenticated endpoints.
//!
//! Generates (or loads) a wallet key and prints:
//! - The wallet address
//! - Challenge headers signed for the current time
//! - Optionally, the private key saved to a file
//!
//! Usage:
//!   cargo run --bin skillforge-keygen -- [--key <hex>] [--save <path>]

use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use k256::ecdsa::SigningKey;
use skillforge_gate::auth::{address_of, sign_challenge, DEFAULT_NAMESPACE, REPLAY_WINDOW};
use skillforge_gate::ledger::lower_hex;
use std::fs;
use std::path::PathBuf;

/// Generate a wallet key and signed challenge headers.
#[derive(Parser, Debug)]
#[command(name = "skillforge-keygen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Existing private key (hex) instead of a fresh one.
    #[arg(long, env = "SKILLFORGE_WALLET_KEY")]
    key: Option<String>,

    /// Namespace of the signed message.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Write the private key (hex) to this file.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn load_key(hex_key: &str) -> color_eyre::Result<SigningKey> {
    let trimmed = hex_key.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .wrap_err("private key is not hex")?;
    if bytes.len() != 32 {
        bail!("private key must be 32 bytes, got {}", bytes.len());
    }
    SigningKey::from_slice(&bytes).wrap_err("invalid secp256k1 private key")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let key = match &args.key {
        Some(hex_key) => load_key(hex_key)?,
        None => SigningKey::random(&mut rand::rngs::OsRng),
    };
    let address = address_of(key.verifying_key());

    println!("Wallet address: {}", lower_hex(&address));
    println!("  Checksummed:  {}", address.to_checksum(None));

    if let Some(path) = &args.save {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        fs::write(path, hex::encode(key.to_bytes()))
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        println!("\nPrivate key saved to: {}", path.display());
        println!("  WARNING: Keep this file secure! It controls the wallet.");
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    let challenge = sign_challenge(&key, &args.namespace, now_ms)?;

    println!(
        "\nChallenge headers (valid for {} seconds):",
        REPLAY_WINDOW.as_secs()
    );
    for (name, value) in challenge.to_headers() {
        println!("  {name}: {value}");
    }

    println!("\ncurl flags:");
    let flags: Vec<String> = challenge
        .to_headers()
        .into_iter()
        .map(|(name, value)| format!("-H '{name}: {value}'"))
        .collect();
    println!("  {}", flags.join(" "));

    Ok(())
}
