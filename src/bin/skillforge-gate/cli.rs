//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use skillforge_gate::config::default_config_path;
use skillforge_gate::GateConfig;
use std::path::PathBuf;

/// Verification tooling for the SkillForge access gate.
#[derive(Parser, Debug)]
#[command(name = "skillforge-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, global = true, env = "SKILLFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint of the ledger.
    #[arg(long, global = true, env = "SKILLFORGE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Token contract address.
    #[arg(long, global = true, env = "SKILLFORGE_TOKEN_ADDRESS")]
    pub token_address: Option<String>,

    /// Log level; defaults to the configured `log_level`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the content digest of a file.
    Digest {
        /// File to digest.
        file: PathBuf,
    },

    /// Read an address's token balance and apply the publish threshold.
    Balance {
        /// Wallet address.
        address: String,
    },

    /// Check that a transaction paid the expected amount.
    VerifyPayment {
        /// Transaction hash.
        #[arg(long)]
        tx: String,
        /// Expected payer.
        #[arg(long)]
        from: String,
        /// Expected payee.
        #[arg(long)]
        to: String,
        /// Minimum amount, in tokens.
        #[arg(long)]
        amount: String,
    },

    /// Verify a signed challenge.
    VerifyChallenge {
        /// Claimed wallet address.
        #[arg(long)]
        address: Option<String>,
        /// Hex signature.
        #[arg(long)]
        signature: Option<String>,
        /// Millisecond timestamp that was signed.
        #[arg(long)]
        timestamp: Option<String>,
        /// Treat rejection as anonymous access instead of failure.
        #[arg(long)]
        optional: bool,
    },

    /// Write a default configuration file.
    InitConfig {
        /// Destination; defaults to the platform config directory.
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Build the effective configuration.
    ///
    /// File values are overridden by flags and environment variables. The
    /// legacy `OPENWORK_RPC` and `OPENWORK_TOKEN` variables are honoured when
    /// the `SKILLFORGE_*` equivalents are unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded,
    /// or if the result does not validate.
    pub fn to_config(&self) -> color_eyre::Result<GateConfig> {
        // Start with default config or load from file
        let mut config = match &self.config {
            Some(path) => GateConfig::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    GateConfig::from_file(&path)?
                } else {
                    GateConfig::default()
                }
            }
        };

        if let Some(url) = self
            .rpc_url
            .clone()
            .or_else(|| std::env::var("OPENWORK_RPC").ok())
        {
            config.ledger.rpc_url = url;
        }
        if let Some(token) = self
            .token_address
            .clone()
            .or_else(|| std::env::var("OPENWORK_TOKEN").ok())
        {
            config.ledger.token_address = token;
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }

        config.validate()?;
        Ok(config)
    }
}
