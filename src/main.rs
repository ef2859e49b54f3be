//! tez-reveal
//!
//! Reveals the public key of an account whose private key lives in a remote
//! key management service.
//!
//! ```text
//!   ┌────────┐  public key / sign   ┌─────────────┐
//!   │  KMS   │◀────────────────────▶│             │
//!   └────────┘                      │   reveal    │   forge, digest
//!                                   │  workflow   │◀──────────────▶ codec
//!   ┌────────┐  chain id / counter  │             │
//!   │  node  │◀────────────────────▶│             │
//!   └────────┘  fee / injection     └─────────────┘
//! ```
//!
//! # Exit codes
//! - 0 success
//! - 1 configuration
//! - 2 transport (signer or node unreachable)
//! - 3 validation
//! - 4 node rejection
//! - 5 ambiguous broadcast
//! - 130 cancelled

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use tez_reveal::codec::{CodecError, SignedOperation, UnsignedOperation};
use tez_reveal::config::{load_config_with, ConfigError, ConfigOverrides, RevealConfig};
use tez_reveal::lifecycle::signals::cancel_on_signal;
use tez_reveal::lifecycle::startup::{build_workflow, key_handle, StartupError};
use tez_reveal::lifecycle::CancelToken;
use tez_reveal::observability::logging::init_logging;
use tez_reveal::resilience::retries::{run_with_retries, RetryPolicy};
use tez_reveal::reveal::RevealError;
use tez_reveal::tezos::{ProtocolParams, TagsVersion};

#[derive(Parser)]
#[command(name = "tez-reveal", version)]
#[command(about = "Reveal the public key of a KMS-held Tezos account", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build, sign and inject a reveal operation
    Reveal {
        #[arg(long)]
        rpc_url: Option<String>,
        #[arg(long)]
        key_handle: Option<String>,
        /// Sign but do not inject; print the signed operation instead
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the address controlled by the key
    Address {
        #[arg(long)]
        key_handle: Option<String>,
    },
    /// Inject a previously signed operation
    Submit {
        /// Signed operation bytes, hex encoded
        hex: String,
        #[arg(long)]
        rpc_url: Option<String>,
        #[arg(long, value_enum, default_value_t = TagsArg::V2)]
        tags: TagsArg,
    },
    /// Decode a forged reveal and print it as JSON
    Decode {
        hex: String,
        /// Input carries a trailing signature
        #[arg(long)]
        signed: bool,
        #[arg(long, value_enum, default_value_t = TagsArg::V2)]
        tags: TagsArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TagsArg {
    V0,
    V1,
    V2,
}

impl From<TagsArg> for ProtocolParams {
    fn from(arg: TagsArg) -> Self {
        ProtocolParams::new(match arg {
            TagsArg::V0 => TagsVersion::V0,
            TagsArg::V1 => TagsVersion::V1,
            TagsArg::V2 => TagsVersion::V2,
        })
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("startup error: {0}")]
    Startup(#[from] StartupError),
    #[error("invalid input: {0}")]
    Input(String),
    #[error(transparent)]
    Reveal(#[from] RevealError),
}

impl From<CodecError> for CliError {
    fn from(err: CodecError) -> Self {
        Self::Input(err.to_string())
    }
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Startup(_) => 1,
            Self::Input(_) => 3,
            Self::Reveal(e) => match e {
                RevealError::Transport { .. } => 2,
                RevealError::Validation { .. } => 3,
                RevealError::NodeRejection { .. } => 4,
                RevealError::AmbiguousBroadcast { .. } => 5,
                RevealError::Cancelled { .. } => 130,
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    if let Err(e) = init_logging(&level, cli.json_logs || config.observability.json) {
        eprintln!("logging setup failed: {e}");
    }
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "tez-reveal starting");

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Load the file and environment, then apply command-line overrides.
fn load(cli: &Cli) -> Result<RevealConfig, CliError> {
    let (rpc_url, key_handle) = match &cli.command {
        Command::Reveal {
            rpc_url,
            key_handle,
            ..
        } => (rpc_url.clone(), key_handle.clone()),
        Command::Address { key_handle } => (None, key_handle.clone()),
        Command::Submit { rpc_url, .. } => (rpc_url.clone(), None),
        Command::Decode { .. } => (None, None),
    };
    let overrides = ConfigOverrides {
        rpc_url,
        key_handle,
    };
    Ok(load_config_with(cli.config.as_deref(), &overrides)?)
}

async fn run(command: Command, config: RevealConfig) -> Result<(), CliError> {
    match command {
        Command::Reveal { dry_run, .. } => {
            let key = key_handle(&config)?;
            let workflow = build_workflow(&config)?;
            let policy = RetryPolicy::from(&config.retries);
            let cancel = CancelToken::new();
            let _signals = cancel_on_signal(cancel.clone());

            let (flow, key_ref, token) = (&workflow, &key, &cancel);
            if dry_run {
                let signed = run_with_retries(&policy, &cancel, move |_| {
                    flow.prepare(key_ref, token)
                })
                .await?;
                print_signed(&signed)?;
            } else {
                let hash = run_with_retries(&policy, &cancel, move |_| {
                    flow.reveal(key_ref, token)
                })
                .await?;
                println!("{hash}");
            }
        }
        Command::Address { .. } => {
            let key = key_handle(&config)?;
            let workflow = build_workflow(&config)?;
            let address = workflow.resolve_address(&key).await?;
            println!("{address}");
        }
        Command::Submit { hex, tags, .. } => {
            let bytes = decode_hex(&hex)?;
            let signed = SignedOperation::decode(&bytes, tags.into())?;
            let workflow = build_workflow(&config)?;
            let cancel = CancelToken::new();
            let _signals = cancel_on_signal(cancel.clone());
            let hash = workflow.submit(signed, &cancel).await?;
            println!("{hash}");
        }
        Command::Decode { hex, signed, tags } => {
            let bytes = decode_hex(&hex)?;
            if signed {
                print_signed(&SignedOperation::decode(&bytes, tags.into())?)?;
            } else {
                let unsigned = UnsignedOperation::decode(&bytes, tags.into())?;
                print_json(&json!({
                    "operation": unsigned,
                    "digest": hex::encode(unsigned.digest()?),
                }))?;
            }
        }
    }
    Ok(())
}

fn decode_hex(input: &str) -> Result<Vec<u8>, CliError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| CliError::Input(format!("hex: {e}")))
}

fn print_signed(signed: &SignedOperation) -> Result<(), CliError> {
    print_json(&json!({
        "operation_hash": signed.hash()?.to_string(),
        "operation": signed.operation(),
        "digest": hex::encode(signed.digest()),
        "signature": signed.signature().to_string(),
        "signed_bytes": hex::encode(signed.encode()?),
    }))
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| CliError::Input(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn report(err: &CliError) {
    eprintln!("error: {err}");
    match err {
        CliError::Reveal(RevealError::AmbiguousBroadcast { operation_hash, .. }) => {
            eprintln!("check whether {operation_hash} was included before trying again");
        }
        CliError::Reveal(RevealError::Cancelled {
            signed: Some(signed),
            ..
        }) => {
            if let Ok(bytes) = signed.encode() {
                eprintln!(
                    "the operation was signed but not injected; to inject it run: tez-reveal submit {}",
                    hex::encode(bytes)
                );
            }
        }
        _ => {}
    }
}
