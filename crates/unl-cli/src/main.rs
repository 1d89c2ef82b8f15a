// Validator list publishing tool

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unl_cli::commands::{self, generate::GenerateOptions};
use unl_cli::{open_secret_store, CliConfig};
use unl_core::Effects;

#[derive(Parser)]
#[command(name = "unl")]
#[command(about = "Create and manage signed validator lists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: <config dir>/unl/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the publisher master and ephemeral keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },

    /// Build a signed validator list from a node list
    Generate {
        /// Node list file (YAML or JSON with `nodes: [{id, name}]`)
        validators: PathBuf,

        /// List sequence number
        #[arg(short, long, default_value = "1")]
        sequence: u32,

        /// Expiration time (Unix seconds)
        #[arg(short, long)]
        expiration: u64,

        /// Output file
        #[arg(short, long, default_value = "unl.json")]
        output: PathBuf,

        /// WebSocket endpoint for manifest lookups
        #[arg(long)]
        rpc_url: Option<String>,

        /// Publisher domain to include in the manifest
        #[arg(long)]
        domain: Option<String>,

        /// Read manifests from a `{public_key: manifest}` JSON file instead of the network
        #[arg(long)]
        manifests: Option<PathBuf>,
    },

    /// Verify a validator list document
    Verify {
        /// Validator list JSON file
        file: PathBuf,
    },

    /// Read and write the secret store
    Secret {
        #[command(subcommand)]
        command: SecretCommand,
    },
}

#[derive(Subcommand)]
enum KeysCommand {
    /// Load stored keys, generating them if absent
    Init {
        /// Replace existing keys
        #[arg(long)]
        force: bool,
    },
    /// Print the stored public keys
    Show,
}

#[derive(Subcommand)]
enum SecretCommand {
    /// Print a secret
    Get { service: String, key: String },
    /// Store a secret
    Set {
        service: String,
        key: String,
        value: String,
    },
    /// Remove a secret
    Delete { service: String, key: String },
    /// List keys stored for a service
    List { service: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;
    let effects = Effects::production();

    match cli.command {
        Commands::Keys { command } => {
            let store = open_secret_store(&config)?;
            match command {
                KeysCommand::Init { force } => {
                    commands::keys::init(store.as_ref(), &effects, force)?;
                }
                KeysCommand::Show => {
                    commands::keys::show(store.as_ref())?;
                }
            }
        }
        Commands::Generate {
            validators,
            sequence,
            expiration,
            output,
            rpc_url,
            domain,
            manifests,
        } => {
            let options = GenerateOptions {
                validators,
                sequence,
                expiration,
                output,
                rpc_url,
                domain,
                manifests,
            };
            let store = open_secret_store(&config)?;
            commands::generate::run(&config, store.as_ref(), effects, &options).await?;
        }
        Commands::Verify { file } => {
            commands::verify::run(&file, effects.now()?)?;
        }
        Commands::Secret { command } => {
            let store = open_secret_store(&config)?;
            match command {
                SecretCommand::Get { service, key } => {
                    commands::secret::get(store.as_ref(), &service, &key)?;
                }
                SecretCommand::Set {
                    service,
                    key,
                    value,
                } => {
                    commands::secret::set(store.as_ref(), &service, &key, &value)?;
                }
                SecretCommand::Delete { service, key } => {
                    commands::secret::delete(store.as_ref(), &service, &key)?;
                }
                SecretCommand::List { service } => {
                    commands::secret::list(store.as_ref(), &service)?;
                }
            }
        }
    }

    Ok(())
}
