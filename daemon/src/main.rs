//! Kestrel daemon — entry point for running a node.
//!
//! Exit code 0 means success; any uncaught validation or storage fault
//! from a one-shot command exits nonzero via the anyhow boundary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use kestrel_node::{KestrelNode, NodeConfig};
use kestrel_store_lmdb::{check_integrity, LmdbStore};

#[derive(Parser)]
#[command(name = "kestrel", about = "Kestrel ledger node")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data directory from the configuration.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    Run {
        /// Peers to bootstrap from before serving.
        #[arg(long)]
        bootstrap: Vec<SocketAddr>,
    },
    /// Verify the store's structural invariants and exit.
    Check,
    /// Print the version and exit.
    Version,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.node.data_dir = data_dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kestrel_utils::init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Run { bootstrap } => {
            let node = KestrelNode::new(config)?;
            if !bootstrap.is_empty() {
                let accepted = node.bootstrap_from(&bootstrap).await?;
                tracing::info!(accepted, "initial bootstrap finished");
            }
            node.run().await?;
        }
        Command::Check => {
            let store = LmdbStore::open(&config.node.data_dir)?;
            let txn = store.tx_begin_read()?;
            let report = check_integrity(&store, &txn)?;
            tracing::info!(
                accounts = report.accounts_checked,
                blocks = report.blocks_checked,
                pending = report.pending_checked,
                "integrity pass complete"
            );
            if !report.is_consistent() {
                for error in &report.errors {
                    tracing::error!("{error}");
                }
                anyhow::bail!("store failed the integrity check");
            }
        }
        Command::Version => {
            println!("kestrel {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
