//! marqueed — the Marquee daemon.
//!
//! Single binary that assembles the instance subsystems:
//! - Key-value store (redb)
//! - Playbook catalog (TOML files)
//! - In-process lifecycle deployer
//! - Command dispatcher
//! - REST API + chat command endpoint
//!
//! # Usage
//!
//! ```text
//! marqueed standalone --port 8080 --data-dir /var/lib/marquee --playbooks-dir ./playbooks
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use marquee_api::{ApiState, build_router};
use marquee_command::{Dispatcher, LifecycleDeployer};
use marquee_playbook::PlaybookSet;
use marquee_state::{InstanceRepository, RedbStore};

use crate::config::{DaemonConfig, Overrides};

#[derive(Parser)]
#[command(name = "marqueed", about = "Marquee daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run in standalone mode (single process, local redb store).
    Standalone {
        /// TOML config file; flags below override its values.
        #[arg(long, env = "MARQUEE_CONFIG")]
        config: Option<PathBuf>,

        /// Port to listen on.
        #[arg(long, env = "MARQUEE_PORT")]
        port: Option<u16>,

        /// Data directory for persistent state.
        #[arg(long, env = "MARQUEE_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Directory of playbook `*.toml` files.
        #[arg(long, env = "MARQUEE_PLAYBOOKS_DIR")]
        playbooks_dir: Option<PathBuf>,

        /// Root prefix for every stored key.
        #[arg(long, env = "MARQUEE_KEY_ROOT")]
        key_root: Option<String>,

        /// Shared secret chat commands must present.
        #[arg(long, env = "MARQUEE_CHAT_TOKEN", hide_env_values = true)]
        chat_token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marqueed=debug,marquee_api=debug,marquee_command=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            config,
            port,
            data_dir,
            playbooks_dir,
            key_root,
            chat_token,
        } => {
            let overrides = Overrides {
                port,
                data_dir,
                playbooks_dir,
                key_root,
                chat_token,
            };
            let config = DaemonConfig::resolve(config.as_deref(), overrides)?;
            run_standalone(config).await
        }
    }
}

async fn run_standalone(config: DaemonConfig) -> anyhow::Result<()> {
    info!("Marquee daemon starting in standalone mode");

    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = config.db_path();

    // ── Initialize subsystems ──────────────────────────────────

    let store = RedbStore::open(&db_path)?;
    info!(path = ?db_path, "kv store opened");

    let playbooks = PlaybookSet::load_dir(&config.playbooks_dir)?;
    info!(playbooks = ?playbooks.ids(), "playbook catalog ready");

    let repo = InstanceRepository::new(Arc::new(store), config.key_root.clone());
    info!(root = %repo.root(), "instance repository ready");

    let deployer = Arc::new(LifecycleDeployer::new(repo.clone()));
    let dispatcher = Dispatcher::new(repo, Arc::new(playbooks), deployer);

    if config.chat_token.is_none() {
        warn!("no chat token configured; POST /command will reject every request");
    }

    // ── Start API server ───────────────────────────────────────

    let router = build_router(ApiState {
        dispatcher,
        chat_token: config.chat_token.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c; running until killed");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Marquee daemon stopped");
    Ok(())
}
