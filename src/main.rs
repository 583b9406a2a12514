use anyhow::Result;
use clap::{Parser, Subcommand};
use paxoskv::{KvDaemon, NodeConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "paxoskv")]
#[command(about = "Fault-tolerant key/value server replicated with Paxos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(short, long, default_value = "paxoskv.toml")]
        config: PathBuf,

        /// Overrides `me` from the config file.
        #[arg(long)]
        me: Option<usize>,
    },
    Init {
        #[arg(short, long, default_value = "paxoskv.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paxoskv=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config: config_path, me } => {
            run_daemon(config_path, me).await?;
        }
        Commands::Init { config: config_path } => {
            init_config(config_path)?;
        }
    }

    Ok(())
}

async fn run_daemon(config_path: PathBuf, me: Option<usize>) -> Result<()> {
    let mut config = if config_path.exists() {
        info!("Loading config from {:?}", config_path);
        NodeConfig::load(&config_path)?
    } else {
        info!("Config file not found, using defaults");
        NodeConfig::default()
    };
    if let Some(me) = me {
        config.me = me;
    }

    let daemon = Arc::new(KvDaemon::new(config.clone())?);
    let router = daemon.router();

    let listener = TcpListener::bind(&config.listen_addr()).await?;
    info!("Listening on {}", config.listen_addr());

    let serve_daemon = daemon.clone();
    let api_handle = tokio::spawn(async move {
        let shutdown = async move { serve_daemon.wait_for_shutdown().await };
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Server error: {}", e);
        }
    });

    let daemon_clone = daemon.clone();
    let daemon_handle = tokio::spawn(async move {
        if let Err(e) = daemon_clone.run().await {
            error!("Daemon error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    daemon.shutdown();

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = daemon_handle.await;
        let _ = api_handle.await;
    })
    .await;

    Ok(())
}

fn init_config(config_path: PathBuf) -> Result<()> {
    if config_path.exists() {
        anyhow::bail!("Config file already exists: {:?}", config_path);
    }

    let config = NodeConfig::default();
    config.save(&config_path)?;
    println!("Created config file: {:?}", config_path);
    println!("\nEdit the config file to:");
    println!("  - List every peer address in `peers`");
    println!("  - Set `me` to this peer's index in that list");
    println!("  - Match bind_port to this peer's address");

    Ok(())
}
