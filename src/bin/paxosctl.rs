use anyhow::Result;
use clap::{Parser, Subcommand};
use paxoskv::config::ClientSettings;
use paxoskv::kv::{Clerk, HttpKvEndpoint};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "paxosctl")]
#[command(about = "CLI for the paxoskv key/value service")]
struct Cli {
    /// Comma-separated replica addresses.
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "127.0.0.1:9000,127.0.0.1:9001,127.0.0.1:9002"
    )]
    servers: Vec<String>,

    #[arg(long, default_value = "100")]
    retry_delay_ms: u64,

    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Get {
        key: String,
    },
    Put {
        key: String,
        value: String,
    },
    PutHash {
        key: String,
        value: String,
    },
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = ClientSettings {
        retry_delay_ms: cli.retry_delay_ms,
        request_timeout_ms: cli.timeout_ms,
    };

    let endpoints = cli
        .servers
        .iter()
        .map(|addr| HttpKvEndpoint::new(addr.clone(), settings.request_timeout()))
        .collect::<Result<Vec<_>, _>>()?;

    match cli.command {
        Commands::Get { key } => {
            let mut clerk = Clerk::new(endpoints, &settings)?;
            println!("{}", clerk.get(&key).await);
        }
        Commands::Put { key, value } => {
            let mut clerk = Clerk::new(endpoints, &settings)?;
            println!("{}", clerk.put(&key, &value).await);
        }
        Commands::PutHash { key, value } => {
            let mut clerk = Clerk::new(endpoints, &settings)?;
            println!("{}", clerk.put_hash(&key, &value).await);
        }
        Commands::Status => {
            let client = reqwest::Client::builder()
                .timeout(settings.request_timeout())
                .build()?;
            for addr in &cli.servers {
                match client.get(format!("http://{}/status", addr)).send().await {
                    Ok(resp) => {
                        let resp: Value = resp.json().await?;
                        println!("{}: {}", addr, serde_json::to_string_pretty(&resp)?);
                    }
                    Err(e) => println!("{}: unreachable ({})", addr, e),
                }
            }
        }
    }

    Ok(())
}
