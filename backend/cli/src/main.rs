mod chat_cmd;
mod sessions_cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use mnemo_config::MnemoConfig;
use mnemo_gateway::GatewayState;

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(about = "Mnemo — chat backend with session memory and query understanding")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one query through the pipeline in-process, printing each event
    Chat {
        query: String,
        /// Session id to converse under (random when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Inspect or clear persisted session memory
    Session {
        #[command(subcommand)]
        command: sessions_cmd::SessionCommands,
    },
    /// Check a running gateway's health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = mnemo_config::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging.level, config.logging.log_dir.as_deref());

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await?;
        }
        Commands::Chat { query, session } => {
            chat_cmd::run(&config, query, session).await?;
        }
        Commands::Session { command } => {
            sessions_cmd::run(&config, command).await?;
        }
        Commands::Status => {
            let url = format!("http://localhost:{}/api/health", config.server.port);
            let client = reqwest::Client::new();
            match client.get(&url).send().await {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("Mnemo is not running on port {}", config.server.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: MnemoConfig) -> Result<()> {
    info!(
        port = config.server.port,
        bind = %config.server.bind_address,
        memory_dir = %config.memory.dir.display(),
        "Starting Mnemo backend"
    );

    let pipeline = mnemo_agent::build_pipeline(&config)?;
    let addr: SocketAddr =
        format!("{}:{}", config.server.bind_address, config.server.port).parse()?;

    mnemo_gateway::start_server(addr, GatewayState { pipeline }, &config.server.api_version).await
}
