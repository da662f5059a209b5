mod chat_cmd;
mod config;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use chatforge_config::defaults::{DEFAULT_PORT, DEFAULT_SESSION_ID};
use chatforge_config::PreparedConfig;
use chatforge_logging::init_logger;

#[derive(Parser)]
#[command(name = "chatforge")]
#[command(about = "ChatForge: conversational front end for text-generation engines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ChatForge HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to a chatforge.yaml config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show current runtime status
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat with a running server from the terminal
    Chat {
        /// Conversation id to use
        #[arg(short, long, default_value = DEFAULT_SESSION_ID)]
        user: String,
        /// Base URL of the server
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            config: config_file,
        } => {
            let path = config::config_path(config_file);
            let mut prepared = chatforge_config::load_and_prepare(path.as_deref()).await?;
            if let Some(port) = port {
                prepared.config.server.get_or_insert_with(Default::default).port = Some(port);
            }
            run_server(prepared).await?;
        }
        Commands::Status { port } => {
            status_cmd::run(port.unwrap_or_else(default_port)).await?;
        }
        Commands::Chat { user, url } => {
            let url = url.unwrap_or_else(|| format!("http://localhost:{}", default_port()));
            chat_cmd::run(&url, &user).await?;
        }
    }

    Ok(())
}

/// `PORT` if set and valid, otherwise the built-in default.
fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

async fn run_server(prepared: PreparedConfig) -> Result<()> {
    let PreparedConfig {
        config: cfg,
        path,
        warnings,
    } = prepared;
    init_logger(&config::logger_settings(&cfg));

    info!(path = %path.display(), "Loaded config");
    for warning in &warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Ok(snapshot) = serde_json::to_value(&cfg) {
        debug!(config = %chatforge_config::redact(&snapshot), "Effective config");
    }

    let addr = config::listen_addr(&cfg)?;
    let state = config::build_state(&cfg)?;

    info!(
        addr = %addr,
        engine = ?cfg.engine().kind.unwrap_or_default(),
        window = cfg.session().window_size,
        "Starting ChatForge"
    );

    chatforge_gateway::start_server(addr, state).await
}
