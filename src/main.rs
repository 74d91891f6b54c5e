use clap::{Parser, Subcommand};
use crm_mcp::commands::{serve_mcp, show_config};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "crm-mcp")]
#[command(about = "MCP server exposing enterprise CRM tools and resources over stdio")]
#[command(version)]
struct Cli {
    /// Path to a config file (defaults to ~/.crm-mcp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio (the default)
    Serve,
    /// Inspect configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve_mcp(config).await {
                error!("Failed to start server: {:#}", e);
                eprintln!("Failed to start server: {:#}", e);
                return ExitCode::FAILURE;
            }
        }
        Commands::Config { show } => {
            if !show {
                eprintln!("Nothing to do: pass --show to print the configuration");
                return ExitCode::FAILURE;
            }
            if let Err(e) = show_config(config) {
                eprintln!("Error: {:#}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
