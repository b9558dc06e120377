mod browser_commands;
mod config_commands;
mod extract_commands;
mod notify_commands;
mod run_commands;

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    partdesk_config::PartdeskConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "partdesk",
    about = "partdesk: answers part-code enquiries in the messaging web client"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of searching the standard locations.
    #[arg(long, global = true, env = "PARTDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the browser and answer unread conversations (default).
    Run(run_commands::RunArgs),
    /// Show the codes found in a message and whether it would be escalated.
    Extract(extract_commands::ExtractArgs),
    /// Report which Chromium-based browser would be launched.
    DetectBrowser {
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Send a test alert through the configured admin channel.
    NotifyTest {
        /// Alert text.
        #[arg(default_value = "partdesk test alert")]
        message: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit config file, or discover one in the standard locations.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<PartdeskConfig> {
    match explicit {
        Some(path) => partdesk_config::load_config(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(partdesk_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "partdesk starting");

    let config_path = cli.config.as_deref();
    match cli.command {
        // Default: run the responder when no subcommand is provided
        None => {
            let config = load_config(config_path)?;
            run_commands::handle_run(config, run_commands::RunArgs::default()).await
        },
        Some(Commands::Run(args)) => {
            run_commands::handle_run(load_config(config_path)?, args).await
        },
        Some(Commands::Extract(args)) => {
            extract_commands::handle_extract(&load_config(config_path)?, args)
        },
        Some(Commands::DetectBrowser { json }) => {
            browser_commands::handle_detect(&load_config(config_path)?, json)
        },
        Some(Commands::NotifyTest { message }) => {
            notify_commands::handle_notify_test(&load_config(config_path)?, &message).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, config_path),
    }
}
