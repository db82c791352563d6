use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use pb_discord::infrastructure::adapters::discord;
use pb_discord::infrastructure::config::Config;
use pb_discord::infrastructure::logging;

/// Exit status used when the bot fails to start.
const STARTUP_FAILURE: u8 = 69;

#[derive(Parser)]
#[command(name = "pb-discord")]
#[command(about = "Project Borealis Discord bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Version => {
            println!("pb-discord v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(),
    }
}

fn load_config(path: &str, token_override: Option<String>) -> Result<Config, String> {
    let mut config = Config::load(path).map_err(|e| e.to_string())?;
    if let Some(token) = token_override {
        config.bot.token = token;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn run_bot(config_path: &str, token_override: Option<String>) -> ExitCode {
    let config = match load_config(config_path, token_override) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Unknown Startup Error Occurred: {e}");
            return ExitCode::from(STARTUP_FAILURE);
        }
    };

    if let Err(e) = logging::init(&config) {
        eprintln!("{e}");
        return ExitCode::from(STARTUP_FAILURE);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start the async runtime: {}", e);
            return ExitCode::from(STARTUP_FAILURE);
        }
    };

    tracing::info!("Starting pb-discord v{}", env!("CARGO_PKG_VERSION"));
    match rt.block_on(discord::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::error!("Unknown Startup Error Occurred.");
            ExitCode::from(STARTUP_FAILURE)
        }
    }
}

fn init_config() -> ExitCode {
    match Config::default_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to render default config: {e}");
            ExitCode::FAILURE
        }
    }
}
