//! Warden - directory-backed identity verification
//!
//! Operator tool for checking a directory profile and verifying
//! credentials the same way the service does.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warden_core::config::{LogFormat, LoggingConfig};
use warden_core::WardenConfig;

#[derive(Parser)]
#[command(name = "warden")]
#[command(author = "Warden Team")]
#[command(version = warden_core::VERSION)]
#[command(about = "Directory-backed identity verification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify credentials against the directory and print the identity
    Login {
        /// Username to authenticate
        #[arg(short, long)]
        username: String,

        /// Password; read from stdin when not given
        #[arg(long, env = "WARDEN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the parsed directory profile
    Profile,

    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WardenConfig::from_file(path)?,
        None => WardenConfig::default(),
    };
    config.apply_env(std::env::vars())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);
    debug!("Loaded {} LDAP profile keys", config.ldap.len());

    let ctx = CommandContext {
        config,
        output_format: cli.output,
    };

    match cli.command {
        Commands::Login { username, password } => {
            commands::login::execute(&ctx, &username, password).await
        }
        Commands::Profile => commands::profile::execute(&ctx),
        Commands::Version => {
            println!("warden {}", warden_core::VERSION);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs go to stderr so command output stays machine-readable
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
