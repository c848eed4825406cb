//! model-config entry point
//!
//! Reconciles operator-supplied model-provider configuration into the shared
//! encrypted store, typically once at service startup.

mod commands;
mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use model_config_core::{ConfigSource, ReconcileError};
use model_config_crypto::Algorithm;
use settings::{Overrides, Settings, StoreBackend};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "model-config")]
#[command(about = "Reconcile model-provider configuration into the encrypted store")]
#[command(version)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true, env = "MODEL_CONFIG_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "pretty", env = "MODEL_CONFIG_LOG_FORMAT")]
    log_format: LogFormat,

    /// Store backend
    #[arg(long, global = true, value_enum, env = "MODEL_CONFIG_STORE_BACKEND")]
    store_backend: Option<StoreBackend>,

    /// Store location (directory for file and sled backends)
    #[arg(long, global = true, env = "MODEL_CONFIG_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Key of the configuration record in the store
    #[arg(long, global = true, env = "MODEL_CONFIG_STORE_KEY")]
    store_key: Option<String>,

    /// Encryption algorithm (aes-256-gcm or chacha20-poly1305)
    #[arg(long, global = true, env = "MODEL_CONFIG_ENCRYPTION_ALGORITHM")]
    algorithm: Option<Algorithm>,

    /// Base URL of the model health endpoints
    #[arg(long, global = true, env = "MODEL_CONFIG_HEALTH_URL")]
    health_url: Option<String>,

    /// Per-category health check timeout in milliseconds
    #[arg(long, global = true, env = "MODEL_CONFIG_HEALTH_TIMEOUT_MS")]
    health_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, verify and persist the supplied configuration if it changed
    Reconcile {
        /// Configuration as inline JSON
        #[arg(long, env = "AI_MODELS_CONFIG", hide_env_values = true)]
        inline: Option<String>,

        /// Configuration as base64-encoded JSON
        #[arg(long, env = "AI_MODELS_CONFIG_BASE64", hide_env_values = true)]
        base64: Option<String>,

        /// Path to a JSON configuration file
        #[arg(long, env = "AI_MODELS_CONFIG_PATH")]
        path: Option<PathBuf>,

        /// Persist without live health checks
        #[arg(
            long,
            env = "AI_MODELS_SKIP_HEALTH_CHECK",
            value_parser = clap::builder::BoolishValueParser::new()
        )]
        skip_health_check: bool,
    },

    /// Print the persisted configuration
    Show {
        /// Print credential-like values instead of masking them
        #[arg(long)]
        reveal: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "model-config failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(
        cli.settings.as_deref(),
        Overrides {
            store_backend: cli.store_backend,
            store_path: cli.store_path,
            store_key: cli.store_key,
            algorithm: cli.algorithm,
            health_url: cli.health_url,
            health_timeout_ms: cli.health_timeout_ms,
        },
    )?;
    let encryption_key = std::env::var(commands::ENCRYPTION_KEY_ENV).ok();

    match cli.command {
        Commands::Reconcile {
            inline,
            base64,
            path,
            skip_health_check,
        } => {
            let source = ConfigSource {
                inline,
                base64,
                path,
            };
            let outcome =
                commands::reconcile(&settings, encryption_key.as_deref(), &source, skip_health_check)
                    .await?;
            println!("{}", outcome);
        }

        Commands::Show { reveal } => {
            match commands::show(&settings, encryption_key.as_deref(), reveal).await? {
                Some(config) => println!("{}", serde_json::to_string_pretty(&config)?),
                None => println!("no-record"),
            }
        }
    }

    Ok(())
}

/// 2 for problems in the supplied configuration, 1 for everything else
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<ReconcileError>() {
        Some(e) if e.is_user_error() => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reconcile() {
        let cli = Cli::try_parse_from([
            "model-config",
            "--store-backend",
            "memory",
            "--algorithm",
            "chacha20-poly1305",
            "reconcile",
            "--path",
            "/etc/models.json",
            "--skip-health-check",
        ])
        .unwrap();

        assert_eq!(cli.store_backend, Some(StoreBackend::Memory));
        assert_eq!(cli.algorithm, Some(Algorithm::ChaCha20Poly1305));
        match cli.command {
            Commands::Reconcile {
                path,
                skip_health_check,
                ..
            } => {
                assert_eq!(path, Some(PathBuf::from("/etc/models.json")));
                assert!(skip_health_check);
            }
            Commands::Show { .. } => panic!("expected reconcile"),
        }
    }

    #[test]
    fn test_exit_codes() {
        let user = anyhow::Error::new(ReconcileError::schema("$", "invalid JSON"));
        assert_eq!(exit_code(&user), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }
}
