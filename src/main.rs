//! AnonID - privacy-first identity registration
//!
//! Registers identities from the registry, scores data requests for privacy
//! risk and serves the disclosure API.

use a3s_anonid::{
    api::build_app, error::to_json, load_config, AnonIdConfig, AnonIdService,
    RiskScorer,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "anonid")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Privacy-first identity registration with risk-gated disclosure")]
struct Cli {
    /// Configuration file path (.hcl)
    #[arg(short, long, env = "ANONID_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Register an identity by NIN
    Register {
        /// National identification number
        #[arg(long)]
        nin: String,

        /// Re-register with a fresh anonymized id and key
        #[arg(long)]
        refresh: bool,
    },

    /// Score a data request for privacy risk
    Check {
        /// Request text
        text: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("anonid={},a3s_anonid={},tower_http=debug", log_level, log_level).into());
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let (config, _config_path) =
        load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            run_server(config, &host, port).await?;
        }
        Commands::Register { nin, refresh } => {
            let service = build_service(&config)?;
            let registration = service
                .register(&nin, refresh)
                .await
                .context("Registration failed")?;
            print_json(&registration)?;
        }
        Commands::Check { text } => {
            let scorer = RiskScorer::new(config.privacy.clone());
            let assessment = scorer.check(&text)?;
            print_json(&assessment)?;
        }
        Commands::Config { default } => {
            let config = if default {
                AnonIdConfig::default()
            } else {
                config.redacted()
            };
            show_config(&config)?;
        }
    }

    Ok(())
}

fn build_service(config: &AnonIdConfig) -> Result<AnonIdService> {
    AnonIdService::from_config(config).with_context(|| {
        format!(
            "Failed to open identity store at {}",
            config.storage.database_path.display()
        )
    })
}

/// Bind, serve with graceful shutdown on Ctrl-C
async fn run_server(config: AnonIdConfig, host: &str, port: u16) -> Result<()> {
    let service = Arc::new(build_service(&config)?);
    let app = build_app(service, &config.server.cors_origins);

    let addr: std::net::SocketAddr = format!("{host}:{port}")
        .parse()
        .context("Invalid listen address")?;

    tracing::info!(%addr, "AnonID API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down...");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(&to_json(value)).context("Failed to format output")?;
    println!("{}", json);
    Ok(())
}

fn show_config(config: &AnonIdConfig) -> Result<()> {
    let hcl = hcl::to_string(config).context("Failed to render configuration")?;
    println!("{}", hcl);
    Ok(())
}
