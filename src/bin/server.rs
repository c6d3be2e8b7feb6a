//! Judgebox execution service

use clap::Parser;
use judgebox::config::{validate_config, Config};
use judgebox::server::{serve, AppState};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "judgebox-server", about = "Judgebox execution service")]
struct Args {
    /// Bind address (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Port (overrides config)
    #[arg(long, short)]
    port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if args.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;

    let validation = validate_config(&config);
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.valid {
        for error in &validation.errors {
            tracing::error!("{}", error);
        }
        anyhow::bail!("invalid configuration");
    }

    let state = AppState::from_config(&config);

    // first C# request should not pay for toolchain discovery
    let sandbox = state.sandbox().clone();
    tokio::spawn(async move {
        match sandbox.registry().warm_up().await {
            Ok(()) => info!("Toolchain warm-up complete"),
            Err(e) => warn!("Toolchain warm-up skipped: {}", e),
        }
    });

    let bind = args.bind.unwrap_or(config.server.bind);
    let port = args.port.unwrap_or(config.server.port);
    serve(state, &bind, port).await?;

    Ok(())
}
