// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Noah Optimizer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Noah Optimizer - entry point of the Home Assistant add-on
//!
//! Loads the configuration, connects to Home Assistant and drives the control
//! loop at the configured adjustment interval until the add-on is stopped.

mod config;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::AppConfig;
use noah_core::{ControlLoop, SystemClock};
use noah_ha::{HomeAssistantAdapter, HomeAssistantClient};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Attempts for the one-off timezone lookup at startup
const STARTUP_RETRIES: u32 = 3;

/// Balance Growatt Noah battery output against household consumption
#[derive(Debug, Parser)]
#[command(name = "noah-optimizer", version, about)]
struct Cli {
    /// Configuration file (JSON or TOML). Defaults to /data/options.json,
    /// then config.toml / config.json in the working directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate configuration and entities, then exit without adjusting output
    #[arg(long)]
    validate_only: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (app_config, source) = match AppConfig::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_tracing(DEFAULT_LOG_LEVEL)?;
            error!("Configuration error: {:#}", e);
            return Err(e);
        }
    };

    let log_level = tracing_level(&app_config.log_level);
    init_tracing(log_level.unwrap_or(DEFAULT_LOG_LEVEL))?;
    if log_level.is_none() {
        warn!(
            "⚠️ Unknown log_level '{}', using '{}'",
            app_config.log_level, DEFAULT_LOG_LEVEL
        );
    }
    info!("🚀 Starting Noah Output Optimizer {}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration loaded from {}", source);

    let optimizer_config = app_config.to_optimizer_config().inspect_err(|e| {
        error!("Configuration error: {}", e);
    })?;

    let client = Arc::new(connect_home_assistant(&app_config)?);
    if !client.ping().await.unwrap_or(false) {
        warn!("⚠️ Home Assistant API did not answer the health check, continuing anyway");
    }

    // Cycles never retry; only this one-off lookup does
    let startup_client = client
        .as_ref()
        .clone()
        .with_retry_config(STARTUP_RETRIES, Duration::from_millis(500));
    let clock = match startup_client.get_timezone().await {
        Ok(timezone) => SystemClock::with_timezone_name(&timezone),
        Err(e) => {
            warn!(
                "⚠️ Failed to fetch timezone from HA ({}), using host local time",
                e
            );
            SystemClock::local()
        }
    };

    let adapter =
        Arc::new(HomeAssistantAdapter::new(client).with_debug_mode(app_config.debug_mode));
    if adapter.is_debug_mode() {
        info!("🔍 DEBUG MODE: Enabled (output commands are logged, not sent)");
    }

    let control = ControlLoop::initialize(
        optimizer_config,
        adapter.clone(),
        adapter,
        Arc::new(clock),
    )
    .await
    .inspect_err(|e| error!("Error: {}", e))?;

    if cli.validate_only {
        info!("✅ Configuration is valid");
        return Ok(());
    }

    let control = &control;
    let runs = scheduler::run_every(
        control.config().adjustment_interval(),
        shutdown_signal(),
        move || control.run_cycle(),
    )
    .await;

    info!("Noah Output Optimizer stopped after {} cycle(s)", runs);
    Ok(())
}

/// Map a configured log level onto a tracing level directive.
/// Accepts the add-on's level names (`warning`, `critical`) in any case
fn tracing_level(log_level: &str) -> Option<&'static str> {
    match log_level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" | "fatal" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

/// Initialize tracing with env filter support.
/// RUST_LOG wins over the configured log level
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn connect_home_assistant(config: &AppConfig) -> Result<HomeAssistantClient> {
    let client = if std::env::var("SUPERVISOR_TOKEN").is_ok() {
        info!("🏠 Initializing HA client using Supervisor API...");
        HomeAssistantClient::from_supervisor()?
    } else {
        info!("🏠 Initializing HA client from configuration...");
        HomeAssistantClient::from_config(config.ha_base_url.clone(), config.ha_token.clone())?
    };
    Ok(client)
}

/// Resolves on Ctrl-C or SIGTERM (sent by the Supervisor when stopping the add-on)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received"),
        () = terminate => info!("SIGTERM received"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_level_accepts_tracing_names() {
        for level in ["trace", "debug", "info", "warn", "error", "off"] {
            assert_eq!(tracing_level(level), Some(level));
        }
    }

    #[test]
    fn test_tracing_level_maps_addon_names() {
        assert_eq!(tracing_level("warning"), Some("warn"));
        assert_eq!(tracing_level("WARNING"), Some("warn"));
        assert_eq!(tracing_level("critical"), Some("error"));
        assert_eq!(tracing_level(" Info "), Some("info"));
    }

    #[test]
    fn test_tracing_level_rejects_unknown() {
        assert_eq!(tracing_level("verbose"), None);
        assert_eq!(tracing_level(""), None);
        assert_eq!(tracing_level("noah_core=debug"), None);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "noah-optimizer",
            "--config",
            "/tmp/options.json",
            "--validate-only",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/options.json")));
        assert!(cli.validate_only);
    }
}
