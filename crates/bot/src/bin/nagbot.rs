//! nagbot — relays Nagios notifications received over UDP into IRC channels.
//!
//! # Usage
//!
//! ```bash
//! # Config from config/nagbot.toml (default)
//! nagbot
//!
//! # Explicit config and listen port
//! nagbot --config /etc/nagbot.toml --listen-port 3843
//!
//! # Validate the config and exit
//! nagbot --check-config
//!
//! # Override the server via environment
//! NAGBOT_IRC_SERVER=irc.example.net nagbot
//! ```

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Notify;

use nagbot::{Config, ConfigError, Relay};

/// Nagios → IRC alert relay.
#[derive(Parser, Debug)]
#[command(name = "nagbot", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "NAGBOT_CONFIG", default_value = "config/nagbot.toml")]
    config: PathBuf,

    /// UDP port for incoming alerts (overrides `listener.port`).
    #[arg(long)]
    listen_port: Option<u16>,

    /// Load and validate the config, then exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(?cli, "starting nagbot");

    let mut config = load_config(&cli)?;
    if let Some(port) = cli.listen_port {
        config.listener.port = port;
        config.validate().context("invalid --listen-port")?;
    }

    if cli.check_config {
        tracing::info!(
            server = %config.irc.server,
            port = config.irc.port,
            nickname = %config.irc.nickname,
            channels = ?config.channels.keys().collect::<Vec<_>>(),
            listen = %config.listener.socket_addr(),
            "config OK"
        );
        return Ok(());
    }

    let shutdown = Arc::new(Notify::new());
    let handle = Relay::new(config)
        .start(shutdown.clone())
        .await
        .context("failed to start relay")?;
    tracing::info!(listen = %handle.listen_addr(), "relay running");

    shutdown_signal().await;
    tracing::info!("shutdown signal received");
    shutdown.notify_waiters();

    handle.wait().await;
    tracing::info!("nagbot exited cleanly");
    Ok(())
}

/// Load the config file; a missing file falls back to defaults plus environment.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match Config::from_file(&cli.config) {
        Ok(config) => {
            tracing::info!(path = %cli.config.display(), "loaded config");
            Ok(config)
        }
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(
                path = %cli.config.display(),
                "config file not found, using defaults"
            );
            Config::from_toml("").context("default config is invalid")
        }
        Err(e) => {
            Err(e).with_context(|| format!("failed to load {}", cli.config.display()))
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            tracing::warn!(error = %e, "failed to listen for ctrl_c");
        }
    }
}
