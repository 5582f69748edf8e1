//! wssh-tunnel
//!
//! Accepts connections that open with a pseudo-HTTP upgrade request, dials the
//! target named in `X-Real-Host`, answers `101 Switching Protocol` and relays
//! raw bytes until either side closes or the connection goes idle.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 WSSH TUNNEL                  │
//!   Client            │  ┌──────────┐   ┌───────────┐   ┌─────────┐  │
//!   ──────────────────┼─▶│ listener │──▶│ handshake │──▶│ policy  │  │
//!                     │  └──────────┘   └───────────┘   └────┬────┘  │
//!                     │                                      ▼       │
//!   Client            │  ┌──────────────────────────┐   ┌─────────┐  │   Target
//!   ◀─────────────────┼──│  relay (idle watchdog)   │◀─▶│  dial   │◀─┼──────────
//!                     │  └──────────────────────────┘   └─────────┘  │
//!                     │                                              │
//!                     │  registry · config · logging · metrics       │
//!                     └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wssh_tunnel::config::{self, TunnelConfig};
use wssh_tunnel::lifecycle::shutdown_signal;
use wssh_tunnel::net::Listener;
use wssh_tunnel::observability::{logging, metrics};
use wssh_tunnel::TunnelServer;

/// How long to wait for force-closed connections to deregister.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "wssh-tunnel")]
#[command(about = "Tunnel raw TCP through a pseudo-HTTP upgrade handshake", long_about = None)]
struct Cli {
    /// Binding address
    #[arg(short = 'b', long = "bind")]
    bind: Option<String>,

    /// Listening port
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Password for authentication
    #[arg(long = "pass")]
    pass: Option<String>,

    /// Default target host:port
    #[arg(short = 't', long = "target")]
    target: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Listening port, as a bare number
    #[arg(value_name = "PORT")]
    listen_port: Option<String>,
}

impl Cli {
    /// Layer flags over the file (or defaults), then validate.
    fn into_config(self) -> Result<TunnelConfig, config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::read_config(path)?,
            None => TunnelConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        // A non-numeric positional is ignored.
        if let Some(port) = self.listen_port.and_then(|p| p.parse::<u16>().ok()) {
            config.listener.port = port;
        }
        if let Some(pass) = self.pass {
            config.auth.password = pass;
        }
        if let Some(target) = self.target {
            config.target.default_host = target;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        config::finalize(config)
    }
}

fn print_banner(config: &TunnelConfig) {
    println!();
    println!(":-------WSSHTunnel-------:");
    println!("Listening addr: {}", config.listener.bind_address);
    println!("Listening port: {}", config.listener.port);
    println!("Default target: {}", config.target.default_host);
    println!(":----------------------:");
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability.log_level);
    print_banner(&config);

    if config.observability.metrics_enabled {
        // Validated already.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    tracing::info!(
        password_required = !config.auth.password.is_empty(),
        idle_timeout_secs = config.timeouts.idle_secs,
        "Configuration loaded"
    );

    let server = Arc::new(TunnelServer::new(config)?);
    let listener = match Listener::bind(&server.config().listener).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Server error");
            return Err(e.into());
        }
    };

    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(listener).await })
    };

    let signal = shutdown_signal().await;
    tracing::info!(signal, "Stopping server...");
    server.close();
    let _ = serving.await;

    if tokio::time::timeout(DRAIN_TIMEOUT, server.drained()).await.is_err() {
        tracing::warn!(
            remaining = server.active_connections(),
            "Connections still open at shutdown deadline"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
