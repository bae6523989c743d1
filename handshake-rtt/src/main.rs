#![forbid(unsafe_code)]
// Packet capture uses AF_PACKET sockets: Linux only.

use clap::Parser;
use handshake_rtt_lib::config::{load_from_path, validate, Config};
use handshake_rtt_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use handshake_rtt_lib::{export, ConnectionTable, CorrelationEngine, DecodedPacket, RttError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Passive TCP handshake RTT measurement")]
struct Cli {
    /// Path to configuration TOML file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Networking interface to monitor
    #[arg(long, value_name = "IFACE")]
    iface: Option<String>,

    /// Port to monitor for TCP handshakes (0 = any)
    #[arg(long)]
    port: Option<u16>,

    /// This host is the initiator of the measured TCP handshakes
    #[arg(long)]
    client_side: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(
        &cfg.logging.level,
        cfg.logging.show_target,
        &cfg.telemetry.otel_log_level,
    ) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    info!(
        interface = %cfg.capture.interface,
        port = cfg.capture.port,
        client_side = cfg.correlation.client_side,
        "configuration loaded"
    );

    if let Err(err) = run(cfg).await {
        error!(%err, "handshake RTT measurement exited with error");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config, RttError> {
    let mut cfg = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => Config::default(),
    };
    if let Some(iface) = &cli.iface {
        cfg.capture.interface = iface.clone();
    }
    if let Some(port) = cli.port {
        cfg.capture.port = port;
    }
    if cli.client_side {
        cfg.correlation.client_side = true;
    }
    validate(&cfg)?;
    Ok(cfg)
}

async fn run(cfg: Config) -> Result<(), RttError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let table = Arc::new(ConnectionTable::<DecodedPacket>::new(cfg.correlation.expiry()));
    let mut engine = CorrelationEngine::new(table.clone(), cfg.correlation.vantage());

    let mut observability = None;
    if let Some(port) = cfg.telemetry.metrics_port {
        let (metrics, registry) = init_metrics()?;
        engine = engine.with_metrics(metrics);
        let shutdown = shutdown_rx.clone();
        observability = Some(tokio::spawn(async move {
            if let Err(err) = start_observability_server(port, registry, shutdown).await {
                warn!(%err, "observability server exited with error");
            }
        }));
    }

    let (tx, mut rx) = mpsc::channel(cfg.capture.channel_capacity);
    let mut capture = handshake_rtt_lib::capture::spawn_capture(&cfg.capture, tx)?;

    // Single sequential consumer: capture order is preserved per connection.
    let consumer = tokio::spawn(async move {
        while let Some(packet) = rx.recv().await {
            if let Err(err) = engine.process(packet) {
                debug!(error_type = err.kind(), %err, "dropped packet");
            }
        }
    });

    let captured = tokio::select! {
        signal = wait_for_shutdown() => {
            signal?;
            capture.stop();
            capture.finished().await
        }
        ended = capture.finished() => {
            warn!("capture ended before shutdown was requested");
            ended
        }
    };
    let _ = shutdown_tx.send(true);

    match &captured {
        Ok(forwarded) => info!(forwarded, "capture finished"),
        Err(err) => error!(%err, "capture failed"),
    }
    if let Err(err) = consumer.await {
        warn!(%err, "correlation consumer failed");
    }
    if let Some(task) = observability {
        let _ = task.await;
    }

    export::export_samples(&cfg.export, &table.drain_samples())?;
    captured.map(|_| ())
}

async fn wait_for_shutdown() -> Result<(), RttError> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
    }
    Ok(())
}
