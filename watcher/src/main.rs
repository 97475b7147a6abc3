mod control;
mod detector;
mod diagnostics;
mod sink;
mod source;
#[cfg(test)]
mod testing;

use control::{run_control_loop, StopFlag};
use diagnostics::Diagnostics;
use fridger_common::config::Config;
use sink::Sinks;
use source::{CameraSource, CaptureError};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        mode = config.camera.mode,
        width = config.camera.width,
        height = config.camera.height,
        threshold = config.detector.brightness_threshold,
        capacity = config.detector.buffer_capacity,
        cooldown_secs = config.detector.cooldown_delay_secs,
        rank = config.detector.selection_rank,
        "starting fridger"
    );

    let detector = &config.detector;
    if detector.selection_rank < 1 || detector.selection_rank >= detector.buffer_capacity {
        warn!(
            rank = detector.selection_rank,
            capacity = detector.buffer_capacity,
            "selection rank is out of range; every selection attempt will fail"
        );
    }

    let mut source = match CameraSource::from_config(&config.camera) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open camera source");
            std::process::exit(1);
        }
    };

    let sinks = match Sinks::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to set up frame sinks");
            std::process::exit(1);
        }
    };

    let diagnostics = Diagnostics::from_config(&config.output);

    let stop = StopFlag::new();
    tokio::spawn(wait_for_shutdown(stop.clone()));

    info!("entering control loop");
    match run_control_loop(&mut source, &sinks, &diagnostics, &config.detector, &stop).await {
        Ok(_) => info!("shut down cleanly"),
        Err(CaptureError::Exhausted) => info!("frame source exhausted, shutting down"),
        Err(e) => {
            error!(error = %e, "frame capture failed, shutting down");
            std::process::exit(1);
        }
    }
}

/// Raise the stop flag on Ctrl-C or, on unix, SIGTERM.
async fn wait_for_shutdown(stop: StopFlag) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = signal_or_pending(tokio::signal::ctrl_c(), "SIGINT") => info!("received SIGINT"),
                    _ = term.recv() => info!("received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl-C only");
                signal_or_pending(tokio::signal::ctrl_c(), "SIGINT").await;
                info!("received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        signal_or_pending(tokio::signal::ctrl_c(), "Ctrl-C").await;
        info!("received Ctrl-C");
    }
    stop.request_stop();
}

/// Resolves when the signal arrives. A listener that fails to install never
/// resolves, so it cannot be mistaken for a shutdown request.
async fn signal_or_pending<F>(listener: F, name: &str)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        warn!(error = %e, signal = name, "failed to listen for signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_signal_listener_never_resolves() {
        let failed = std::future::ready(Err(std::io::Error::other("no signal driver")));
        let waited =
            tokio::time::timeout(Duration::from_millis(50), signal_or_pending(failed, "SIGINT")).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn delivered_signal_resolves() {
        let delivered = std::future::ready(Ok(()));
        let waited =
            tokio::time::timeout(Duration::from_millis(50), signal_or_pending(delivered, "SIGINT")).await;
        assert!(waited.is_ok());
    }
}
