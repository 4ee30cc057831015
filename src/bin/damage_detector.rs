//! Damage detector service binary.

use clap::Parser;
use coldchain::config::DetectorConfig;
use coldchain::detector::{DamageDetector, TemperatureRange, Thresholds};
use coldchain::shutdown::Shutdown;
use coldchain::{service, telemetry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "damage-detector")]
#[command(about = "Detects cold-chain damage from MQTT sensor readings", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.debug && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "debug");
    }
    telemetry::init_tracing("damage-detector", cli.json_logs);

    let config = DetectorConfig::from_env()?;
    let thresholds = Arc::new(Thresholds::new(TemperatureRange::new(
        config.min_temperature,
        config.max_temperature,
    )?));

    let detector = DamageDetector::new(config.clone(), Arc::clone(&thresholds))?;
    let shutdown = Shutdown::new();

    let mut http = tokio::spawn(service::serve(
        service::detector::router(thresholds),
        config.http_port,
        shutdown.clone(),
    ));
    let mut runner = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { detector.run(shutdown).await })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("termination signal received");
            shutdown.trigger();
        }
        result = &mut http => {
            shutdown.trigger();
            result??;
            anyhow::bail!("HTTP server exited unexpectedly");
        }
        result = &mut runner => {
            shutdown.trigger();
            result??;
            anyhow::bail!("detector loop exited unexpectedly");
        }
    }

    if let Err(e) = shutdown.drain(Duration::from_secs(2)).await {
        error!(error = %e, "in-flight messages not drained");
    }
    let _ = tokio::time::timeout(Duration::from_secs(10), async {
        let _ = runner.await;
        let _ = http.await;
    })
    .await;

    info!("damage detector stopped");
    Ok(())
}
