//! Warehouse batch service binary.

use clap::Parser;
use coldchain::config::BatchServiceConfig;
use coldchain::repository::InMemoryBatchRepository;
use coldchain::shutdown::Shutdown;
use coldchain::warehouse::{BatchAggregator, KafkaBatchEventPublisher, OrderEventConsumer};
use coldchain::{fabric, service, telemetry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "batch-service")]
#[command(about = "Maintains warehouse batches from order lifecycle events", long_about = None)]
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
    telemetry::init_tracing("batch-service", cli.json_logs);

    let config = BatchServiceConfig::from_env()?;

    let repository: Arc<dyn coldchain::repository::BatchRepository> =
        Arc::new(InMemoryBatchRepository::new());
    let publisher = Arc::new(KafkaBatchEventPublisher::new(
        &config.kafka_brokers,
        &config.output_topic,
    )?);
    let aggregator = Arc::new(BatchAggregator::new(Arc::clone(&repository), publisher));

    let kafka_consumer = fabric::create_consumer(
        &config.kafka_brokers,
        &config.consumer_group,
        &config.input_topic,
    )?;
    let consumer = OrderEventConsumer::new(kafka_consumer, aggregator);

    let shutdown = Shutdown::new();

    let mut http = tokio::spawn(service::serve(
        service::warehouse::router(repository),
        config.http_port,
        shutdown.clone(),
    ));
    let mut runner = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { consumer.run(shutdown).await })
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
            anyhow::bail!("order event consumer exited unexpectedly");
        }
    }

    if let Err(e) = shutdown.drain(Duration::from_secs(2)).await {
        error!(error = %e, "in-flight deliveries not drained");
    }
    let _ = tokio::time::timeout(Duration::from_secs(10), async {
        let _ = runner.await;
        let _ = http.await;
    })
    .await;

    info!("batch service stopped");
    Ok(())
}
