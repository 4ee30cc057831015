//! Order service binary.

use clap::Parser;
use coldchain::config::OrderServiceConfig;
use coldchain::orders::{AmqpOrderEventPublisher, DamageConsumer, OrderAggregator};
use coldchain::repository::InMemoryOrderRepository;
use coldchain::shutdown::Shutdown;
use coldchain::{service, telemetry};
use lapin::{Connection, ConnectionProperties};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "order-service")]
#[command(about = "Maintains the Order aggregate from damage events", long_about = None)]
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
    telemetry::init_tracing("order-service", cli.json_logs);

    let config = OrderServiceConfig::from_env()?;

    let connection = Connection::connect(&config.amqp_url, ConnectionProperties::default())
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to queue broker: {e}"))?;
    info!("connected to queue broker");

    let publisher_channel = connection
        .create_channel()
        .await
        .map_err(|e| anyhow::anyhow!("cannot open publisher channel: {e}"))?;
    let publisher = Arc::new(
        AmqpOrderEventPublisher::declare(
            publisher_channel,
            &config.exchange,
            &config.publisher_queue,
            &config.publisher_key,
        )
        .await?,
    );

    let aggregator = Arc::new(OrderAggregator::new(
        Arc::new(InMemoryOrderRepository::new()),
        publisher,
    ));

    let consumer_channel = connection
        .create_channel()
        .await
        .map_err(|e| anyhow::anyhow!("cannot open consumer channel: {e}"))?;
    DamageConsumer::declare(
        &consumer_channel,
        &config.exchange,
        &config.consumer_queue,
        &config.consumer_key,
    )
    .await?;

    let shutdown = Shutdown::new();

    let mut http = tokio::spawn(service::serve(
        service::orders::router(Arc::clone(&aggregator)),
        config.http_port,
        shutdown.clone(),
    ));
    let mut runner = {
        let shutdown = shutdown.clone();
        let queue = config.consumer_queue.clone();
        let consumer = DamageConsumer::new(aggregator);
        tokio::spawn(async move { consumer.run(consumer_channel, &queue, shutdown).await })
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
            anyhow::bail!("damage consumer exited unexpectedly");
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

    let _ = connection.close(200, "shutting down").await;
    info!("order service stopped");
    Ok(())
}
