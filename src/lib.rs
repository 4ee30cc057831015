//! Event-driven cold-chain pipeline.
//!
//! The crate hosts three cooperating services that turn simulated IoT
//! sensor readings into warehouse-visible order and batch state:
//!
//! - the **damage detector** subscribes to raw sensor readings over MQTT,
//!   applies a configurable temperature threshold, and emits
//!   `order.damage` events to MQTT and Kafka;
//! - the **order service** consumes damage events from RabbitMQ,
//!   maintains the [`domain::Order`] aggregate, and republishes
//!   `order.*` lifecycle events;
//! - the **batch service** consumes order lifecycle events from Kafka,
//!   maintains the [`domain::Batch`] aggregate, and emits `batch.*`
//!   events through a self-healing Kafka publisher.
//!
//! # Example
//!
//! ```no_run
//! use coldchain::config::BatchServiceConfig;
//! use coldchain::repository::InMemoryBatchRepository;
//! use coldchain::warehouse::{BatchAggregator, KafkaBatchEventPublisher};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = BatchServiceConfig::from_env()?;
//! let repository = Arc::new(InMemoryBatchRepository::new());
//! let publisher = Arc::new(KafkaBatchEventPublisher::new(
//!     &config.kafka_brokers,
//!     &config.output_topic,
//! )?);
//! let aggregator = BatchAggregator::new(repository, publisher);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

// Re-export commonly used items
pub use error::{ColdchainError, Result};

/// Error types
pub mod error;

/// Process-wide service configuration
pub mod config;

/// Tracing subscriber setup
pub mod telemetry;

/// Graceful shutdown coordination
pub mod shutdown;

/// Domain aggregates and event payloads
pub mod domain;

/// Shared event fabric: topics, codecs, Kafka client construction
pub mod fabric;

/// Aggregate repositories
pub mod repository;

/// Damage detector (MQTT ingest)
pub mod detector;

/// Order aggregator (RabbitMQ ingest)
pub mod orders;

/// Warehouse batch aggregator (Kafka ingest)
pub mod warehouse;

/// HTTP surfaces for the three services
pub mod service;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
