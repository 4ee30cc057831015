//! The order service: damage event consumption, Order aggregate
//! ownership, lifecycle event publication.

mod aggregator;
mod consumer;
mod delivery;
mod publisher;

pub use aggregator::OrderAggregator;
pub use consumer::DamageConsumer;
pub use delivery::DamageDelivery;
pub use publisher::{AmqpOrderEventPublisher, OrderEventPublisher};
