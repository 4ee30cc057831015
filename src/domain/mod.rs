//! Domain aggregates and the events that move between services.
//!
//! Ownership is strict: `Order` is mutated only by the order service,
//! `Batch` only by the batch service. Every other component sees
//! immutable snapshots embedded in events.

mod batch;
mod damage;
mod order;
mod sensor;

pub use batch::{item_status, Batch, BatchEvent, BatchItem, BatchStatus, ItemChange};
pub use damage::{DamageDetails, DamageEvent, Severity};
pub use order::{order_status, Order, OrderEvent};
pub use sensor::SensorReading;
