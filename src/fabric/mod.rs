//! Shared event fabric: naming, codecs and broker client construction.
//!
//! Everything that lets the three services interoperate without linking
//! to each other lives here: topic/queue/routing-key constants, the
//! JSON codec helpers, and the Kafka client factories with the delivery
//! discipline the pipeline relies on (manual ack, synchronous produce).

mod codec;
mod kafka;
pub mod topics;

pub use codec::{decode, encode, rfc3339};
pub use kafka::{create_consumer, create_producer, PRODUCE_TIMEOUT};
