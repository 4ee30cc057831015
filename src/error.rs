//! Error types shared across the pipeline services.

use thiserror::Error;

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, ColdchainError>;

/// Top-level error taxonomy.
///
/// Variants map onto the handling disciplines of the consumer loops:
/// transport errors leave deliveries unacknowledged, decode errors mark
/// a delivery as poison, and domain errors are logged and acknowledged
/// so a bad aggregate mutation cannot block the queue head.
#[derive(Debug, Error)]
pub enum ColdchainError {
    /// Invalid or missing configuration; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Broker connectivity or I/O failure; transient
    #[error("transport error: {0}")]
    Transport(String),

    /// Payload could not be decoded; the delivery is poison
    #[error("decode error: {0}")]
    Decode(String),

    /// A domain rule rejected the mutation
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Event publish failed after any applicable recovery
    #[error("publish error: {0}")]
    Publish(String),

    /// Aggregate repository failure
    #[error("repository error: {0}")]
    Repository(String),

    /// Graceful shutdown did not complete in time
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

impl ColdchainError {
    /// Whether the consumer should requeue the delivery that produced
    /// this error. Only transport-level failures are worth retrying;
    /// everything else either cannot be repaired by redelivery or has
    /// already been handled.
    pub fn is_requeueable(&self) -> bool {
        matches!(self, ColdchainError::Transport(_) | ColdchainError::Repository(_))
    }
}

impl From<serde_json::Error> for ColdchainError {
    fn from(err: serde_json::Error) -> Self {
        ColdchainError::Decode(err.to_string())
    }
}

/// Violations of aggregate invariants.
///
/// These are terminal for the triggering delivery: the consumer logs at
/// warning level and acknowledges so redelivery cannot repeat the
/// violation forever.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The batch state machine does not permit this transition
    #[error("illegal batch transition from {from} to {to}")]
    IllegalTransition {
        /// Current batch status
        from: String,
        /// Requested batch status
        to: String,
    },

    /// An order's product does not match the batch it was routed to
    #[error("order {order_id} carries product {order_product}, batch {batch_id} expects {batch_product}")]
    ProductMismatch {
        /// Offending order
        order_id: String,
        /// Product on the order
        order_product: String,
        /// Target batch
        batch_id: String,
        /// Product the batch is grouped by
        batch_product: String,
    },

    /// The batch is damaged or terminal and its items are frozen
    #[error("batch {0} is frozen, items cannot be modified")]
    BatchFrozen(String),

    /// No batch item exists for the order
    #[error("order {order_id} is not an item of batch {batch_id}")]
    ItemNotFound {
        /// Order looked up
        order_id: String,
        /// Batch searched
        batch_id: String,
    },

    /// Lookup miss on an aggregate id
    #[error("{kind} {id} not found")]
    NotFound {
        /// Aggregate kind ("order" or "batch")
        kind: &'static str,
        /// Missing id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_requeueable() {
        assert!(ColdchainError::Transport("broker gone".into()).is_requeueable());
        assert!(!ColdchainError::Decode("bad json".into()).is_requeueable());
        assert!(!ColdchainError::Domain(DomainError::BatchFrozen("B-1".into())).is_requeueable());
    }

    #[test]
    fn serde_errors_become_decode() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let converted: ColdchainError = err.into();
        assert!(matches!(converted, ColdchainError::Decode(_)));
    }
}
