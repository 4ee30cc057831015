//! The Order aggregate and its lifecycle events.

use super::damage::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed vocabulary of order statuses.
///
/// Statuses travel as free-form strings on the wire; the constants here
/// are the only values the pipeline itself produces.
pub mod order_status {
    /// Created through the HTTP API, not yet processed
    pub const PENDING: &str = "pending";
    /// Minor damage recorded
    pub const DAMAGE_DETECTED_MINOR: &str = "damage_detected_minor";
    /// Major damage recorded
    pub const DAMAGE_DETECTED_MAJOR: &str = "damage_detected_major";
    /// Critical damage, order cancelled
    pub const CANCELLED_DAMAGE: &str = "cancelled_damage";
    /// Damage event carried an unrecognized severity
    pub const DAMAGE_DETECTED_UNKNOWN: &str = "damage_detected_unknown";

    /// Map a damage severity onto the order status it forces.
    pub fn for_severity(severity: super::Severity) -> &'static str {
        match severity {
            super::Severity::Minor => DAMAGE_DETECTED_MINOR,
            super::Severity::Major => DAMAGE_DETECTED_MAJOR,
            super::Severity::Critical => CANCELLED_DAMAGE,
            super::Severity::Unknown => DAMAGE_DETECTED_UNKNOWN,
        }
    }
}

/// A customer order, owned exclusively by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id; for damage-synthesized orders this is the reading id
    pub id: String,
    /// Owning customer, `unknown` when synthesized from damage
    pub customer_id: String,
    /// Product the order is for, `unknown` when synthesized
    pub product_id: String,
    /// Ordered quantity, at least 1
    pub quantity: u32,
    /// Current lifecycle status (see [`order_status`])
    pub status: String,
    /// Order value, non-negative
    pub total_amount: f64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an order through the API path.
    pub fn new(
        id: String,
        customer_id: String,
        product_id: String,
        quantity: u32,
        total_amount: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            customer_id,
            product_id,
            quantity: quantity.max(1),
            status: order_status::PENDING.to_string(),
            total_amount: total_amount.max(0.0),
            created_at: now,
            updated_at: now,
        }
    }

    /// Synthesize a placeholder order for a damage event that references
    /// an id the service has never seen.
    pub fn synthesized(order_id: &str, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: order_id.to_string(),
            customer_id: "unknown".to_string(),
            product_id: "unknown".to_string(),
            quantity: 1,
            status: order_status::PENDING.to_string(),
            total_amount: 0.0,
            created_at: occurred_at,
            updated_at: Utc::now(),
        }
    }

    /// Apply a damage severity, moving the order to the mapped status.
    pub fn apply_damage(&mut self, severity: Severity) {
        self.status = order_status::for_severity(severity).to_string();
        self.updated_at = Utc::now();
    }

    /// Set an explicit status (API update path).
    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.updated_at = Utc::now();
    }
}

/// Lifecycle event published after any successful order mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    /// `order.created`, `order.updated` or `order.damage_processed`
    pub event_type: String,
    /// Order the event is scoped to
    pub order_id: String,
    /// Snapshot of the order after the mutation
    pub order: Order,
    /// Publish time
    pub timestamp: DateTime<Utc>,
}

impl OrderEvent {
    /// Event type for orders created through the API.
    pub const CREATED: &'static str = "order.created";
    /// Event type for status updates through the API.
    pub const UPDATED: &'static str = "order.updated";
    /// Event type for damage-driven mutations.
    pub const DAMAGE_PROCESSED: &'static str = "order.damage_processed";

    /// Wrap an order snapshot into a lifecycle event.
    pub fn new(event_type: &str, order: Order) -> Self {
        Self {
            event_type: event_type.to_string(),
            order_id: order.id.clone(),
            order,
            timestamp: Utc::now(),
        }
    }
}
