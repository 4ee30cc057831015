//! Mapping from order lifecycle events to warehouse actions.

use std::fmt;

/// The closed set of actions the batch service derives from incoming
/// order event types. Event types outside the mapping are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseAction {
    /// `order.created`: add or update the order's batch item
    AllocateInventory,
    /// `order.cancelled`: remove the item, deleting an emptied batch
    ReleaseInventory,
    /// `order.shipped`: item status to `shipped`
    UpdateInventory,
    /// `order.delivered`: item status to `delivered`
    ConfirmDelivery,
    /// `order.returned`: item to `returned` plus a `-return` item
    ProcessReturn,
    /// `order.damage_processed`: apply the damage sub-rules
    ProcessDamage,
    /// `order.inventory_allocated`: item status to `allocation_confirmed`
    ConfirmAllocation,
    /// `order.inventory_released`: item status to `release_confirmed`
    ConfirmRelease,
}

impl WarehouseAction {
    /// Map an order event type onto its action, `None` for event types
    /// the warehouse does not react to.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "order.created" => Some(WarehouseAction::AllocateInventory),
            "order.cancelled" => Some(WarehouseAction::ReleaseInventory),
            "order.shipped" => Some(WarehouseAction::UpdateInventory),
            "order.delivered" => Some(WarehouseAction::ConfirmDelivery),
            "order.returned" => Some(WarehouseAction::ProcessReturn),
            "order.damage_processed" => Some(WarehouseAction::ProcessDamage),
            "order.inventory_allocated" => Some(WarehouseAction::ConfirmAllocation),
            "order.inventory_released" => Some(WarehouseAction::ConfirmRelease),
            _ => None,
        }
    }

    /// Snake-case action name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseAction::AllocateInventory => "allocate_inventory",
            WarehouseAction::ReleaseInventory => "release_inventory",
            WarehouseAction::UpdateInventory => "update_inventory",
            WarehouseAction::ConfirmDelivery => "confirm_delivery",
            WarehouseAction::ProcessReturn => "process_return",
            WarehouseAction::ProcessDamage => "process_damage",
            WarehouseAction::ConfirmAllocation => "confirm_allocation",
            WarehouseAction::ConfirmRelease => "confirm_release",
        }
    }
}

impl fmt::Display for WarehouseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
