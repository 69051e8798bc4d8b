//! Typed stock-change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{OrderId, ProductId, WarehouseId};

/// Payload of `stock.updated`: the row's new levels after a direct adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdated {
    pub product_id: ProductId,
    pub warehouse_id: Option<WarehouseId>,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub at: DateTime<Utc>,
}

/// One line item of a reservation broadcast.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Payload of `inventory.reserved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub order_id: OrderId,
    pub items: Vec<StockLevel>,
}

/// Payload of `inventory.released`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReleased {
    pub order_id: OrderId,
}

/// Payload of `inventory.confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConfirmed {
    pub order_id: OrderId,
}

/// Payload of `inventory.low_stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockFlagged {
    pub product_id: ProductId,
    pub warehouse_id: Option<WarehouseId>,
    pub available: i64,
}

/// Every stock-change notification the engine can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockUpdated(StockUpdated),
    Reserved(StockReserved),
    Released(StockReleased),
    Confirmed(StockConfirmed),
    LowStock(LowStockFlagged),
}

impl StockEvent {
    /// Stable event name, matching what external listeners subscribe to.
    pub fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockUpdated(_) => "stock.updated",
            StockEvent::Reserved(_) => "inventory.reserved",
            StockEvent::Released(_) => "inventory.released",
            StockEvent::Confirmed(_) => "inventory.confirmed",
            StockEvent::LowStock(_) => "inventory.low_stock",
        }
    }
}
