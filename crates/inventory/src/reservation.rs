use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{InventoryError, OrderId, ProductId, RowKey, WarehouseId};

/// Reservation lifecycle: `Reserved` is the only live state; `Released` and
/// `Confirmed` are terminal. Releasing or confirming a terminal reservation
/// is a no-op.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Released,
    Confirmed,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReservationStatus::Reserved)
    }
}

/// One reserved line item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// First-class per-order reservation record.
///
/// Holds direct references to its line items so release/confirm do not need
/// to reconstruct intent from ledger notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub order_id: OrderId,
    pub warehouse_id: Option<WarehouseId>,
    pub lines: Vec<ReservationLine>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Validate and build a live reservation. Rejects empty item lists and
    /// non-positive quantities; duplicate product lines are coalesced so one
    /// row is held exactly once per order.
    pub fn new(
        order_id: OrderId,
        warehouse_id: Option<WarehouseId>,
        items: &[ReservationLine],
        now: DateTime<Utc>,
    ) -> Result<Self, InventoryError> {
        if items.is_empty() {
            return Err(InventoryError::invalid_input(
                "reservation requires at least one item",
            ));
        }

        let mut lines: Vec<ReservationLine> = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(InventoryError::invalid_input(format!(
                    "reserve quantity must be positive for product {}",
                    item.product_id
                )));
            }
            match lines.iter_mut().find(|l| l.product_id == item.product_id) {
                Some(existing) => existing.quantity += item.quantity,
                None => lines.push(*item),
            }
        }

        Ok(Self {
            order_id,
            warehouse_id,
            lines,
            status: ReservationStatus::Reserved,
            created_at: now,
            updated_at: now,
        })
    }

    /// Row keys touched by this reservation, in line order.
    pub fn keys(&self) -> Vec<RowKey> {
        self.lines
            .iter()
            .map(|l| RowKey::new(l.product_id, self.warehouse_id))
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
