//! Low-stock scanning and notification.

use std::sync::Arc;

use serde_json::json;

use stockbook_core::{Actor, InventoryResult};
use stockbook_events::{EventBus, LowStockFlagged, Notifier, StockEvent};
use stockbook_inventory::InventoryRow;

use crate::audit::{AuditRecord, AuditSink, record_best_effort};
use crate::store::RowStore;

/// Scans for rows at or below their low-stock threshold.
///
/// Read-only with respect to inventory: runs on a schedule or on demand
/// after mutations, never competes for write locks.
pub struct LowStockMonitor<B> {
    rows: Arc<dyn RowStore>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<Notifier<B>>,
}

impl<B> LowStockMonitor<B>
where
    B: EventBus<StockEvent>,
{
    pub fn new(
        rows: Arc<dyn RowStore>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<Notifier<B>>,
    ) -> Self {
        Self {
            rows,
            audit,
            notifier,
        }
    }

    /// Every row with `available <= low_stock_threshold` (inclusive bound).
    pub fn scan(&self) -> InventoryResult<Vec<InventoryRow>> {
        let mut flagged: Vec<InventoryRow> = self
            .rows
            .list_all()?
            .into_iter()
            .filter(InventoryRow::is_low_stock)
            .collect();
        flagged.sort_by_key(|r| *r.key.product_id.as_uuid());
        Ok(flagged)
    }

    /// Scan and notify: one `inventory.low_stock` event and one audit record
    /// per flagged row.
    pub fn check_and_notify(&self) -> InventoryResult<Vec<InventoryRow>> {
        let flagged = self.scan()?;

        for row in &flagged {
            self.notifier.publish(StockEvent::LowStock(LowStockFlagged {
                product_id: row.key.product_id,
                warehouse_id: row.key.warehouse_id,
                available: row.available(),
            }));

            record_best_effort(
                self.audit.as_ref(),
                AuditRecord::new(
                    "inventory.low_stock",
                    "Product",
                    row.key.product_id,
                    Actor::system(),
                    json!({
                        "available": row.available(),
                        "threshold": row.low_stock_threshold,
                    }),
                ),
            );
        }

        Ok(flagged)
    }
}
