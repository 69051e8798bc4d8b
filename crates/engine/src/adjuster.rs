//! Direct stock adjustments (restocking, corrections, write-offs).

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use stockbook_core::{Actor, InventoryError, InventoryResult, ProductId, RowKey, WarehouseId};
use stockbook_events::{EventBus, Notifier, StockEvent, StockUpdated};
use stockbook_inventory::{AdjustMode, InventoryRow, LedgerEntry};

use crate::audit::{AuditRecord, AuditSink, record_best_effort};
use crate::cache::ReadCache;
use crate::store::ledger_store::append_best_effort;
use crate::store::{LedgerStore, RowStore};

/// Attribution and free-text reason for an adjustment.
#[derive(Debug, Clone, Default)]
pub struct AdjustMeta {
    pub reason: Option<String>,
    pub actor: Actor,
}

/// The only writer permitted to change `quantity` outside of confirm-time
/// deduction.
pub struct StockAdjuster<B> {
    rows: Arc<dyn RowStore>,
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditSink>,
    cache: Arc<dyn ReadCache>,
    notifier: Arc<Notifier<B>>,
}

impl<B> StockAdjuster<B>
where
    B: EventBus<StockEvent>,
{
    pub fn new(
        rows: Arc<dyn RowStore>,
        ledger: Arc<dyn LedgerStore>,
        audit: Arc<dyn AuditSink>,
        cache: Arc<dyn ReadCache>,
        notifier: Arc<Notifier<B>>,
    ) -> Self {
        Self {
            rows,
            ledger,
            audit,
            cache,
            notifier,
        }
    }

    /// Apply a set/increment/decrement to one row, creating it if needed.
    ///
    /// A decrement below zero clamps to 0 (logged); one ledger entry and a
    /// `stock.updated` notification accompany the change.
    pub fn adjust(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        amount: i64,
        mode: AdjustMode,
        meta: AdjustMeta,
    ) -> InventoryResult<InventoryRow> {
        let key = RowKey::new(product_id, warehouse_id);
        let now = Utc::now();

        let mut applied = None;
        let rows = self.rows.update_rows(&[key], &mut |rows| {
            applied = Some(rows[0].apply_adjust(mode, amount, now)?);
            Ok(())
        })?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| InventoryError::store("row store returned empty batch"))?;
        let applied =
            applied.ok_or_else(|| InventoryError::store("adjustment result not captured"))?;

        if applied.clamped {
            tracing::warn!(
                %key,
                previous = applied.previous_stock,
                amount,
                "decrement clamped at zero; possible over-deduction upstream"
            );
        }

        append_best_effort(
            self.ledger.as_ref(),
            LedgerEntry::adjustment(
                key,
                applied.transaction_type,
                amount,
                applied.previous_stock,
                applied.new_stock,
                meta.reason.clone(),
                meta.actor,
                now,
            ),
        );

        record_best_effort(
            self.audit.as_ref(),
            AuditRecord::new(
                "inventory.update",
                "Product",
                product_id,
                meta.actor,
                json!({
                    "warehouse_id": warehouse_id,
                    "mode": mode,
                    "amount": amount,
                    "previous": applied.previous_stock,
                    "next": applied.new_stock,
                }),
            ),
        );

        self.cache.invalidate(product_id);

        self.notifier.publish(StockEvent::StockUpdated(StockUpdated {
            product_id,
            warehouse_id,
            quantity: row.quantity,
            reserved_quantity: row.reserved_quantity,
            at: now,
        }));

        Ok(row)
    }
}
