//! The reservation state machine: reserve, release, confirm.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use stockbook_core::{Actor, InventoryError, InventoryResult, OrderId, WarehouseId};
use stockbook_events::{
    EventBus, Notifier, StockConfirmed, StockEvent, StockLevel, StockReleased, StockReserved,
};
use stockbook_inventory::{
    InventoryRow, LedgerEntry, Reservation, ReservationLine, ReservationStatus,
};

use crate::audit::{AuditRecord, AuditSink, record_best_effort};
use crate::cache::ReadCache;
use crate::store::ledger_store::append_best_effort;
use crate::store::{LedgerStore, ReservationStore, RowStore};

/// Coordinates all-or-nothing multi-item reservations and their lifecycle.
///
/// The only writer permitted to change `reserved_quantity`. Every public
/// method runs its row mutations as one atomic unit of work; `release` and
/// `confirm` are idempotent because the reservation record's status
/// transition fires exactly once.
pub struct ReservationCoordinator<B> {
    rows: Arc<dyn RowStore>,
    ledger: Arc<dyn LedgerStore>,
    reservations: Arc<dyn ReservationStore>,
    audit: Arc<dyn AuditSink>,
    cache: Arc<dyn ReadCache>,
    notifier: Arc<Notifier<B>>,
}

impl<B> ReservationCoordinator<B>
where
    B: EventBus<StockEvent>,
{
    pub fn new(
        rows: Arc<dyn RowStore>,
        ledger: Arc<dyn LedgerStore>,
        reservations: Arc<dyn ReservationStore>,
        audit: Arc<dyn AuditSink>,
        cache: Arc<dyn ReadCache>,
        notifier: Arc<Notifier<B>>,
    ) -> Self {
        Self {
            rows,
            ledger,
            reservations,
            audit,
            cache,
            notifier,
        }
    }

    /// Reserve stock for every line item of one order, all-or-nothing.
    ///
    /// If any line's available quantity is short, the whole call fails with
    /// `InsufficientStock` naming the offending product and no row is
    /// mutated. On success every touched row's `reserved_quantity` has been
    /// incremented within a single unit of work.
    pub fn reserve(
        &self,
        order_id: OrderId,
        items: &[ReservationLine],
        warehouse_id: Option<WarehouseId>,
        actor: Actor,
    ) -> InventoryResult<Vec<InventoryRow>> {
        let now = Utc::now();
        let reservation = Reservation::new(order_id, warehouse_id, items, now)?;

        if let Some(existing) = self.reservations.get(order_id)? {
            if existing.status != ReservationStatus::Released {
                return Err(InventoryError::invalid_input(format!(
                    "order {order_id} already has a {:?} reservation",
                    existing.status
                )));
            }
        }

        let keys = reservation.keys();
        let lines = reservation.lines.clone();
        let rows = self.rows.update_rows(&keys, &mut |rows| {
            for (row, line) in rows.iter_mut().zip(&lines) {
                row.hold(line.quantity, now)?;
            }
            Ok(())
        })?;

        if let Err(e) = self.reservations.insert(reservation) {
            // A concurrent reserve for the same order won the record insert;
            // give back the holds this call just took.
            if let Err(undo_err) = self.rows.update_rows(&keys, &mut |rows| {
                for (row, line) in rows.iter_mut().zip(&lines) {
                    row.release_hold(line.quantity, now);
                }
                Ok(())
            }) {
                tracing::warn!(
                    %order_id,
                    error = %undo_err,
                    "failed to give back holds after losing the reservation insert"
                );
            }
            return Err(e);
        }

        for (row, line) in rows.iter().zip(&lines) {
            append_best_effort(
                self.ledger.as_ref(),
                LedgerEntry::reserve(row.key, line.quantity, row.quantity, order_id, actor, now),
            );
        }

        record_best_effort(
            self.audit.as_ref(),
            AuditRecord::new(
                "inventory.reserve",
                "Order",
                order_id,
                actor,
                json!({ "items": lines.len() }),
            ),
        );

        for line in &lines {
            self.cache.invalidate(line.product_id);
        }

        self.notifier.publish(StockEvent::Reserved(StockReserved {
            order_id,
            items: lines
                .iter()
                .map(|l| StockLevel {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect(),
        }));

        Ok(rows)
    }

    /// Reverse an order's reservation without deducting stock.
    ///
    /// Idempotent: a missing or already-terminal reservation yields an empty
    /// row list and no state change.
    pub fn release(&self, order_id: OrderId, actor: Actor) -> InventoryResult<Vec<InventoryRow>> {
        let now = Utc::now();
        let Some(reservation) =
            self.reservations
                .transition(order_id, ReservationStatus::Released, now)?
        else {
            return Ok(Vec::new());
        };

        let keys = reservation.keys();
        let rows = match self.rows.update_rows(&keys, &mut |rows| {
            for (row, line) in rows.iter_mut().zip(&reservation.lines) {
                row.release_hold(line.quantity, now);
            }
            Ok(())
        }) {
            Ok(rows) => rows,
            Err(e) => {
                // The status flipped but no hold was given back; put the
                // record back to live so a retry can finish the job.
                self.revert_transition(order_id, now);
                return Err(e);
            }
        };

        for (row, line) in rows.iter().zip(&reservation.lines) {
            append_best_effort(
                self.ledger.as_ref(),
                LedgerEntry::release(row.key, line.quantity, row.quantity, order_id, actor, now),
            );
        }

        record_best_effort(
            self.audit.as_ref(),
            AuditRecord::new(
                "inventory.release",
                "Order",
                order_id,
                actor,
                json!({ "items": reservation.lines.len() }),
            ),
        );

        for line in &reservation.lines {
            self.cache.invalidate(line.product_id);
        }

        self.notifier
            .publish(StockEvent::Released(StockReleased { order_id }));

        Ok(rows)
    }

    /// Convert an order's reservation into a permanent stock deduction.
    ///
    /// Idempotent the same way `release` is.
    pub fn confirm(&self, order_id: OrderId, actor: Actor) -> InventoryResult<()> {
        let now = Utc::now();
        let Some(reservation) =
            self.reservations
                .transition(order_id, ReservationStatus::Confirmed, now)?
        else {
            return Ok(());
        };

        let keys = reservation.keys();
        let mut consumed = Vec::with_capacity(reservation.lines.len());
        if let Err(e) = self.rows.update_rows(&keys, &mut |rows| {
            consumed.clear();
            for (row, line) in rows.iter_mut().zip(&reservation.lines) {
                consumed.push(row.consume_hold(line.quantity, now));
            }
            Ok(())
        }) {
            // The status flipped but no stock was deducted; put the record
            // back to live so a retry can finish the job.
            self.revert_transition(order_id, now);
            return Err(e);
        }

        for ((key, line), result) in keys.iter().zip(&reservation.lines).zip(&consumed) {
            append_best_effort(
                self.ledger.as_ref(),
                LedgerEntry::confirm(
                    *key,
                    line.quantity,
                    result.previous_stock,
                    result.new_stock,
                    order_id,
                    actor,
                    now,
                ),
            );
        }

        record_best_effort(
            self.audit.as_ref(),
            AuditRecord::new(
                "inventory.confirm",
                "Order",
                order_id,
                actor,
                json!({ "items": reservation.lines.len() }),
            ),
        );

        for line in &reservation.lines {
            self.cache.invalidate(line.product_id);
        }

        self.notifier
            .publish(StockEvent::Confirmed(StockConfirmed { order_id }));

        Ok(())
    }

    /// Reinstate a reservation whose row update failed after its status had
    /// already flipped, so the operation stays retryable.
    fn revert_transition(&self, order_id: OrderId, now: DateTime<Utc>) {
        if let Err(e) = self.reservations.reinstate(order_id, now) {
            tracing::warn!(
                %order_id,
                error = %e,
                "failed to reinstate reservation after row update error"
            );
        }
    }
}
