//! The external surface consumed by the (out-of-scope) HTTP/admin layer.

use std::sync::Arc;

use serde::Serialize;

use stockbook_core::{Actor, InventoryError, InventoryResult, OrderId, ProductId, WarehouseId};
use stockbook_events::{EventBus, InMemoryEventBus, Notifier, StockEvent, Subscription};
use stockbook_inventory::{AdjustMode, InventoryRow, ReservationLine};

use crate::adjuster::{AdjustMeta, StockAdjuster};
use crate::audit::{AuditSink, InMemoryAuditSink};
use crate::cache::{NoopCache, ReadCache};
use crate::coordinator::ReservationCoordinator;
use crate::monitor::LowStockMonitor;
use crate::store::{
    InMemoryLedgerStore, InMemoryReservationStore, InMemoryRowStore, LedgerStore,
    ReservationStore, RowStore,
};

/// Per-product aggregate across warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub rows: Vec<InventoryRow>,
    pub total: i64,
    pub reserved: i64,
    pub available: i64,
}

/// Facade wiring the adjuster, coordinator and monitor over one set of
/// stores. All collaborators are injected; `in_memory()` builds a fully
/// self-contained instance for tests and embedding.
pub struct InventoryService<B> {
    adjuster: StockAdjuster<B>,
    coordinator: ReservationCoordinator<B>,
    monitor: LowStockMonitor<B>,
    rows: Arc<dyn RowStore>,
    bus: Arc<B>,
}

impl InventoryService<InMemoryEventBus<StockEvent>> {
    /// Engine backed entirely by in-memory stores, a no-op cache and an
    /// in-memory bus.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRowStore::new()),
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryReservationStore::new()),
            Arc::new(InMemoryAuditSink::new()),
            Arc::new(NoopCache),
            Arc::new(InMemoryEventBus::new()),
        )
    }
}

impl<B> InventoryService<B>
where
    B: EventBus<StockEvent>,
{
    pub fn new(
        rows: Arc<dyn RowStore>,
        ledger: Arc<dyn LedgerStore>,
        reservations: Arc<dyn ReservationStore>,
        audit: Arc<dyn AuditSink>,
        cache: Arc<dyn ReadCache>,
        bus: Arc<B>,
    ) -> Self {
        let notifier = Arc::new(Notifier::new(bus.clone()));
        Self {
            adjuster: StockAdjuster::new(
                rows.clone(),
                ledger.clone(),
                audit.clone(),
                cache.clone(),
                notifier.clone(),
            ),
            coordinator: ReservationCoordinator::new(
                rows.clone(),
                ledger,
                reservations,
                audit.clone(),
                cache,
                notifier.clone(),
            ),
            monitor: LowStockMonitor::new(rows.clone(), audit, notifier),
            rows,
            bus,
        }
    }

    /// Subscribe to the engine's stock-change events.
    pub fn subscribe(&self) -> Subscription<StockEvent> {
        self.bus.subscribe()
    }

    pub fn adjust_stock(
        &self,
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        quantity: i64,
        mode: AdjustMode,
        meta: AdjustMeta,
    ) -> InventoryResult<InventoryRow> {
        self.adjuster
            .adjust(product_id, warehouse_id, quantity, mode, meta)
    }

    pub fn reserve_stock(
        &self,
        order_id: OrderId,
        items: &[ReservationLine],
        warehouse_id: Option<WarehouseId>,
        actor: Actor,
    ) -> InventoryResult<Vec<InventoryRow>> {
        self.coordinator.reserve(order_id, items, warehouse_id, actor)
    }

    pub fn release_reserved(
        &self,
        order_id: OrderId,
        actor: Actor,
    ) -> InventoryResult<Vec<InventoryRow>> {
        self.coordinator.release(order_id, actor)
    }

    pub fn confirm_reduction(&self, order_id: OrderId, actor: Actor) -> InventoryResult<()> {
        self.coordinator.confirm(order_id, actor)
    }

    /// Aggregate one product's stock across warehouses.
    ///
    /// `NotFound` when the product has no inventory rows at all.
    pub fn get_inventory(&self, product_id: ProductId) -> InventoryResult<InventorySummary> {
        let rows = self.rows.list_product(product_id)?;
        if rows.is_empty() {
            return Err(InventoryError::not_found());
        }

        let total: i64 = rows.iter().map(|r| r.quantity).sum();
        let reserved: i64 = rows.iter().map(|r| r.reserved_quantity).sum();

        Ok(InventorySummary {
            rows,
            total,
            reserved,
            available: total - reserved,
        })
    }

    /// Every row, most recently updated first.
    pub fn list_inventory(&self) -> InventoryResult<Vec<InventoryRow>> {
        let mut rows = self.rows.list_all()?;
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    /// Rows at or below their low-stock threshold.
    pub fn list_low_stock(&self) -> InventoryResult<Vec<InventoryRow>> {
        self.monitor.scan()
    }

    /// Scan for low stock and broadcast/audit each flagged row.
    pub fn check_low_stock_and_notify(&self) -> InventoryResult<Vec<InventoryRow>> {
        self.monitor.check_and_notify()
    }
}
