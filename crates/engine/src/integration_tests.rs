//! Integration tests for the full reservation pipeline.
//!
//! Tests: Adjuster/Coordinator → RowStore (one unit of work) → Ledger →
//! Audit → EventBus.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use stockbook_core::{Actor, InventoryError, InventoryResult, OrderId, ProductId, RowKey};
    use stockbook_events::{InMemoryEventBus, StockEvent};
    use stockbook_inventory::{
        AdjustMode, InventoryRow, Reservation, ReservationLine, ReservationStatus,
        TransactionType, notes,
    };

    use crate::adjuster::AdjustMeta;
    use crate::audit::InMemoryAuditSink;
    use crate::cache::test_support::RecordingCache;
    use crate::service::InventoryService;
    use crate::store::{
        InMemoryLedgerStore, InMemoryReservationStore, InMemoryRowStore, LedgerStore,
        ReservationStore, RowBatchFn, RowStore,
    };

    struct Harness {
        service: InventoryService<InMemoryEventBus<StockEvent>>,
        ledger: Arc<InMemoryLedgerStore>,
        audit: Arc<InMemoryAuditSink>,
        cache: Arc<RecordingCache>,
    }

    fn setup() -> Harness {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let cache = Arc::new(RecordingCache::new());
        let service = InventoryService::new(
            Arc::new(InMemoryRowStore::new()),
            ledger.clone(),
            Arc::new(InMemoryReservationStore::new()),
            audit.clone(),
            cache.clone(),
            Arc::new(InMemoryEventBus::new()),
        );
        Harness {
            service,
            ledger,
            audit,
            cache,
        }
    }

    /// Delegates to an in-memory store but rejects the next `update_rows`
    /// call, modelling a backend hiccup in the middle of a unit of work.
    struct FlakyRowStore {
        inner: InMemoryRowStore,
        fail_next: AtomicBool,
    }

    impl FlakyRowStore {
        fn new() -> Self {
            Self {
                inner: InMemoryRowStore::new(),
                fail_next: AtomicBool::new(false),
            }
        }

        fn fail_next_update(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }
    }

    impl RowStore for FlakyRowStore {
        fn ensure(&self, key: &RowKey) -> InventoryResult<InventoryRow> {
            self.inner.ensure(key)
        }

        fn get(&self, key: &RowKey) -> InventoryResult<Option<InventoryRow>> {
            self.inner.get(key)
        }

        fn list_product(&self, product_id: ProductId) -> InventoryResult<Vec<InventoryRow>> {
            self.inner.list_product(product_id)
        }

        fn list_all(&self) -> InventoryResult<Vec<InventoryRow>> {
            self.inner.list_all()
        }

        fn update_rows(
            &self,
            keys: &[RowKey],
            f: RowBatchFn<'_>,
        ) -> InventoryResult<Vec<InventoryRow>> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(InventoryError::store("row backend unavailable"));
            }
            self.inner.update_rows(keys, f)
        }
    }

    /// Delegates to an in-memory store but rejects the next `insert`, forcing
    /// a reserve call to give back the holds it already took.
    struct FlakyReservationStore {
        inner: InMemoryReservationStore,
        fail_next: AtomicBool,
    }

    impl FlakyReservationStore {
        fn new() -> Self {
            Self {
                inner: InMemoryReservationStore::new(),
                fail_next: AtomicBool::new(false),
            }
        }

        fn fail_next_insert(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }
    }

    impl ReservationStore for FlakyReservationStore {
        fn insert(&self, reservation: Reservation) -> InventoryResult<()> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(InventoryError::store("reservation backend unavailable"));
            }
            self.inner.insert(reservation)
        }

        fn get(&self, order_id: OrderId) -> InventoryResult<Option<Reservation>> {
            self.inner.get(order_id)
        }

        fn transition(
            &self,
            order_id: OrderId,
            to: ReservationStatus,
            now: DateTime<Utc>,
        ) -> InventoryResult<Option<Reservation>> {
            self.inner.transition(order_id, to, now)
        }

        fn reinstate(&self, order_id: OrderId, now: DateTime<Utc>) -> InventoryResult<()> {
            self.inner.reinstate(order_id, now)
        }

        fn remove(&self, order_id: OrderId) -> InventoryResult<()> {
            self.inner.remove(order_id)
        }
    }

    fn setup_with_rows(rows: Arc<FlakyRowStore>) -> InventoryService<InMemoryEventBus<StockEvent>> {
        InventoryService::new(
            rows,
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryReservationStore::new()),
            Arc::new(InMemoryAuditSink::new()),
            Arc::new(RecordingCache::new()),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    fn line(product_id: ProductId, quantity: i64) -> ReservationLine {
        ReservationLine {
            product_id,
            quantity,
        }
    }

    fn stock(service: &InventoryService<InMemoryEventBus<StockEvent>>, product_id: ProductId, qty: i64) {
        service
            .adjust_stock(product_id, None, qty, AdjustMode::Set, AdjustMeta::default())
            .unwrap();
    }

    #[test]
    fn adjust_reserve_confirm_scenario() {
        let h = setup();
        let p1 = ProductId::new();
        let o1 = OrderId::new();

        stock(&h.service, p1, 50);
        h.service
            .reserve_stock(o1, &[line(p1, 20)], None, Actor::system())
            .unwrap();

        let summary = h.service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 50);
        assert_eq!(summary.reserved, 20);
        assert_eq!(summary.available, 30);

        h.service.confirm_reduction(o1, Actor::system()).unwrap();

        let summary = h.service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 30);
        assert_eq!(summary.reserved, 0);
        // Conservation: available after confirm equals available before reserve
        // minus nothing — the hold simply became a deduction.
        assert_eq!(summary.available, 30);
    }

    #[test]
    fn insufficient_stock_rejects_and_leaves_state_unchanged() {
        let h = setup();
        let p1 = ProductId::new();
        stock(&h.service, p1, 50);
        h.service
            .reserve_stock(OrderId::new(), &[line(p1, 20)], None, Actor::system())
            .unwrap();

        // available = 30, ask for 40
        let err = h
            .service
            .reserve_stock(OrderId::new(), &[line(p1, 40)], None, Actor::system())
            .unwrap_err();
        match err {
            InventoryError::InsufficientStock { product_id } => assert_eq!(product_id, p1),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let summary = h.service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 50);
        assert_eq!(summary.reserved, 20);
    }

    #[test]
    fn multi_item_reserve_is_all_or_nothing() {
        let h = setup();
        let plenty = ProductId::new();
        let scarce = ProductId::new();
        stock(&h.service, plenty, 100);
        stock(&h.service, scarce, 1);

        let err = h
            .service
            .reserve_stock(
                OrderId::new(),
                &[line(plenty, 10), line(scarce, 5)],
                None,
                Actor::system(),
            )
            .unwrap_err();
        match err {
            InventoryError::InsufficientStock { product_id } => assert_eq!(product_id, scarce),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // No partial reservation left behind on the item that had stock.
        assert_eq!(h.service.get_inventory(plenty).unwrap().reserved, 0);
        assert_eq!(h.service.get_inventory(scarce).unwrap().reserved, 0);
    }

    #[test]
    fn reserve_then_release_round_trips() {
        let h = setup();
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);
        stock(&h.service, p2, 10);

        h.service
            .reserve_stock(order, &[line(p1, 3), line(p2, 4)], None, Actor::system())
            .unwrap();
        h.service.release_reserved(order, Actor::system()).unwrap();

        assert_eq!(h.service.get_inventory(p1).unwrap().reserved, 0);
        assert_eq!(h.service.get_inventory(p2).unwrap().reserved, 0);
        assert_eq!(h.service.get_inventory(p1).unwrap().total, 10);
    }

    #[test]
    fn release_is_idempotent() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);
        h.service
            .reserve_stock(order, &[line(p1, 4)], None, Actor::system())
            .unwrap();

        let first = h.service.release_reserved(order, Actor::system()).unwrap();
        assert_eq!(first.len(), 1);
        let second = h.service.release_reserved(order, Actor::system()).unwrap();
        assert!(second.is_empty());

        let summary = h.service.get_inventory(p1).unwrap();
        assert_eq!(summary.reserved, 0);
        assert_eq!(summary.total, 10);
    }

    #[test]
    fn confirm_is_idempotent_and_terminal() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);
        h.service
            .reserve_stock(order, &[line(p1, 4)], None, Actor::system())
            .unwrap();

        h.service.confirm_reduction(order, Actor::system()).unwrap();
        h.service.confirm_reduction(order, Actor::system()).unwrap();
        // Releasing after confirm is also a no-op.
        assert!(h.service.release_reserved(order, Actor::system()).unwrap().is_empty());

        let summary = h.service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.reserved, 0);
    }

    #[test]
    fn release_stays_retryable_after_a_row_store_failure() {
        let rows = Arc::new(FlakyRowStore::new());
        let service = setup_with_rows(rows.clone());
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&service, p1, 10);
        service
            .reserve_stock(order, &[line(p1, 4)], None, Actor::system())
            .unwrap();

        rows.fail_next_update();
        let err = service.release_reserved(order, Actor::system()).unwrap_err();
        assert!(matches!(err, InventoryError::Store(_)));
        assert_eq!(service.get_inventory(p1).unwrap().reserved, 4);

        // The reservation is still live, so the retry frees the hold instead
        // of collapsing into an idempotent no-op.
        let retried = service.release_reserved(order, Actor::system()).unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(service.get_inventory(p1).unwrap().reserved, 0);
    }

    #[test]
    fn confirm_stays_retryable_after_a_row_store_failure() {
        let rows = Arc::new(FlakyRowStore::new());
        let service = setup_with_rows(rows.clone());
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&service, p1, 10);
        service
            .reserve_stock(order, &[line(p1, 4)], None, Actor::system())
            .unwrap();

        rows.fail_next_update();
        let err = service.confirm_reduction(order, Actor::system()).unwrap_err();
        assert!(matches!(err, InventoryError::Store(_)));
        let summary = service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 10);
        assert_eq!(summary.reserved, 4);

        service.confirm_reduction(order, Actor::system()).unwrap();
        let summary = service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.reserved, 0);
    }

    #[test]
    fn reserve_gives_back_holds_when_the_record_insert_fails() {
        let reservations = Arc::new(FlakyReservationStore::new());
        let service = InventoryService::new(
            Arc::new(InMemoryRowStore::new()),
            Arc::new(InMemoryLedgerStore::new()),
            reservations.clone(),
            Arc::new(InMemoryAuditSink::new()),
            Arc::new(RecordingCache::new()),
            Arc::new(InMemoryEventBus::new()),
        );
        let p1 = ProductId::new();
        stock(&service, p1, 10);

        reservations.fail_next_insert();
        let err = service
            .reserve_stock(OrderId::new(), &[line(p1, 4)], None, Actor::system())
            .unwrap_err();
        assert!(matches!(err, InventoryError::Store(_)));

        // The failed call left no hold behind and a fresh reserve succeeds.
        assert_eq!(service.get_inventory(p1).unwrap().reserved, 0);
        service
            .reserve_stock(OrderId::new(), &[line(p1, 4)], None, Actor::system())
            .unwrap();
        assert_eq!(service.get_inventory(p1).unwrap().reserved, 4);
    }

    #[test]
    fn released_order_can_reserve_again() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);

        h.service
            .reserve_stock(order, &[line(p1, 4)], None, Actor::system())
            .unwrap();
        h.service.release_reserved(order, Actor::system()).unwrap();
        h.service
            .reserve_stock(order, &[line(p1, 2)], None, Actor::system())
            .unwrap();

        assert_eq!(h.service.get_inventory(p1).unwrap().reserved, 2);
    }

    #[test]
    fn live_reservation_blocks_a_second_reserve_for_the_order() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);

        h.service
            .reserve_stock(order, &[line(p1, 4)], None, Actor::system())
            .unwrap();
        let err = h
            .service
            .reserve_stock(order, &[line(p1, 1)], None, Actor::system())
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
        assert_eq!(h.service.get_inventory(p1).unwrap().reserved, 4);
    }

    #[test]
    fn concurrent_reserves_of_the_last_unit_admit_exactly_one() {
        let h = setup();
        let p1 = ProductId::new();
        stock(&h.service, p1, 1);

        let service = Arc::new(h.service);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    service.reserve_stock(OrderId::new(), &[line(p1, 1)], None, Actor::system())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|j| j.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);

        let loss = results.into_iter().find(|r| r.is_err()).unwrap().unwrap_err();
        match loss {
            InventoryError::InsufficientStock { product_id } => assert_eq!(product_id, p1),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let summary = service.get_inventory(p1).unwrap();
        assert_eq!(summary.reserved, 1);
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn low_stock_threshold_is_inclusive_at_the_boundary() {
        let h = setup();
        let flagged = ProductId::new();
        let boundary = ProductId::new();
        let healthy = ProductId::new();

        stock(&h.service, flagged, 10);
        h.service
            .reserve_stock(OrderId::new(), &[line(flagged, 6)], None, Actor::system())
            .unwrap(); // available = 4
        stock(&h.service, boundary, 5); // available = 5 == threshold
        stock(&h.service, healthy, 6); // available = 6

        let low = h.service.list_low_stock().unwrap();
        let ids: Vec<ProductId> = low.iter().map(|r| r.key.product_id).collect();
        assert!(ids.contains(&flagged));
        assert!(ids.contains(&boundary));
        assert!(!ids.contains(&healthy));
    }

    #[test]
    fn monitor_notifies_and_audits_each_flagged_row() {
        let h = setup();
        let p1 = ProductId::new();
        stock(&h.service, p1, 2); // available 2 <= 5

        let sub = h.service.subscribe();
        let flagged = h.service.check_low_stock_and_notify().unwrap();
        assert_eq!(flagged.len(), 1);

        let event = sub.recv_timeout(Duration::from_secs(1)).unwrap();
        match event {
            StockEvent::LowStock(e) => {
                assert_eq!(e.product_id, p1);
                assert_eq!(e.available, 2);
            }
            other => panic!("expected LowStock, got {other:?}"),
        }

        let low_stock_audits: Vec<_> = h
            .audit
            .records()
            .into_iter()
            .filter(|r| r.action == "inventory.low_stock")
            .collect();
        assert_eq!(low_stock_audits.len(), 1);
        assert_eq!(low_stock_audits[0].entity_id, p1.to_string());
    }

    #[test]
    fn lifecycle_writes_a_complete_ledger_trail() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 50);
        h.service
            .reserve_stock(order, &[line(p1, 20)], None, Actor::system())
            .unwrap();
        h.service.confirm_reduction(order, Actor::system()).unwrap();

        let for_order = h.ledger.entries_for_order(order).unwrap();
        assert_eq!(for_order.len(), 2);

        assert!(for_order[0].is_reserve_for(order));
        assert_eq!(for_order[0].transaction_type, TransactionType::Transfer);
        assert_eq!(for_order[0].quantity, 20);

        assert_eq!(for_order[1].notes.as_deref(), Some(notes::CONFIRM));
        assert_eq!(for_order[1].transaction_type, TransactionType::Outbound);
        assert_eq!(for_order[1].previous_stock, 50);
        assert_eq!(for_order[1].new_stock, 30);

        // The set-50 adjustment is on the row trail but not the order trail.
        let key = stockbook_core::RowKey::default_warehouse(p1);
        assert_eq!(h.ledger.entries_for_key(&key).unwrap().len(), 3);
    }

    #[test]
    fn release_writes_a_compensating_entry() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);
        h.service
            .reserve_stock(order, &[line(p1, 3)], None, Actor::system())
            .unwrap();
        h.service.release_reserved(order, Actor::system()).unwrap();

        let for_order = h.ledger.entries_for_order(order).unwrap();
        assert_eq!(for_order.len(), 2);
        assert_eq!(for_order[1].notes.as_deref(), Some(notes::RELEASE));
        assert_eq!(for_order[1].quantity, -3);
    }

    #[test]
    fn mutations_emit_events_and_invalidate_the_cache() {
        let h = setup();
        let sub = h.service.subscribe();
        let p1 = ProductId::new();
        let order = OrderId::new();

        stock(&h.service, p1, 10);
        h.service
            .reserve_stock(order, &[line(p1, 2)], None, Actor::system())
            .unwrap();
        h.service.release_reserved(order, Actor::system()).unwrap();

        let mut types = Vec::new();
        while let Ok(event) = sub.recv_timeout(Duration::from_millis(100)) {
            types.push(event.event_type());
        }
        assert_eq!(
            types,
            vec!["stock.updated", "inventory.reserved", "inventory.released"]
        );

        // One invalidation per mutation, keyed by exact product id.
        assert_eq!(h.cache.invalidated(), vec![p1, p1, p1]);
    }

    #[test]
    fn get_inventory_aggregates_across_warehouses() {
        let h = setup();
        let p1 = ProductId::new();
        let wh = stockbook_core::WarehouseId::new();

        stock(&h.service, p1, 10);
        h.service
            .adjust_stock(p1, Some(wh), 7, AdjustMode::Set, AdjustMeta::default())
            .unwrap();
        h.service
            .reserve_stock(OrderId::new(), &[line(p1, 4)], None, Actor::system())
            .unwrap();

        let summary = h.service.get_inventory(p1).unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.total, 17);
        assert_eq!(summary.reserved, 4);
        assert_eq!(summary.available, 13);
    }

    #[test]
    fn get_inventory_on_unknown_product_is_not_found() {
        let h = setup();
        let err = h.service.get_inventory(ProductId::new()).unwrap_err();
        assert!(matches!(err, InventoryError::NotFound));
    }

    #[test]
    fn adjust_decrement_clamps_and_records_snapshots() {
        let h = setup();
        let p1 = ProductId::new();
        stock(&h.service, p1, 3);

        let row = h
            .service
            .adjust_stock(p1, None, 10, AdjustMode::Decrement, AdjustMeta::default())
            .unwrap();
        assert_eq!(row.quantity, 0);

        let key = stockbook_core::RowKey::default_warehouse(p1);
        let entries = h.ledger.entries_for_key(&key).unwrap();
        let outbound = entries.last().unwrap();
        assert_eq!(outbound.transaction_type, TransactionType::Outbound);
        assert_eq!(outbound.previous_stock, 3);
        assert_eq!(outbound.new_stock, 0);
    }

    #[test]
    fn audit_trail_covers_the_order_lifecycle() {
        let h = setup();
        let p1 = ProductId::new();
        let order = OrderId::new();
        stock(&h.service, p1, 10);
        h.service
            .reserve_stock(order, &[line(p1, 2)], None, Actor::system())
            .unwrap();
        h.service.confirm_reduction(order, Actor::system()).unwrap();

        let actions: Vec<String> = h.audit.records().into_iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec!["inventory.update", "inventory.reserve", "inventory.confirm"]
        );
    }

    #[test]
    fn list_inventory_orders_by_most_recent_update() {
        let h = setup();
        let first = ProductId::new();
        let second = ProductId::new();
        stock(&h.service, first, 1);
        std::thread::sleep(Duration::from_millis(2));
        stock(&h.service, second, 1);

        let rows = h.service.list_inventory().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key.product_id, second);
        assert_eq!(rows[1].key.product_id, first);
    }

    #[test]
    fn in_memory_service_works_end_to_end() {
        let service = InventoryService::in_memory();
        let p1 = ProductId::new();
        let order = OrderId::new();

        service
            .adjust_stock(p1, None, 5, AdjustMode::Set, AdjustMeta::default())
            .unwrap();
        service
            .reserve_stock(order, &[line(p1, 5)], None, Actor::system())
            .unwrap();
        service.confirm_reduction(order, Actor::system()).unwrap();

        let summary = service.get_inventory(p1).unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.available, 0);
    }
}
