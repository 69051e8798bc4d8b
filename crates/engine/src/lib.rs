//! Infrastructure and orchestration for the inventory engine.
//!
//! Storage seams (row store, ledger store, reservation store, audit sink,
//! read cache) ship with in-memory implementations; the orchestrators
//! ([`adjuster::StockAdjuster`], [`coordinator::ReservationCoordinator`],
//! [`monitor::LowStockMonitor`]) are wired together by
//! [`service::InventoryService`].

pub mod adjuster;
pub mod audit;
pub mod cache;
pub mod coordinator;
pub mod monitor;
pub mod service;
pub mod store;

mod integration_tests;

pub use adjuster::{AdjustMeta, StockAdjuster};
pub use audit::{AuditRecord, AuditSink, InMemoryAuditSink};
pub use cache::{NoopCache, ReadCache};
pub use coordinator::ReservationCoordinator;
pub use monitor::LowStockMonitor;
pub use service::{InventoryService, InventorySummary};
pub use store::{
    InMemoryLedgerStore, InMemoryReservationStore, InMemoryRowStore, LedgerStore,
    ReservationStore, RowStore,
};
