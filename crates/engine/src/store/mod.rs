//! Storage seams and their in-memory implementations.

pub mod ledger_store;
pub mod reservation_store;
pub mod row_store;

pub use ledger_store::{InMemoryLedgerStore, LedgerStore};
pub use reservation_store::{InMemoryReservationStore, ReservationStore};
pub use row_store::{InMemoryRowStore, RowBatchFn, RowStore};
