//! Inventory domain module.
//!
//! This crate contains business rules for stock bookkeeping, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! mutable [`row::InventoryRow`] is the authoritative state; the append-only
//! [`ledger::LedgerEntry`] is the audit trail layered on top of it.

pub mod ledger;
pub mod reservation;
pub mod row;

pub use ledger::{LedgerEntry, ReferenceType, TransactionType, notes};
pub use reservation::{Reservation, ReservationLine, ReservationStatus};
pub use row::{AdjustMode, AppliedAdjustment, ConsumedHold, DEFAULT_LOW_STOCK_THRESHOLD, InventoryRow};
