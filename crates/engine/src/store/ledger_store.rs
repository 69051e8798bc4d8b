//! Append-only ledger storage.

use std::sync::{Arc, Mutex};

use stockbook_core::{InventoryError, InventoryResult, OrderId, RowKey};
use stockbook_inventory::LedgerEntry;

/// Append-only store of stock-movement records. Pure inserts; entries are
/// never updated or deleted, so the store has no update contention.
///
/// Callers in the mutation path treat `append` as best-effort: a failure is
/// logged and swallowed, never allowed to roll back the row mutation it
/// accompanies.
pub trait LedgerStore: Send + Sync {
    fn append(&self, entry: LedgerEntry) -> InventoryResult<()>;

    /// Entries referencing one order, in append order.
    fn entries_for_order(&self, order_id: OrderId) -> InventoryResult<Vec<LedgerEntry>>;

    /// Entries for one row key, in append order.
    fn entries_for_key(&self, key: &RowKey) -> InventoryResult<Vec<LedgerEntry>>;

    fn all(&self) -> InventoryResult<Vec<LedgerEntry>>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, entry: LedgerEntry) -> InventoryResult<()> {
        (**self).append(entry)
    }

    fn entries_for_order(&self, order_id: OrderId) -> InventoryResult<Vec<LedgerEntry>> {
        (**self).entries_for_order(order_id)
    }

    fn entries_for_key(&self, key: &RowKey) -> InventoryResult<Vec<LedgerEntry>> {
        (**self).entries_for_key(key)
    }

    fn all(&self) -> InventoryResult<Vec<LedgerEntry>> {
        (**self).all()
    }
}

/// Best-effort append: a failed ledger write is logged and swallowed so it
/// can never roll back the primary stock mutation it accompanies.
pub(crate) fn append_best_effort(ledger: &dyn LedgerStore, entry: LedgerEntry) {
    if let Err(e) = ledger.append(entry) {
        tracing::warn!(error = %e, "dropped ledger entry");
    }
}

/// In-memory ledger for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl core::fmt::Debug) -> InventoryError {
    InventoryError::store("ledger store lock poisoned")
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entry: LedgerEntry) -> InventoryResult<()> {
        let mut entries = self.inner.lock().map_err(poisoned)?;
        entries.push(entry);
        Ok(())
    }

    fn entries_for_order(&self, order_id: OrderId) -> InventoryResult<Vec<LedgerEntry>> {
        let entries = self.inner.lock().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| e.reference_id == Some(order_id))
            .cloned()
            .collect())
    }

    fn entries_for_key(&self, key: &RowKey) -> InventoryResult<Vec<LedgerEntry>> {
        let entries = self.inner.lock().map_err(poisoned)?;
        Ok(entries.iter().filter(|e| e.key == *key).cloned().collect())
    }

    fn all(&self) -> InventoryResult<Vec<LedgerEntry>> {
        let entries = self.inner.lock().map_err(poisoned)?;
        Ok(entries.clone())
    }
}
