//! The mutable row store: the only shared mutable state in the engine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use stockbook_core::{InventoryError, InventoryResult, ProductId, RowKey};
use stockbook_inventory::InventoryRow;

/// Batch mutation run inside one unit of work. The slice is ordered like the
/// key list passed to [`RowStore::update_rows`]; returning an error aborts
/// the whole batch with no row committed.
pub type RowBatchFn<'a> = &'a mut dyn FnMut(&mut [InventoryRow]) -> InventoryResult<()>;

/// Durable storage keyed by (product, warehouse), with get-or-create
/// semantics.
///
/// Implementations must make `update_rows` serializable against every other
/// `update_rows` call: two concurrent reserve attempts against the same row
/// must not both observe the pre-update `available` value. Rows are never
/// hard-deleted.
pub trait RowStore: Send + Sync {
    /// Return the existing row for `key`, or create it with everything at
    /// zero. Concurrent calls for the same key must yield one row.
    fn ensure(&self, key: &RowKey) -> InventoryResult<InventoryRow>;

    fn get(&self, key: &RowKey) -> InventoryResult<Option<InventoryRow>>;

    /// All rows for one product, across warehouses.
    fn list_product(&self, product_id: ProductId) -> InventoryResult<Vec<InventoryRow>>;

    fn list_all(&self) -> InventoryResult<Vec<InventoryRow>>;

    /// Atomic all-or-nothing read-modify-write over a batch of rows.
    ///
    /// Missing rows are created (zeroed) inside the same unit of work. On
    /// success returns the committed rows in key order; on error no row is
    /// changed.
    fn update_rows(&self, keys: &[RowKey], f: RowBatchFn<'_>) -> InventoryResult<Vec<InventoryRow>>;
}

impl<S> RowStore for Arc<S>
where
    S: RowStore + ?Sized,
{
    fn ensure(&self, key: &RowKey) -> InventoryResult<InventoryRow> {
        (**self).ensure(key)
    }

    fn get(&self, key: &RowKey) -> InventoryResult<Option<InventoryRow>> {
        (**self).get(key)
    }

    fn list_product(&self, product_id: ProductId) -> InventoryResult<Vec<InventoryRow>> {
        (**self).list_product(product_id)
    }

    fn list_all(&self) -> InventoryResult<Vec<InventoryRow>> {
        (**self).list_all()
    }

    fn update_rows(&self, keys: &[RowKey], f: RowBatchFn<'_>) -> InventoryResult<Vec<InventoryRow>> {
        (**self).update_rows(keys, f)
    }
}

/// In-memory row store for tests/dev.
///
/// One `RwLock` over the whole map; `update_rows` holds the write guard for
/// the entire read-check-write, which serializes units of work against each
/// other and gives multi-row atomicity for free (mutations happen on clones
/// and are committed only when the batch closure succeeds).
#[derive(Debug, Default)]
pub struct InMemoryRowStore {
    inner: RwLock<HashMap<RowKey, InventoryRow>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl core::fmt::Debug) -> InventoryError {
    InventoryError::store("row store lock poisoned")
}

impl RowStore for InMemoryRowStore {
    fn ensure(&self, key: &RowKey) -> InventoryResult<InventoryRow> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let row = map
            .entry(*key)
            .or_insert_with(|| InventoryRow::new(*key, Utc::now()));
        Ok(row.clone())
    }

    fn get(&self, key: &RowKey) -> InventoryResult<Option<InventoryRow>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn list_product(&self, product_id: ProductId) -> InventoryResult<Vec<InventoryRow>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map
            .values()
            .filter(|r| r.key.product_id == product_id)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> InventoryResult<Vec<InventoryRow>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.values().cloned().collect())
    }

    fn update_rows(&self, keys: &[RowKey], f: RowBatchFn<'_>) -> InventoryResult<Vec<InventoryRow>> {
        let mut map = self.inner.write().map_err(poisoned)?;

        let mut batch: Vec<InventoryRow> = keys
            .iter()
            .map(|key| {
                map.get(key)
                    .cloned()
                    .unwrap_or_else(|| InventoryRow::new(*key, Utc::now()))
            })
            .collect();

        f(&mut batch)?;

        for row in &batch {
            map.insert(row.key, row.clone());
        }

        Ok(batch)
    }
}
