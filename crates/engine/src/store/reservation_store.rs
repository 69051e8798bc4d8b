//! Per-order reservation records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use stockbook_core::{InventoryError, InventoryResult, OrderId};
use stockbook_inventory::{Reservation, ReservationStatus};

/// Storage for first-class reservation records, keyed by order id.
///
/// `transition` is a compare-and-set from `Reserved`: it is how release and
/// confirm stay idempotent — a replayed call finds the terminal status and
/// gets `None` back, turning into a no-op.
pub trait ReservationStore: Send + Sync {
    /// Insert a live reservation. Rejects an order id that already has a live
    /// or confirmed reservation; a released one may be replaced (payment
    /// retry flow).
    fn insert(&self, reservation: Reservation) -> InventoryResult<()>;

    fn get(&self, order_id: OrderId) -> InventoryResult<Option<Reservation>>;

    /// Atomically move the reservation from `Reserved` to `to`. Returns the
    /// reservation as it was while live, or `None` when there is nothing to
    /// transition (missing or already terminal).
    fn transition(
        &self,
        order_id: OrderId,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> InventoryResult<Option<Reservation>>;

    /// Put a reservation back to `Reserved` after its unit of work failed.
    ///
    /// Compensation path only: the caller that won the `transition` owns the
    /// record until its rows commit, so reverting cannot race another
    /// transition.
    fn reinstate(&self, order_id: OrderId, now: DateTime<Utc>) -> InventoryResult<()>;

    /// Remove a record entirely (compensation path only).
    fn remove(&self, order_id: OrderId) -> InventoryResult<()>;
}

impl<S> ReservationStore for Arc<S>
where
    S: ReservationStore + ?Sized,
{
    fn insert(&self, reservation: Reservation) -> InventoryResult<()> {
        (**self).insert(reservation)
    }

    fn get(&self, order_id: OrderId) -> InventoryResult<Option<Reservation>> {
        (**self).get(order_id)
    }

    fn transition(
        &self,
        order_id: OrderId,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> InventoryResult<Option<Reservation>> {
        (**self).transition(order_id, to, now)
    }

    fn reinstate(&self, order_id: OrderId, now: DateTime<Utc>) -> InventoryResult<()> {
        (**self).reinstate(order_id, now)
    }

    fn remove(&self, order_id: OrderId) -> InventoryResult<()> {
        (**self).remove(order_id)
    }
}

/// In-memory reservation store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    inner: Mutex<HashMap<OrderId, Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl core::fmt::Debug) -> InventoryError {
    InventoryError::store("reservation store lock poisoned")
}

impl ReservationStore for InMemoryReservationStore {
    fn insert(&self, reservation: Reservation) -> InventoryResult<()> {
        let mut map = self.inner.lock().map_err(poisoned)?;
        match map.get(&reservation.order_id) {
            Some(existing) if existing.status != ReservationStatus::Released => {
                Err(InventoryError::invalid_input(format!(
                    "order {} already has a {:?} reservation",
                    reservation.order_id, existing.status
                )))
            }
            _ => {
                map.insert(reservation.order_id, reservation);
                Ok(())
            }
        }
    }

    fn get(&self, order_id: OrderId) -> InventoryResult<Option<Reservation>> {
        let map = self.inner.lock().map_err(poisoned)?;
        Ok(map.get(&order_id).cloned())
    }

    fn transition(
        &self,
        order_id: OrderId,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> InventoryResult<Option<Reservation>> {
        let mut map = self.inner.lock().map_err(poisoned)?;
        match map.get_mut(&order_id) {
            Some(res) if res.status == ReservationStatus::Reserved => {
                let live = res.clone();
                res.status = to;
                res.updated_at = now;
                Ok(Some(live))
            }
            _ => Ok(None),
        }
    }

    fn reinstate(&self, order_id: OrderId, now: DateTime<Utc>) -> InventoryResult<()> {
        let mut map = self.inner.lock().map_err(poisoned)?;
        if let Some(res) = map.get_mut(&order_id) {
            res.status = ReservationStatus::Reserved;
            res.updated_at = now;
        }
        Ok(())
    }

    fn remove(&self, order_id: OrderId) -> InventoryResult<()> {
        let mut map = self.inner.lock().map_err(poisoned)?;
        map.remove(&order_id);
        Ok(())
    }
}
