use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{Actor, OrderId, RowKey};

/// Direction/kind of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Stock arriving (restock, increment).
    Inbound,
    /// Stock leaving (write-off, confirmed order).
    Outbound,
    /// Direct quantity set.
    Adjustment,
    /// Reservation bookkeeping: stock moved between `available` and
    /// `reserved` without changing `quantity`.
    Transfer,
}

/// What a ledger entry references.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Order,
    Adjustment,
}

/// Well-known notes tags used to correlate reservation entries per order.
pub mod notes {
    pub const RESERVE: &str = "reserve";
    pub const RELEASE: &str = "release";
    pub const CONFIRM: &str = "confirm";
}

/// One immutable stock-movement record.
///
/// The ledger is append-only: entries are never updated or deleted. It is a
/// best-effort audit trail layered on top of the authoritative row state, not
/// the source of truth for quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: RowKey,
    pub transaction_type: TransactionType,
    /// Signed delta applied to the operation's subject field.
    pub quantity: i64,
    /// `quantity` field snapshot before the operation.
    pub previous_stock: i64,
    /// `quantity` field snapshot after the operation.
    pub new_stock: i64,
    pub reference_type: ReferenceType,
    pub reference_id: Option<OrderId>,
    pub notes: Option<String>,
    /// `None` for system actions.
    pub created_by: Option<stockbook_core::UserId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry for a direct stock adjustment (set/increment/decrement).
    pub fn adjustment(
        key: RowKey,
        transaction_type: TransactionType,
        quantity: i64,
        previous_stock: i64,
        new_stock: i64,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            transaction_type,
            quantity,
            previous_stock,
            new_stock,
            reference_type: ReferenceType::Adjustment,
            reference_id: None,
            notes: reason,
            created_by: actor.user_id,
            created_at: now,
        }
    }

    /// Entry tagging one reserved line item. `quantity` is unchanged by a
    /// reserve, so both snapshots carry the same value.
    pub fn reserve(
        key: RowKey,
        quantity: i64,
        stock_snapshot: i64,
        order_id: OrderId,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            transaction_type: TransactionType::Transfer,
            quantity,
            previous_stock: stock_snapshot,
            new_stock: stock_snapshot,
            reference_type: ReferenceType::Order,
            reference_id: Some(order_id),
            notes: Some(notes::RESERVE.to_string()),
            created_by: actor.user_id,
            created_at: now,
        }
    }

    /// Compensating entry reversing a reserve (negative quantity).
    pub fn release(
        key: RowKey,
        quantity: i64,
        stock_snapshot: i64,
        order_id: OrderId,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            transaction_type: TransactionType::Transfer,
            quantity: -quantity,
            previous_stock: stock_snapshot,
            new_stock: stock_snapshot,
            reference_type: ReferenceType::Order,
            reference_id: Some(order_id),
            notes: Some(notes::RELEASE.to_string()),
            created_by: actor.user_id,
            created_at: now,
        }
    }

    /// Entry for a confirmed reservation: the hold became a permanent
    /// outbound deduction.
    pub fn confirm(
        key: RowKey,
        quantity: i64,
        previous_stock: i64,
        new_stock: i64,
        order_id: OrderId,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            transaction_type: TransactionType::Outbound,
            quantity,
            previous_stock,
            new_stock,
            reference_type: ReferenceType::Order,
            reference_id: Some(order_id),
            notes: Some(notes::CONFIRM.to_string()),
            created_by: actor.user_id,
            created_at: now,
        }
    }

    /// Whether this entry is a reserve tag for the given order.
    pub fn is_reserve_for(&self, order_id: OrderId) -> bool {
        self.reference_type == ReferenceType::Order
            && self.reference_id == Some(order_id)
            && self.notes.as_deref() == Some(notes::RESERVE)
    }
}
