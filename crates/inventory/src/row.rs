use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{InventoryError, RowKey};

use crate::ledger::TransactionType;

/// Default `low_stock_threshold` for lazily created rows.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// How a direct stock adjustment interprets its amount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode {
    /// Replace `quantity` with the amount.
    Set,
    /// Add the amount to `quantity`.
    Increment,
    /// Subtract the amount from `quantity` (floored at 0).
    Decrement,
}

impl AdjustMode {
    /// Parse an adjustment mode from the loose forms accepted at the admin
    /// boundary (`inc`, `+`, `dec`, `-`). Unrecognized input falls back to
    /// `Set`, matching the upstream admin screen contract.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "increment" | "inc" | "+" => AdjustMode::Increment,
            "decrement" | "dec" | "-" => AdjustMode::Decrement,
            _ => AdjustMode::Set,
        }
    }
}

/// Outcome of [`InventoryRow::apply_adjust`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AppliedAdjustment {
    pub previous_stock: i64,
    pub new_stock: i64,
    /// True when the decrement would have gone negative and was floored at 0.
    pub clamped: bool,
    pub transaction_type: TransactionType,
}

/// Outcome of [`InventoryRow::consume_hold`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConsumedHold {
    pub previous_stock: i64,
    pub new_stock: i64,
}

/// Current stock state of one product in one warehouse.
///
/// Invariants (maintained by every mutation helper):
/// - `quantity >= 0`
/// - `0 <= reserved_quantity <= quantity`
///
/// Rows are created lazily with everything at zero and are never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub key: RowKey,
    /// Total physical units on hand.
    pub quantity: i64,
    /// Units held against open orders.
    pub reserved_quantity: i64,
    pub low_stock_threshold: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRow {
    pub fn new(key: RowKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            quantity: 0,
            reserved_quantity: 0,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            updated_at: now,
        }
    }

    /// Units sellable right now.
    pub fn available(&self) -> i64 {
        self.quantity - self.reserved_quantity
    }

    /// Threshold is inclusive: `available == threshold` flags the row.
    pub fn is_low_stock(&self) -> bool {
        self.available() <= self.low_stock_threshold
    }

    /// Apply a direct admin/operational adjustment.
    ///
    /// A decrement below zero clamps to 0 (`clamped` reports when it fired);
    /// reserved stock is additionally capped at the new quantity so the row
    /// invariant holds even when an operator writes stock off underneath an
    /// open reservation.
    pub fn apply_adjust(
        &mut self,
        mode: AdjustMode,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<AppliedAdjustment, InventoryError> {
        if amount < 0 {
            return Err(InventoryError::invalid_input(
                "adjustment amount must be non-negative",
            ));
        }

        let previous = self.quantity;
        let (target, transaction_type) = match mode {
            AdjustMode::Set => (amount, TransactionType::Adjustment),
            AdjustMode::Increment => (previous + amount, TransactionType::Inbound),
            AdjustMode::Decrement => (previous - amount, TransactionType::Outbound),
        };

        let clamped = target < 0;
        self.quantity = target.max(0);
        self.reserved_quantity = self.reserved_quantity.min(self.quantity);
        self.updated_at = now;

        Ok(AppliedAdjustment {
            previous_stock: previous,
            new_stock: self.quantity,
            clamped,
            transaction_type,
        })
    }

    /// Place a provisional hold of `qty` units against this row.
    ///
    /// Fails with `InsufficientStock` when fewer than `qty` units are
    /// available; the row is left untouched in that case.
    pub fn hold(&mut self, qty: i64, now: DateTime<Utc>) -> Result<(), InventoryError> {
        if qty <= 0 {
            return Err(InventoryError::invalid_input(
                "reserve quantity must be positive",
            ));
        }
        if self.available() < qty {
            return Err(InventoryError::insufficient_stock(self.key.product_id));
        }
        self.reserved_quantity += qty;
        self.updated_at = now;
        Ok(())
    }

    /// Give back up to `qty` held units. Returns the amount actually released
    /// (floored so `reserved_quantity` never goes negative).
    pub fn release_hold(&mut self, qty: i64, now: DateTime<Utc>) -> i64 {
        let released = qty.max(0).min(self.reserved_quantity);
        self.reserved_quantity -= released;
        self.updated_at = now;
        released
    }

    /// Convert up to `qty` held units into a permanent deduction: both
    /// `reserved_quantity` and `quantity` drop by the consumed amount, floored
    /// at zero.
    pub fn consume_hold(&mut self, qty: i64, now: DateTime<Utc>) -> ConsumedHold {
        let previous = self.quantity;
        let qty = qty.max(0);
        self.reserved_quantity = (self.reserved_quantity - qty).max(0);
        self.quantity = (self.quantity - qty).max(0);
        self.reserved_quantity = self.reserved_quantity.min(self.quantity);
        self.updated_at = now;
        ConsumedHold {
            previous_stock: previous,
            new_stock: self.quantity,
        }
    }
}
