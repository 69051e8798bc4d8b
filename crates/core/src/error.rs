//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the inventory engine.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Inventory-level error.
///
/// Keep this focused on deterministic, business/domain failures. Best-effort
/// side channels (ledger appends, notifications, audit records) never surface
/// through this type — they are logged and dropped at the call site.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// A reserve line asked for more than is available on its row. Names the
    /// offending product; the whole reservation was rejected.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Malformed quantities or identifiers, rejected before any row is touched.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced product has no inventory row and no creation context.
    #[error("not found")]
    NotFound,

    /// The persistence layer failed mid-operation.
    #[error("store failure: {0}")]
    Store(String),
}

impl InventoryError {
    pub fn insufficient_stock(product_id: ProductId) -> Self {
        Self::InsufficientStock { product_id }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
