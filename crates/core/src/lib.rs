//! `stockbook-core` — shared identifiers and the domain error model.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod actor;
pub mod error;
pub mod id;

pub use actor::Actor;
pub use error::{InventoryError, InventoryResult};
pub use id::{OrderId, ProductId, RowKey, UserId, WarehouseId};
