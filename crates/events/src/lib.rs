//! Stock-change event fan-out.
//!
//! Events here are **notifications**, not state: the row store is always
//! authoritative and every consumer (cache invalidators, live dashboards)
//! must tolerate missed or duplicated deliveries.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod notifier;

pub use bus::{EventBus, Subscription};
pub use event::{
    LowStockFlagged, StockConfirmed, StockEvent, StockLevel, StockReleased, StockReserved,
    StockUpdated,
};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notifier::Notifier;
