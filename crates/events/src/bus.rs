//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is intentionally lightweight and transport-agnostic: the same
//! contract works for an in-memory channel in tests and for an SSE/WebSocket
//! hub or message broker in production. Delivery is best-effort broadcast —
//! every subscriber gets a copy of every published message, subscribers may
//! see duplicates, and nothing is persisted. The row store, not the bus, is
//! the source of truth; a listener that misses an event can always re-read
//! current state.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a stream of published messages.
///
/// Designed for single-threaded consumption: one subscription per consumer
/// thread, typically drained in a `recv_timeout` loop so the consumer can
/// also check for shutdown.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Pub/sub seam between the engine and external listeners.
///
/// `publish()` may fail (transport down, bus full); callers in the mutation
/// path must treat that as a dropped notification, never as a failed
/// operation — see [`crate::Notifier`].
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
