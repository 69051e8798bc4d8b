//! Tracing setup for stockbook embedders.
//!
//! Ledger appends, audit records and event publishes are all best-effort:
//! when one fails, the engine's only trace of it is a log line. Call
//! [`init`] before wiring up an engine so those warnings land somewhere.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::SystemTime;

/// Install the process-wide subscriber: JSON lines to stdout, filtered via
/// `RUST_LOG` with an `info` default.
///
/// Repeated calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(SystemTime)
        .with_target(false)
        .try_init();
}
