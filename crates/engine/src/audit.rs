//! Admin-visible audit records (distinct from the stock ledger).

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockbook_core::{Actor, InventoryError, InventoryResult};

/// One audit record: who did what to which entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Dotted action name, e.g. `inventory.reserve`.
    pub action: String,
    /// Entity kind, e.g. `Product` or `Order`.
    pub entity: String,
    pub entity_id: String,
    pub actor: Actor,
    pub meta: JsonValue,
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        action: impl Into<String>,
        entity: impl Into<String>,
        entity_id: impl ToString,
        actor: Actor,
        meta: JsonValue,
    ) -> Self {
        Self {
            action: action.into(),
            entity: entity.into(),
            entity_id: entity_id.to_string(),
            actor,
            meta,
            at: Utc::now(),
        }
    }
}

/// Sink for audit records. Best-effort: the engine logs and drops failures
/// instead of failing the operation being audited.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord) -> InventoryResult<()>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, record: AuditRecord) -> InventoryResult<()> {
        (**self).record(record)
    }
}

/// In-memory audit sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    inner: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.inner.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: AuditRecord) -> InventoryResult<()> {
        let mut records = self
            .inner
            .lock()
            .map_err(|_| InventoryError::store("audit sink lock poisoned"))?;
        records.push(record);
        Ok(())
    }
}

/// Log-and-drop helper used by every orchestrator.
pub(crate) fn record_best_effort(sink: &dyn AuditSink, record: AuditRecord) {
    let action = record.action.clone();
    if let Err(e) = sink.record(record) {
        tracing::warn!(action = %action, error = %e, "dropped audit record");
    }
}
