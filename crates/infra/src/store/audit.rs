use std::sync::{Arc, RwLock};

use reqflow_core::RequisitionId;
use reqflow_requisitions::AuditEntry;

/// Append-only history of applied creations and transitions.
pub trait AuditLog: Send + Sync {
    fn append(&self, entry: AuditEntry);
    /// Oldest first.
    fn for_requisition(&self, requisition_id: &RequisitionId) -> Vec<AuditEntry>;
}

impl<S> AuditLog for Arc<S>
where
    S: AuditLog + ?Sized,
{
    fn append(&self, entry: AuditEntry) {
        (**self).append(entry)
    }

    fn for_requisition(&self, requisition_id: &RequisitionId) -> Vec<AuditEntry> {
        (**self).for_requisition(requisition_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(entry);
        }
    }

    fn for_requisition(&self, requisition_id: &RequisitionId) -> Vec<AuditEntry> {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => return vec![],
        };

        entries
            .iter()
            .filter(|e| &e.requisition_id == requisition_id)
            .cloned()
            .collect()
    }
}
