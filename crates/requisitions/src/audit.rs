use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqflow_auth::Actor;
use reqflow_core::{AuditEntryId, Entity, RequisitionId, UserId};

use crate::engine::Plan;
use crate::requisition::RequisitionStatus;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
}

/// History record written for every creation and every applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub requisition_id: RequisitionId,
    /// `None` when the caller did not say who acted.
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
    pub action: AuditAction,
    pub previous_status: Option<RequisitionStatus>,
    pub new_status: RequisitionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Describe an applied plan.
    pub fn for_plan(plan: &Plan, actor: Option<&Actor>) -> Self {
        let req = &plan.requisition;
        let action = match plan.previous_status {
            None => AuditAction::Created,
            Some(_) => AuditAction::StatusChanged,
        };
        let notes = match action {
            AuditAction::Created => Some(format!("{} x {}", req.quantity(), req.router_type())),
            AuditAction::StatusChanged => req
                .decision()
                .and_then(|d| d.rejection_reason.clone())
                .filter(|_| req.status() == RequisitionStatus::Rejected),
        };

        Self {
            id: AuditEntryId::new(),
            requisition_id: req.id().clone(),
            user_id: actor.map(|a| a.id.clone()),
            user_name: actor.map(|a| a.name.clone()),
            action,
            previous_status: plan.previous_status,
            new_status: req.status(),
            notes,
            created_at: req.updated_at(),
        }
    }
}

impl Entity for AuditEntry {
    type Id = AuditEntryId;
    const KIND: &'static str = "audit entry";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
