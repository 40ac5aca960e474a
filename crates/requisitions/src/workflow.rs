//! The requisition workflow graph.
//!
//! One table answers three questions about every edge: is it legal, which
//! fields must accompany it, and which fields may it write.

use reqflow_auth::Role;
use reqflow_core::{DomainError, DomainResult};

use crate::requisition::RequisitionStatus;
use crate::updates::UpdateField;

use RequisitionStatus::*;

/// Legal successors of `from`. Terminal statuses have none.
pub fn allowed_targets(from: RequisitionStatus) -> &'static [RequisitionStatus] {
    match from {
        Pending => &[Fulfilled, PricingNeeded],
        PricingNeeded => &[PricingReceived],
        PricingReceived => &[Approved, Rejected],
        Approved => &[Paid],
        Paid => &[Fulfilled],
        Fulfilled => &[Deployed],
        Rejected | Deployed => &[],
    }
}

pub fn can_transition(from: RequisitionStatus, to: RequisitionStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Reject `from -> to` unless it is an edge of the graph.
pub fn ensure_transition(from: RequisitionStatus, to: RequisitionStatus) -> DomainResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(DomainError::invalid_transition(from, to))
    }
}

/// Fields that must carry a value for a transition into `target`.
pub fn required_fields(target: RequisitionStatus) -> &'static [UpdateField] {
    match target {
        Rejected => &[UpdateField::RejectionReason],
        Paid => &[UpdateField::PaidBy, UpdateField::PaymentReference],
        Fulfilled => &[UpdateField::FulfilledBy],
        Deployed => &[
            UpdateField::AssignedEngineerId,
            UpdateField::AssignedEngineerName,
        ],
        Approved => &[UpdateField::ApprovedBy],
        PricingReceived => &[UpdateField::Pricing, UpdateField::PricingAddedBy],
        Pending | PricingNeeded => &[],
    }
}

/// Fields a transition into `target` is allowed to write.
pub fn owned_fields(target: RequisitionStatus) -> &'static [UpdateField] {
    match target {
        PricingReceived => &[
            UpdateField::Pricing,
            UpdateField::PricingNotes,
            UpdateField::PricingAddedBy,
        ],
        Approved => &[UpdateField::ApprovedBy],
        Rejected => &[UpdateField::RejectionReason, UpdateField::ApprovedBy],
        Paid => &[UpdateField::PaidBy, UpdateField::PaymentReference],
        Fulfilled => &[UpdateField::FulfilledBy],
        Deployed => &[
            UpdateField::AssignedEngineerId,
            UpdateField::AssignedEngineerName,
        ],
        Pending | PricingNeeded => &[],
    }
}

/// Role expected to move a requisition into `target`.
///
/// `pending` is only ever entered by creation, which every role may do.
pub fn acting_role(target: RequisitionStatus) -> Option<Role> {
    match target {
        Pending => None,
        PricingNeeded | Fulfilled => Some(Role::StoreManager),
        PricingReceived => Some(Role::Projects),
        Approved | Rejected => Some(Role::Management),
        Paid => Some(Role::Accounts),
        Deployed => Some(Role::Csnoc),
    }
}

/// Check that `role` may perform a transition into `target`. Admins may perform any.
pub fn authorize_transition(role: Role, target: RequisitionStatus) -> DomainResult<()> {
    if role == Role::Admin || acting_role(target) == Some(role) {
        return Ok(());
    }
    Err(DomainError::unauthorized(format!(
        "role {role} cannot move a requisition to {target}"
    )))
}
