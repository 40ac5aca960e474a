//! Transition engine: pure decision logic for creating and advancing requisitions.
//!
//! Functions here never perform IO. They validate the request against the
//! current state, compute the next `Requisition` value, and describe the
//! notifications that should follow as `SideEffect`s. Persisting the record
//! and carrying out the effects belongs to the caller.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use reqflow_auth::Actor;
use reqflow_core::{DomainError, DomainResult, RequisitionId};

use crate::notification::NotificationType;
use crate::requisition::{
    DecisionDetails, DeploymentDetails, FulfillmentDetails, NewRequisition, PaymentDetails,
    PricingDetails, RequesterSnapshot, Requisition, RequisitionStatus,
};
use crate::rules::{Audience, requester_status_message, rule_for};
use crate::updates::{FieldUpdates, UpdateField, clean};
use crate::workflow::{ensure_transition, owned_fields, required_fields};

/// Follow-up work requested by a creation or transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Raise an in-app notification for every user in `audience`.
    Notify {
        audience: Audience,
        message: String,
        kind: NotificationType,
    },
    /// Email the stage template to the recipients resolved for `status`.
    EmailBatch { status: RequisitionStatus },
}

/// Outcome of planning a creation or a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub requisition: Requisition,
    /// `None` for a creation.
    pub previous_status: Option<RequisitionStatus>,
    pub effects: Vec<SideEffect>,
}

/// Validate `input` and build a new `pending` requisition with id `id`.
pub fn plan_creation(
    id: RequisitionId,
    input: &NewRequisition,
    requester: &Actor,
    now: DateTime<Utc>,
) -> DomainResult<Plan> {
    if input.quantity < 1 {
        return Err(DomainError::validation("quantity must be at least 1"));
    }
    let quantity = u32::try_from(input.quantity)
        .map_err(|_| DomainError::validation("quantity is too large"))?;

    let requisition = Requisition {
        id,
        requester: RequesterSnapshot::from(requester),
        router_type: input.router_type,
        quantity,
        notes: input.notes.trim().to_string(),
        status: RequisitionStatus::Pending,
        created_at: now,
        updated_at: now,
        pricing: None,
        decision: None,
        payment: None,
        fulfillment: None,
        deployment: None,
    };

    // No "status updated" notice at creation: only the pending audience hears about it.
    let mut effects = targeted_notices(&requisition);
    effects.push(SideEffect::EmailBatch {
        status: RequisitionStatus::Pending,
    });

    Ok(Plan {
        requisition,
        previous_status: None,
        effects,
    })
}

/// Validate a move of `current` into `target` and compute the resulting record.
///
/// Fails without side effects when the edge is not in the workflow graph,
/// when a required field is missing, when a supplied field belongs to a
/// different stage, or when the price is not positive or its total over
/// the requisition's quantity cannot be represented.
pub fn plan_transition(
    current: &Requisition,
    target: RequisitionStatus,
    updates: &FieldUpdates,
    now: DateTime<Utc>,
) -> DomainResult<Plan> {
    ensure_transition(current.status, target)?;

    for field in required_fields(target) {
        if !updates.has(*field) {
            return Err(DomainError::missing_field(target, field.as_str()));
        }
    }

    for field in updates.supplied() {
        if !owned_fields(target).contains(&field) {
            return Err(DomainError::validation(format!(
                "field '{field}' cannot be set when moving to {target}"
            )));
        }
    }

    if let Some(price) = updates.pricing {
        if price <= Decimal::ZERO {
            return Err(DomainError::validation("pricing must be greater than zero"));
        }
        if price.checked_mul(Decimal::from(current.quantity)).is_none() {
            return Err(DomainError::validation("pricing × quantity is too large"));
        }
    }

    let stamp = next_timestamp(current.updated_at, now);
    let mut next = current.clone();
    next.status = target;
    next.updated_at = stamp;
    enrich(&mut next, target, updates, stamp)?;

    let mut effects = vec![SideEffect::Notify {
        audience: Audience::Requester,
        message: requester_status_message(&next),
        kind: NotificationType::Info,
    }];
    effects.extend(targeted_notices(&next));
    effects.push(SideEffect::EmailBatch { status: target });

    Ok(Plan {
        requisition: next,
        previous_status: Some(current.status),
        effects,
    })
}

/// A timestamp strictly after `previous`: `now`, or `previous` + 1µs if the
/// clock has not moved forward.
pub fn next_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn targeted_notices(req: &Requisition) -> Vec<SideEffect> {
    rule_for(req.status)
        .notices
        .iter()
        .map(|rule| SideEffect::Notify {
            audience: rule.audience,
            message: rule.template.render(req),
            kind: rule.kind,
        })
        .collect()
}

/// Fill in the stage details owned by `target`. Details already present are kept.
fn enrich(
    next: &mut Requisition,
    target: RequisitionStatus,
    updates: &FieldUpdates,
    at: DateTime<Utc>,
) -> DomainResult<()> {
    match target {
        RequisitionStatus::Pending | RequisitionStatus::PricingNeeded => {}
        RequisitionStatus::PricingReceived => {
            if next.pricing.is_none() {
                let pricing = updates.pricing.ok_or_else(|| {
                    DomainError::missing_field(target, UpdateField::Pricing.as_str())
                })?;
                let added_by = required_text(
                    &updates.pricing_added_by,
                    target,
                    UpdateField::PricingAddedBy,
                )?;
                next.pricing = Some(PricingDetails {
                    pricing,
                    pricing_notes: clean(&updates.pricing_notes),
                    pricing_added_by: added_by,
                    pricing_added_at: at,
                });
            }
        }
        RequisitionStatus::Approved => {
            if next.decision.is_none() {
                let approved_by =
                    required_text(&updates.approved_by, target, UpdateField::ApprovedBy)?;
                next.decision = Some(DecisionDetails {
                    approved_by: Some(approved_by),
                    approved_at: at,
                    rejection_reason: None,
                });
            }
        }
        RequisitionStatus::Rejected => {
            if next.decision.is_none() {
                let reason = required_text(
                    &updates.rejection_reason,
                    target,
                    UpdateField::RejectionReason,
                )?;
                next.decision = Some(DecisionDetails {
                    approved_by: clean(&updates.approved_by),
                    approved_at: at,
                    rejection_reason: Some(reason),
                });
            }
        }
        RequisitionStatus::Paid => {
            if next.payment.is_none() {
                let reference = required_text(
                    &updates.payment_reference,
                    target,
                    UpdateField::PaymentReference,
                )?;
                next.payment = Some(PaymentDetails {
                    paid_by: required_text(&updates.paid_by, target, UpdateField::PaidBy)?,
                    paid_at: at,
                    payment_reference: reference,
                });
            }
        }
        RequisitionStatus::Fulfilled => {
            if next.fulfillment.is_none() {
                let fulfilled_by =
                    required_text(&updates.fulfilled_by, target, UpdateField::FulfilledBy)?;
                next.fulfillment = Some(FulfillmentDetails {
                    fulfilled_by,
                    fulfilled_at: at,
                });
            }
        }
        RequisitionStatus::Deployed => {
            if next.deployment.is_none() {
                let engineer_id = updates.assigned_engineer_id.clone().ok_or_else(|| {
                    DomainError::missing_field(target, UpdateField::AssignedEngineerId.as_str())
                })?;
                let engineer_name = required_text(
                    &updates.assigned_engineer_name,
                    target,
                    UpdateField::AssignedEngineerName,
                )?;
                next.deployment = Some(DeploymentDetails {
                    assigned_engineer_id: engineer_id,
                    assigned_engineer_name: engineer_name,
                    deployed_at: at,
                });
            }
        }
    }
    Ok(())
}

fn required_text(
    value: &Option<String>,
    target: RequisitionStatus,
    field: UpdateField,
) -> DomainResult<String> {
    clean(value).ok_or_else(|| DomainError::missing_field(target, field.as_str()))
}
