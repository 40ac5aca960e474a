//! Stage email templates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use reqflow_auth::{Role, User};
use reqflow_core::RequisitionId;

use crate::requisition::{Requisition, RequisitionStatus};

const SIGNATURE: &str = "Best regards,\nRequisition Management System";

/// A rendered email for one recipient. The sender address is added by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub requisition_id: RequisitionId,
    pub stage: RequisitionStatus,
}

/// Render the `stage` email for `recipient`.
///
/// Where a stage asks someone to act, the closing sentence depends on whether
/// the recipient holds the role expected to act.
pub fn render_email(req: &Requisition, stage: RequisitionStatus, recipient: &User) -> EmailMessage {
    let id = req.id();
    let unit_price = money(req.unit_price());
    let total = money(req.total_cost());
    let summary = format!(
        "Router Type: {}\nQuantity: {}",
        req.router_type(),
        req.quantity()
    );
    let notes = if req.notes().is_empty() { "-" } else { req.notes() };

    let (subject, details, closing) = match stage {
        RequisitionStatus::Pending => (
            format!("New Requisition {id} Submitted"),
            format!(
                "A new requisition has been submitted:\n\n\
                 Requisition ID: {id}\nRequester: {}\n{summary}\nNotes: {notes}",
                req.requester().name
            ),
            "Please review this requisition in your dashboard.".to_string(),
        ),
        RequisitionStatus::PricingNeeded => (
            format!("Pricing Required for Requisition {id}"),
            format!(
                "Requisition {id} requires pricing information:\n\n\
                 {summary}\nNotes: {notes}\nRequester: {}",
                req.requester().name
            ),
            "Please provide pricing details in your dashboard.".to_string(),
        ),
        RequisitionStatus::PricingReceived => (
            format!("Pricing Received for Requisition {id}"),
            format!(
                "Pricing has been received for requisition {id}:\n\n{summary}\n\
                 Unit Price: {unit_price}\nTotal Cost: {total}\nRequester: {}",
                req.requester().name
            ),
            call_to_action(
                recipient,
                Role::Management,
                "Please review and approve/reject this requisition.",
                "Awaiting management approval.",
            ),
        ),
        RequisitionStatus::Approved => (
            format!("Requisition {id} Approved"),
            format!(
                "Requisition {id} has been approved:\n\n\
                 {summary}\nTotal Cost: {total}\nApproved By: {}",
                req.decision()
                    .and_then(|d| d.approved_by.as_deref())
                    .unwrap_or("Management")
            ),
            call_to_action(
                recipient,
                Role::Accounts,
                "Please process payment for this requisition.",
                "Payment processing will begin shortly.",
            ),
        ),
        RequisitionStatus::Rejected => (
            format!("Requisition {id} Rejected"),
            format!(
                "Unfortunately, requisition {id} has been rejected:\n\n\
                 {summary}\nReason for Rejection: {}",
                req.decision()
                    .and_then(|d| d.rejection_reason.as_deref())
                    .unwrap_or("Not specified")
            ),
            "Please contact management if you have questions.".to_string(),
        ),
        RequisitionStatus::Paid => (
            format!("Payment Processed for Requisition {id}"),
            format!(
                "Payment has been processed for requisition {id}:\n\n{summary}\n\
                 Amount Paid: {total}\nPayment Reference: {}",
                req.payment().map(|p| p.payment_reference.as_str()).unwrap_or("N/A")
            ),
            call_to_action(
                recipient,
                Role::StoreManager,
                "Please fulfill this requisition and update the status.",
                "The store manager will fulfill this order.",
            ),
        ),
        RequisitionStatus::Fulfilled => (
            format!("Requisition {id} Fulfilled"),
            format!("Requisition {id} has been fulfilled:\n\n{summary}\nNotes: {notes}"),
            call_to_action(
                recipient,
                Role::Csnoc,
                "Please assign a field engineer for deployment.",
                "Deployment assignment is in progress.",
            ),
        ),
        RequisitionStatus::Deployed => (
            format!("Requisition {id} Deployed"),
            format!(
                "Requisition {id} has been successfully deployed:\n\n{summary}\nDeployed By: {}",
                req.deployment()
                    .map(|d| d.assigned_engineer_name.as_str())
                    .unwrap_or("Field Engineer")
            ),
            "This requisition is now complete.".to_string(),
        ),
    };

    EmailMessage {
        to: recipient.email.clone(),
        subject,
        body: format!(
            "Hello {},\n\n{details}\n\n{closing}\n\n{SIGNATURE}\n",
            recipient.name
        ),
        requisition_id: id.clone(),
        stage,
    }
}

fn call_to_action(recipient: &User, actor: Role, act: &str, wait: &str) -> String {
    let line = if recipient.role == actor { act } else { wait };
    line.to_string()
}

fn money(amount: Option<Decimal>) -> String {
    amount
        .map(|a| format!("${}", format_amount(a)))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Two-decimal rounding, trailing zeros dropped, thousands separated: `12500` -> `12,500`.
pub fn format_amount(value: Decimal) -> String {
    let text = value.round_dp(2).normalize().abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + text.len() / 3 + 1);
    if value.is_sign_negative() && !value.is_zero() {
        out.push('-');
    }
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{plan_creation, plan_transition};
    use crate::requisition::{NewRequisition, RouterType};
    use crate::updates::FieldUpdates;
    use chrono::Utc;
    use reqflow_auth::Actor;
    use reqflow_core::UserId;

    fn user(id: &str, name: &str, role: Role) -> User {
        User::new(UserId::new(id), &format!("{id}@sprintug.com"), name, role, Utc::now()).unwrap()
    }

    fn priced() -> Requisition {
        let requester = user("1", "John Doe", Role::FieldEngineer);
        let created = plan_creation(
            RequisitionId::from_sequence(2, 3),
            &NewRequisition::new(RouterType::Mikrotik, 5, "Replacement units"),
            &Actor::from(&requester),
            Utc::now(),
        )
        .unwrap()
        .requisition;
        let needed = plan_transition(
            &created,
            RequisitionStatus::PricingNeeded,
            &FieldUpdates::new(),
            Utc::now(),
        )
        .unwrap()
        .requisition;
        plan_transition(
            &needed,
            RequisitionStatus::PricingReceived,
            &FieldUpdates::new().pricing(Decimal::from(2500), "Bob Wilson"),
            Utc::now(),
        )
        .unwrap()
        .requisition
    }

    #[test]
    fn formats_amounts_with_grouping() {
        assert_eq!(format_amount(Decimal::from(12_500)), "12,500");
        assert_eq!(format_amount(Decimal::from(999)), "999");
        assert_eq!(format_amount(Decimal::new(1_234_567_5, 1)), "1,234,567.5");
        assert_eq!(format_amount(Decimal::new(-10005, 2)), "-100.05");
    }

    #[test]
    fn pricing_received_email_shows_totals_and_role_specific_closing() {
        let req = priced();
        let manager = user("4", "Alice Johnson", Role::Management);
        let store = user("2", "Jane Smith", Role::StoreManager);

        let to_manager = render_email(&req, RequisitionStatus::PricingReceived, &manager);
        assert_eq!(to_manager.subject, "Pricing Received for Requisition REQ-002");
        assert_eq!(to_manager.to, "4@sprintug.com");
        assert!(to_manager.body.starts_with("Hello Alice Johnson,"));
        assert!(to_manager.body.contains("Unit Price: $2,500"));
        assert!(to_manager.body.contains("Total Cost: $12,500"));
        assert!(to_manager.body.contains("Please review and approve/reject"));

        let to_store = render_email(&req, RequisitionStatus::PricingReceived, &store);
        assert!(to_store.body.contains("Awaiting management approval."));
    }

    #[test]
    fn unpriced_requisition_renders_not_available() {
        let req = priced();
        let created = plan_creation(
            req.id().clone(),
            &NewRequisition::new(RouterType::Other, 1, ""),
            &Actor::from(&user("1", "John Doe", Role::FieldEngineer)),
            Utc::now(),
        )
        .unwrap()
        .requisition;
        let accounts = user("5", "Charlie", Role::Accounts);
        let mail = render_email(&created, RequisitionStatus::Approved, &accounts);
        assert!(mail.body.contains("Total Cost: N/A"));
        assert!(mail.body.contains("Approved By: Management"));
        assert!(mail.body.contains("Please process payment"));
    }

    #[test]
    fn every_stage_has_a_subject_naming_the_requisition() {
        let req = priced();
        let recipient = user("1", "John Doe", Role::FieldEngineer);
        for stage in RequisitionStatus::ALL {
            let mail = render_email(&req, stage, &recipient);
            assert!(mail.subject.contains("REQ-002"), "{stage}");
            assert_eq!(mail.stage, stage);
            assert!(mail.body.ends_with("Requisition Management System\n"));
        }
    }
}
