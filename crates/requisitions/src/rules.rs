//! Who hears about each status, and what they are told.
//!
//! Both notification paths read this one table: the email audience comes from
//! `email_roles` (plus the requester, see `crate::recipients`), and the in-app
//! notices come from `notices`.

use reqflow_auth::Role;

use crate::notification::NotificationType;
use crate::requisition::{Requisition, RequisitionStatus};

/// Target of an in-app notice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Audience {
    /// The user who raised the requisition.
    Requester,
    /// Every user currently holding the role.
    Role(Role),
}

/// Wording of a targeted in-app notice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NoticeTemplate {
    Submitted,
    NeedsPricing,
    AwaitingApproval,
    PricingReceived,
    ReadyForPayment,
    Rejected,
    ReadyToFulfill,
    ReadyForDeployment,
    Deployed,
}

impl NoticeTemplate {
    pub fn render(self, req: &Requisition) -> String {
        let id = req.id();
        match self {
            NoticeTemplate::Submitted => {
                format!("New requisition {id} submitted by {}", req.requester().name)
            }
            NoticeTemplate::NeedsPricing => format!("Requisition {id} needs pricing"),
            NoticeTemplate::AwaitingApproval => {
                format!("Requisition {id} has received pricing and awaits approval")
            }
            NoticeTemplate::PricingReceived => format!("Pricing received for requisition {id}"),
            NoticeTemplate::ReadyForPayment => {
                format!("Requisition {id} approved and ready for payment")
            }
            NoticeTemplate::Rejected => format!("Requisition {id} was rejected"),
            NoticeTemplate::ReadyToFulfill => {
                format!("Requisition {id} has been paid and is ready to fulfill")
            }
            NoticeTemplate::ReadyForDeployment => {
                format!("Requisition {id} fulfilled and ready for deployment assignment")
            }
            NoticeTemplate::Deployed => format!("Requisition {id} has been deployed"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NoticeRule {
    pub audience: Audience,
    pub kind: NotificationType,
    pub template: NoticeTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRule {
    pub status: RequisitionStatus,
    /// Roles that receive the stage email (the requester always does too).
    pub email_roles: &'static [Role],
    /// Targeted in-app notices raised on entering the status.
    pub notices: &'static [NoticeRule],
}

const fn notice(
    audience: Audience,
    kind: NotificationType,
    template: NoticeTemplate,
) -> NoticeRule {
    NoticeRule {
        audience,
        kind,
        template,
    }
}

static RULES: [StatusRule; 8] = [
    StatusRule {
        status: RequisitionStatus::Pending,
        email_roles: &[Role::StoreManager],
        notices: &[notice(
            Audience::Role(Role::StoreManager),
            NotificationType::Info,
            NoticeTemplate::Submitted,
        )],
    },
    StatusRule {
        status: RequisitionStatus::PricingNeeded,
        email_roles: &[Role::Projects],
        notices: &[notice(
            Audience::Role(Role::Projects),
            NotificationType::Info,
            NoticeTemplate::NeedsPricing,
        )],
    },
    StatusRule {
        status: RequisitionStatus::PricingReceived,
        email_roles: &[Role::Management, Role::StoreManager],
        notices: &[
            notice(
                Audience::Role(Role::Management),
                NotificationType::Info,
                NoticeTemplate::AwaitingApproval,
            ),
            notice(
                Audience::Role(Role::StoreManager),
                NotificationType::Info,
                NoticeTemplate::PricingReceived,
            ),
        ],
    },
    StatusRule {
        status: RequisitionStatus::Approved,
        email_roles: &[Role::Accounts],
        notices: &[notice(
            Audience::Role(Role::Accounts),
            NotificationType::Success,
            NoticeTemplate::ReadyForPayment,
        )],
    },
    StatusRule {
        status: RequisitionStatus::Rejected,
        email_roles: &[],
        notices: &[notice(
            Audience::Role(Role::StoreManager),
            NotificationType::Warning,
            NoticeTemplate::Rejected,
        )],
    },
    StatusRule {
        status: RequisitionStatus::Paid,
        email_roles: &[Role::StoreManager],
        notices: &[notice(
            Audience::Role(Role::StoreManager),
            NotificationType::Success,
            NoticeTemplate::ReadyToFulfill,
        )],
    },
    StatusRule {
        status: RequisitionStatus::Fulfilled,
        email_roles: &[Role::Csnoc],
        notices: &[notice(
            Audience::Role(Role::Csnoc),
            NotificationType::Info,
            NoticeTemplate::ReadyForDeployment,
        )],
    },
    StatusRule {
        status: RequisitionStatus::Deployed,
        email_roles: &[],
        notices: &[notice(
            Audience::Requester,
            NotificationType::Success,
            NoticeTemplate::Deployed,
        )],
    },
];

pub fn rule_for(status: RequisitionStatus) -> &'static StatusRule {
    let idx = match status {
        RequisitionStatus::Pending => 0,
        RequisitionStatus::PricingNeeded => 1,
        RequisitionStatus::PricingReceived => 2,
        RequisitionStatus::Approved => 3,
        RequisitionStatus::Rejected => 4,
        RequisitionStatus::Paid => 5,
        RequisitionStatus::Fulfilled => 6,
        RequisitionStatus::Deployed => 7,
    };
    &RULES[idx]
}

/// Generic notice sent to the requester on every transition.
pub fn requester_status_message(req: &Requisition) -> String {
    format!(
        "Requisition {} status updated to {}",
        req.id(),
        req.status().label()
    )
}
