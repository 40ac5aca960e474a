//! Requisition workflow domain module.
//!
//! This crate contains the business rules for equipment requisitions,
//! implemented purely as deterministic domain logic (no IO, no storage, no
//! delivery). It decides whether a status change is legal, what the record
//! looks like afterwards, and who has to hear about it.

pub mod audit;
pub mod email;
pub mod engine;
pub mod notification;
pub mod query;
pub mod recipients;
pub mod requisition;
pub mod rules;
pub mod updates;
pub mod workflow;

pub use audit::{AuditAction, AuditEntry};
pub use email::{EmailMessage, render_email};
pub use engine::{Plan, SideEffect, plan_creation, plan_transition};
pub use notification::{Notification, NotificationType};
pub use query::{RequisitionFilter, RequisitionSummary};
pub use recipients::{resolve_audience, resolve_recipients};
pub use requisition::{
    DecisionDetails, DeploymentDetails, FulfillmentDetails, NewRequisition, PaymentDetails,
    PricingDetails, RequesterSnapshot, Requisition, RequisitionStatus, RouterType,
};
pub use rules::{Audience, StatusRule, rule_for};
pub use updates::{FieldUpdates, UpdateField};
pub use workflow::{allowed_targets, authorize_transition, can_transition};

pub use rust_decimal::Decimal;
