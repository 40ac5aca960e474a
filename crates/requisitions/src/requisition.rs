use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use reqflow_auth::Actor;
use reqflow_core::{DomainError, Entity, RequisitionId, UserId};

/// Equipment that can be requisitioned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouterType {
    #[serde(rename = "Cisco ISR 4000")]
    CiscoIsr4000,
    #[serde(rename = "Cisco ASR 1000")]
    CiscoAsr1000,
    #[serde(rename = "Juniper MX Series")]
    JuniperMxSeries,
    #[serde(rename = "Mikrotik")]
    Mikrotik,
    #[serde(rename = "Other")]
    Other,
}

impl RouterType {
    pub const ALL: [RouterType; 5] = [
        RouterType::CiscoIsr4000,
        RouterType::CiscoAsr1000,
        RouterType::JuniperMxSeries,
        RouterType::Mikrotik,
        RouterType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RouterType::CiscoIsr4000 => "Cisco ISR 4000",
            RouterType::CiscoAsr1000 => "Cisco ASR 1000",
            RouterType::JuniperMxSeries => "Juniper MX Series",
            RouterType::Mikrotik => "Mikrotik",
            RouterType::Other => "Other",
        }
    }
}

impl core::fmt::Display for RouterType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouterType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        RouterType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unrecognized router type '{s}'")))
    }
}

/// Requisition status lifecycle.
///
/// ```text
/// pending -> fulfilled | pricing_needed
/// pricing_needed -> pricing_received
/// pricing_received -> approved | rejected
/// approved -> paid
/// paid -> fulfilled
/// fulfilled -> deployed
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    Pending,
    PricingNeeded,
    PricingReceived,
    Approved,
    Rejected,
    Paid,
    Fulfilled,
    Deployed,
}

impl RequisitionStatus {
    pub const ALL: [RequisitionStatus; 8] = [
        RequisitionStatus::Pending,
        RequisitionStatus::PricingNeeded,
        RequisitionStatus::PricingReceived,
        RequisitionStatus::Approved,
        RequisitionStatus::Rejected,
        RequisitionStatus::Paid,
        RequisitionStatus::Fulfilled,
        RequisitionStatus::Deployed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequisitionStatus::Pending => "pending",
            RequisitionStatus::PricingNeeded => "pricing_needed",
            RequisitionStatus::PricingReceived => "pricing_received",
            RequisitionStatus::Approved => "approved",
            RequisitionStatus::Rejected => "rejected",
            RequisitionStatus::Paid => "paid",
            RequisitionStatus::Fulfilled => "fulfilled",
            RequisitionStatus::Deployed => "deployed",
        }
    }

    /// Wording used in user-facing messages ("pricing needed").
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequisitionStatus::Rejected | RequisitionStatus::Deployed)
    }

    /// Approved or any status that can only follow an approval.
    pub fn is_approved_or_later(self) -> bool {
        matches!(
            self,
            RequisitionStatus::Approved
                | RequisitionStatus::Paid
                | RequisitionStatus::Fulfilled
                | RequisitionStatus::Deployed
        )
    }
}

impl core::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequisitionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        RequisitionStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown requisition status '{s}'")))
    }
}

/// Requester identity captured when the requisition was raised.
///
/// A copy, not a reference: renaming the user later leaves this untouched.
/// Persisted as `requesterId`, `requesterName` and `requesterEmail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterSnapshot {
    #[serde(rename = "requesterId")]
    pub id: UserId,
    #[serde(rename = "requesterName")]
    pub name: String,
    #[serde(rename = "requesterEmail")]
    pub email: String,
}

impl From<&Actor> for RequesterSnapshot {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id.clone(),
            name: actor.name.clone(),
            email: actor.email.clone(),
        }
    }
}

/// Added by Projects when moving to `pricing_received`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDetails {
    /// Unit price.
    pub pricing: Decimal,
    pub pricing_notes: Option<String>,
    pub pricing_added_by: String,
    pub pricing_added_at: DateTime<Utc>,
}

/// Added by Management when approving or rejecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionDetails {
    pub approved_by: Option<String>,
    pub approved_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

/// Added by Accounts when moving to `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub paid_by: String,
    pub paid_at: DateTime<Utc>,
    pub payment_reference: String,
}

/// Added by the Store Manager when moving to `fulfilled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentDetails {
    pub fulfilled_by: String,
    pub fulfilled_at: DateTime<Utc>,
}

/// Added by CSNOC when moving to `deployed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDetails {
    pub assigned_engineer_id: UserId,
    pub assigned_engineer_name: String,
    pub deployed_at: DateTime<Utc>,
}

/// Input for raising a new requisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequisition {
    pub router_type: RouterType,
    /// Signed so that out-of-range input can be reported instead of wrapping.
    pub quantity: i64,
    #[serde(default)]
    pub notes: String,
}

impl NewRequisition {
    pub fn new(router_type: RouterType, quantity: i64, notes: impl Into<String>) -> Self {
        Self {
            router_type,
            quantity,
            notes: notes.into(),
        }
    }

    /// Build from untyped form input, validating the router type name.
    pub fn parse(
        router_type: &str,
        quantity: i64,
        notes: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(router_type.parse()?, quantity, notes))
    }
}

/// Entity: Requisition.
///
/// Fields are read-only outside this crate; the transition engine
/// (`crate::engine`) is the only code that produces modified copies. Stage
/// details are filled in once by the transition that owns them and are never
/// cleared afterwards.
///
/// Serialized flat: the requester snapshot and every stage's fields sit at
/// the top level, and fields of a stage not yet reached are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    pub(crate) id: RequisitionId,
    #[serde(flatten)]
    pub(crate) requester: RequesterSnapshot,
    pub(crate) router_type: RouterType,
    pub(crate) quantity: u32,
    pub(crate) notes: String,
    pub(crate) status: RequisitionStatus,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub(crate) pricing: Option<PricingDetails>,
    #[serde(flatten)]
    pub(crate) decision: Option<DecisionDetails>,
    #[serde(flatten)]
    pub(crate) payment: Option<PaymentDetails>,
    #[serde(flatten)]
    pub(crate) fulfillment: Option<FulfillmentDetails>,
    #[serde(flatten)]
    pub(crate) deployment: Option<DeploymentDetails>,
}

impl Requisition {
    pub fn id(&self) -> &RequisitionId {
        &self.id
    }

    pub fn requester(&self) -> &RequesterSnapshot {
        &self.requester
    }

    pub fn requester_id(&self) -> &UserId {
        &self.requester.id
    }

    pub fn router_type(&self) -> RouterType {
        self.router_type
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn status(&self) -> RequisitionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn pricing(&self) -> Option<&PricingDetails> {
        self.pricing.as_ref()
    }

    pub fn decision(&self) -> Option<&DecisionDetails> {
        self.decision.as_ref()
    }

    pub fn payment(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    pub fn fulfillment(&self) -> Option<&FulfillmentDetails> {
        self.fulfillment.as_ref()
    }

    pub fn deployment(&self) -> Option<&DeploymentDetails> {
        self.deployment.as_ref()
    }

    /// Unit price, once Projects has supplied one.
    pub fn unit_price(&self) -> Option<Decimal> {
        self.pricing.as_ref().map(|p| p.pricing)
    }

    /// Unit price × quantity, once priced. `None` if the product does not fit
    /// in a `Decimal`.
    pub fn total_cost(&self) -> Option<Decimal> {
        self.unit_price()
            .and_then(|p| p.checked_mul(Decimal::from(self.quantity)))
    }
}

impl Entity for Requisition {
    type Id = RequisitionId;
    const KIND: &'static str = "requisition";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
