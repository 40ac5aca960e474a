//! Read-side filtering and aggregate figures over requisitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use reqflow_core::UserId;

use crate::requisition::{Requisition, RequisitionStatus};

/// Conjunction of optional criteria; the default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequisitionFilter {
    pub status: Option<RequisitionStatus>,
    pub requester_id: Option<UserId>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
}

impl RequisitionFilter {
    pub fn with_status(mut self, status: RequisitionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_requester(mut self, requester_id: UserId) -> Self {
        self.requester_id = Some(requester_id);
        self
    }

    pub fn created_between(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    pub fn matches(&self, req: &Requisition) -> bool {
        self.status.is_none_or(|s| req.status() == s)
            && self
                .requester_id
                .as_ref()
                .is_none_or(|id| req.requester_id() == id)
            && self.created_from.is_none_or(|from| req.created_at() >= from)
            && self.created_to.is_none_or(|to| req.created_at() <= to)
    }
}

/// Headline figures for a set of requisitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionSummary {
    pub total: usize,
    /// Approved, paid, fulfilled or deployed.
    pub approved_or_later: usize,
    pub rejected: usize,
    /// Σ unit price × quantity, saturating at `Decimal::MAX`; unpriced
    /// requisitions contribute nothing.
    pub total_value: Decimal,
}

impl RequisitionSummary {
    pub fn from_requisitions<'a>(reqs: impl IntoIterator<Item = &'a Requisition>) -> Self {
        reqs.into_iter().fold(Self::default(), |mut acc, req| {
            acc.total += 1;
            if req.status().is_approved_or_later() {
                acc.approved_or_later += 1;
            }
            if req.status() == RequisitionStatus::Rejected {
                acc.rejected += 1;
            }
            if let Some(cost) = req.total_cost() {
                acc.total_value = acc.total_value.saturating_add(cost);
            }
            acc
        })
    }
}
