//! Field updates supplied alongside a status transition.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use reqflow_core::UserId;

/// A field a caller may supply with a transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UpdateField {
    Pricing,
    PricingNotes,
    PricingAddedBy,
    ApprovedBy,
    RejectionReason,
    PaidBy,
    PaymentReference,
    FulfilledBy,
    AssignedEngineerId,
    AssignedEngineerName,
}

impl UpdateField {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateField::Pricing => "pricing",
            UpdateField::PricingNotes => "pricing_notes",
            UpdateField::PricingAddedBy => "pricing_added_by",
            UpdateField::ApprovedBy => "approved_by",
            UpdateField::RejectionReason => "rejection_reason",
            UpdateField::PaidBy => "paid_by",
            UpdateField::PaymentReference => "payment_reference",
            UpdateField::FulfilledBy => "fulfilled_by",
            UpdateField::AssignedEngineerId => "assigned_engineer_id",
            UpdateField::AssignedEngineerName => "assigned_engineer_name",
        }
    }
}

impl core::fmt::Display for UpdateField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial record merged onto a requisition by a transition.
///
/// `None` leaves a field untouched; there is no way to clear a field.
/// Timestamps are not part of the update: the engine stamps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldUpdates {
    pub pricing: Option<Decimal>,
    pub pricing_notes: Option<String>,
    pub pricing_added_by: Option<String>,
    pub approved_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub paid_by: Option<String>,
    pub payment_reference: Option<String>,
    pub fulfilled_by: Option<String>,
    pub assigned_engineer_id: Option<UserId>,
    pub assigned_engineer_name: Option<String>,
}

impl FieldUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pricing(mut self, unit_price: Decimal, added_by: impl Into<String>) -> Self {
        self.pricing = Some(unit_price);
        self.pricing_added_by = Some(added_by.into());
        self
    }

    pub fn pricing_notes(mut self, notes: impl Into<String>) -> Self {
        self.pricing_notes = Some(notes.into());
        self
    }

    pub fn approved_by(mut self, name: impl Into<String>) -> Self {
        self.approved_by = Some(name.into());
        self
    }

    pub fn rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn payment(mut self, paid_by: impl Into<String>, reference: impl Into<String>) -> Self {
        self.paid_by = Some(paid_by.into());
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn fulfilled_by(mut self, name: impl Into<String>) -> Self {
        self.fulfilled_by = Some(name.into());
        self
    }

    pub fn assigned_engineer(mut self, id: UserId, name: impl Into<String>) -> Self {
        self.assigned_engineer_id = Some(id);
        self.assigned_engineer_name = Some(name.into());
        self
    }

    /// Whether `field` carries a usable value. Blank strings count as absent.
    pub fn has(&self, field: UpdateField) -> bool {
        fn text(v: &Option<String>) -> bool {
            v.as_deref().is_some_and(|s| !s.trim().is_empty())
        }

        match field {
            UpdateField::Pricing => self.pricing.is_some(),
            UpdateField::PricingNotes => text(&self.pricing_notes),
            UpdateField::PricingAddedBy => text(&self.pricing_added_by),
            UpdateField::ApprovedBy => text(&self.approved_by),
            UpdateField::RejectionReason => text(&self.rejection_reason),
            UpdateField::PaidBy => text(&self.paid_by),
            UpdateField::PaymentReference => text(&self.payment_reference),
            UpdateField::FulfilledBy => text(&self.fulfilled_by),
            UpdateField::AssignedEngineerId => self
                .assigned_engineer_id
                .as_ref()
                .is_some_and(|id| !id.as_str().trim().is_empty()),
            UpdateField::AssignedEngineerName => text(&self.assigned_engineer_name),
        }
    }

    /// Every field that carries a value, in declaration order.
    pub fn supplied(&self) -> Vec<UpdateField> {
        const ORDER: [UpdateField; 10] = [
            UpdateField::Pricing,
            UpdateField::PricingNotes,
            UpdateField::PricingAddedBy,
            UpdateField::ApprovedBy,
            UpdateField::RejectionReason,
            UpdateField::PaidBy,
            UpdateField::PaymentReference,
            UpdateField::FulfilledBy,
            UpdateField::AssignedEngineerId,
            UpdateField::AssignedEngineerName,
        ];
        ORDER.into_iter().filter(|f| self.has(*f)).collect()
    }
}

/// Trimmed copy of an optional text field, `None` when blank.
pub(crate) fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
