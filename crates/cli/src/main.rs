//! `reqflow`: seeds the demo directory and walks one requisition through the
//! whole workflow, logging each step and the notifications it raised.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use reqflow_auth::Actor;
use reqflow_core::UserId;
use reqflow_infra::seed::demo_users;
use reqflow_infra::{AppConfig, LoggingEmailSender, RequisitionService};
use reqflow_requisitions::{
    Decimal, FieldUpdates, NewRequisition, Requisition, RequisitionFilter, RequisitionStatus,
};

const EMAIL_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    reqflow_observability::init(&config.log);

    if !config.emails_enabled {
        tracing::warn!("REQFLOW_EMAIL_ENABLED is false; only in-app notifications will be raised");
    }

    let service = RequisitionService::in_memory(&config, Arc::new(LoggingEmailSender), demo_users())
        .context("seeding demo directory")?;

    let requester = service
        .sign_in("john.doe@sprintug.com")
        .context("signing in demo requester")?;
    let actor = |id: &str| -> Result<Actor> {
        let user = service
            .get_user(&UserId::new(id))
            .with_context(|| format!("demo user {id} missing"))?;
        Ok(Actor::from(&user))
    };

    let input = NewRequisition::parse("Mikrotik", 5, "Demo site uplink")?;
    let created = service.create_requisition(&input, &Actor::from(&requester))?;
    report(&service, &created);

    let steps = [
        ("2", RequisitionStatus::PricingNeeded, FieldUpdates::new()),
        (
            "3",
            RequisitionStatus::PricingReceived,
            FieldUpdates::new().pricing(Decimal::from(2500), "P1"),
        ),
        ("4", RequisitionStatus::Approved, FieldUpdates::new().approved_by("M1")),
        ("5", RequisitionStatus::Paid, FieldUpdates::new().payment("A1", "INV-1")),
        ("2", RequisitionStatus::Fulfilled, FieldUpdates::new().fulfilled_by("S1")),
        (
            "6",
            RequisitionStatus::Deployed,
            FieldUpdates::new().assigned_engineer(requester.id.clone(), requester.name.clone()),
        ),
    ];

    for (actor_id, target, updates) in steps {
        let moved = service
            .transition_as(&actor(actor_id)?, created.id(), target, &updates)
            .with_context(|| format!("moving {} to {target}", created.id()))?;
        report(&service, &moved);
    }

    for user in service.list_users() {
        tracing::info!(
            user = %user.name,
            role = %user.role,
            unread = service.unread_count(&user.id),
            "inbox"
        );
    }

    let summary = service.summary(&RequisitionFilter::default());
    tracing::info!(summary = %serde_json::to_string(&summary)?, "requisition summary");

    if !service.flush_emails(EMAIL_FLUSH_TIMEOUT) {
        tracing::warn!("email batches still running at exit");
    }
    Ok(())
}

fn report(service: &RequisitionService, req: &Requisition) {
    let raised = service
        .notifications_for_requisition(req.id())
        .into_iter()
        .filter(|n| n.created_at >= req.updated_at())
        .count();
    tracing::info!(
        requisition_id = %req.id(),
        status = %req.status(),
        notifications = raised,
        "requisition step applied"
    );
}
