//! `RequisitionService`: the operations external callers (UI, API, CLI) use.
//!
//! Each write runs the pure engine inside the store's write lock, then
//! carries out the planned side effects. Effects run after the record is
//! committed and never undo it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use reqflow_auth::{Actor, IdentityGate, Role, User};
use reqflow_core::{DomainError, DomainResult, NotificationId, RequisitionId, UserId};
use reqflow_requisitions::{
    AuditEntry, FieldUpdates, NewRequisition, Notification, Plan, Requisition, RequisitionFilter,
    RequisitionStatus, RequisitionSummary, SideEffect, authorize_transition, plan_creation,
    plan_transition, resolve_audience, resolve_recipients,
};

use crate::config::AppConfig;
use crate::dispatcher::NotificationDispatcher;
use crate::email::EmailSender;
use crate::store::{
    AuditLog, InMemoryAuditLog, InMemoryNotificationStore, InMemoryRequisitionStore,
    InMemoryUserDirectory, NotificationStore, RequisitionStore, UserDirectory,
};

pub struct RequisitionService {
    requisitions: Arc<dyn RequisitionStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditLog>,
    dispatcher: NotificationDispatcher,
    gate: IdentityGate,
}

impl RequisitionService {
    pub fn new(
        config: &AppConfig,
        requisitions: Arc<dyn RequisitionStore>,
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditLog>,
        sender: Arc<dyn EmailSender>,
    ) -> Self {
        let dispatcher =
            NotificationDispatcher::new(notifications, sender, config.email_from.clone())
                .with_emails_enabled(config.emails_enabled);

        Self {
            requisitions,
            users,
            audit,
            dispatcher,
            gate: IdentityGate::new(config.allowed_email_domain.clone()),
        }
    }

    /// Service over fresh in-memory stores with `users` as the directory.
    pub fn in_memory(
        config: &AppConfig,
        sender: Arc<dyn EmailSender>,
        users: impl IntoIterator<Item = User>,
    ) -> DomainResult<Self> {
        Ok(Self::new(
            config,
            Arc::new(InMemoryRequisitionStore::new(config.id_width)),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(InMemoryUserDirectory::with_users(users)?),
            Arc::new(InMemoryAuditLog::new()),
            sender,
        ))
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    // --- requisitions -----------------------------------------------------

    /// Create a `pending` requisition raised by `requester`.
    pub fn create_requisition(
        &self,
        input: &NewRequisition,
        requester: &Actor,
    ) -> DomainResult<Requisition> {
        let mut planned: Option<Plan> = None;
        self.requisitions.create_with(&mut |id| {
            let plan = plan_creation(id, input, requester, Utc::now())?;
            let requisition = plan.requisition.clone();
            planned = Some(plan);
            Ok(requisition)
        })?;
        let plan =
            planned.ok_or_else(|| DomainError::conflict("requisition store skipped creation"))?;

        info!(
            requisition_id = %plan.requisition.id(),
            requester_id = %requester.id,
            router_type = %plan.requisition.router_type(),
            quantity = plan.requisition.quantity(),
            "requisition created"
        );
        Ok(self.apply(plan, Some(requester)))
    }

    /// Move requisition `id` to `target`, merging `updates`.
    ///
    /// The caller is trusted to have checked who may act; see `transition_as`.
    pub fn transition(
        &self,
        id: &RequisitionId,
        target: RequisitionStatus,
        updates: &FieldUpdates,
    ) -> DomainResult<Requisition> {
        self.run_transition(None, id, target, updates)
    }

    /// Like `transition`, but checks that `actor`'s role may perform the
    /// move and records the actor in the audit trail.
    pub fn transition_as(
        &self,
        actor: &Actor,
        id: &RequisitionId,
        target: RequisitionStatus,
        updates: &FieldUpdates,
    ) -> DomainResult<Requisition> {
        authorize_transition(actor.role, target)?;
        self.run_transition(Some(actor), id, target, updates)
    }

    fn run_transition(
        &self,
        actor: Option<&Actor>,
        id: &RequisitionId,
        target: RequisitionStatus,
        updates: &FieldUpdates,
    ) -> DomainResult<Requisition> {
        let mut planned: Option<Plan> = None;
        self.requisitions.update_with(id, &mut |current| {
            let plan = plan_transition(current, target, updates, Utc::now())?;
            let requisition = plan.requisition.clone();
            planned = Some(plan);
            Ok(requisition)
        })?;
        let plan =
            planned.ok_or_else(|| DomainError::conflict("requisition store skipped update"))?;

        info!(
            requisition_id = %id,
            from = ?plan.previous_status,
            to = %target,
            actor_id = actor.map(|a| a.id.as_str()),
            "requisition transitioned"
        );
        Ok(self.apply(plan, actor))
    }

    /// Record the audit entry and carry out the plan's side effects.
    fn apply(&self, plan: Plan, actor: Option<&Actor>) -> Requisition {
        self.audit.append(AuditEntry::for_plan(&plan, actor));

        let req = &plan.requisition;
        let users = self.users.list();
        for effect in &plan.effects {
            match effect {
                SideEffect::Notify { audience, message, kind } => {
                    for user_id in resolve_audience(*audience, req, &users) {
                        self.dispatcher.notify(user_id, req.id().clone(), message.clone(), *kind);
                    }
                }
                SideEffect::EmailBatch { status } => {
                    let recipients = resolve_recipients(*status, req, &users);
                    // Fire and forget; delivery outcome is logged by the dispatcher.
                    drop(self.dispatcher.send_email_batch(req, *status, &recipients));
                }
            }
        }

        plan.requisition
    }

    pub fn get_by_id(&self, id: &RequisitionId) -> Option<Requisition> {
        self.requisitions.get(id)
    }

    /// Every requisition, newest first.
    pub fn list_all(&self) -> Vec<Requisition> {
        self.requisitions.list()
    }

    pub fn list_by_status(&self, status: RequisitionStatus) -> Vec<Requisition> {
        self.list_matching(&RequisitionFilter::default().with_status(status))
    }

    pub fn list_for_requester(&self, requester_id: &UserId) -> Vec<Requisition> {
        self.list_matching(&RequisitionFilter::default().with_requester(requester_id.clone()))
    }

    pub fn list_matching(&self, filter: &RequisitionFilter) -> Vec<Requisition> {
        self.requisitions
            .list()
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect()
    }

    pub fn summary(&self, filter: &RequisitionFilter) -> RequisitionSummary {
        let matching = self.list_matching(filter);
        RequisitionSummary::from_requisitions(&matching)
    }

    /// Applied creation and transitions for `id`, oldest first.
    pub fn audit_trail(&self, id: &RequisitionId) -> Vec<AuditEntry> {
        self.audit.for_requisition(id)
    }

    // --- notifications ----------------------------------------------------

    pub fn mark_notification_read(&self, id: &NotificationId) {
        self.dispatcher.mark_read(id);
    }

    pub fn mark_all_read(&self, user_id: &UserId) -> usize {
        self.dispatcher.mark_all_read(user_id)
    }

    /// Newest first.
    pub fn list_notifications(&self, user_id: &UserId) -> Vec<Notification> {
        self.dispatcher.list_for_user(user_id)
    }

    pub fn unread_count(&self, user_id: &UserId) -> usize {
        self.list_notifications(user_id).iter().filter(|n| !n.read()).count()
    }

    pub fn notifications_for_requisition(&self, id: &RequisitionId) -> Vec<Notification> {
        self.dispatcher.list_for_requisition(id)
    }

    /// Wait for background email batches, up to `timeout`.
    pub fn flush_emails(&self, timeout: Duration) -> bool {
        self.dispatcher.wait_idle(timeout)
    }

    // --- identity and users -----------------------------------------------

    /// Placeholder sign-in: admit the address if it is in the allowed
    /// domain, returning the directory entry or provisioning a new field
    /// engineer for a first-time address.
    pub fn sign_in(&self, email: &str) -> DomainResult<User> {
        let email = self.gate.admit(email)?;
        if let Some(user) = self.users.find_by_email(&email) {
            return Ok(user);
        }

        let user = self.gate.provision(&email, Utc::now())?;
        match self.users.insert(user) {
            Ok(user) => {
                info!(user_id = %user.id, email = %user.email, "user provisioned on first sign-in");
                Ok(user)
            }
            // Lost a race with a concurrent first sign-in for the same address.
            Err(err) => self.users.find_by_email(&email).ok_or(err),
        }
    }

    pub fn add_user(&self, email: &str, name: &str, role: Role) -> DomainResult<User> {
        let email = self.gate.admit(email).map_err(|err| match err {
            DomainError::Unauthorized(msg) => DomainError::Validation(msg),
            other => other,
        })?;
        let user = User::new(UserId::generate(), &email, name, role, Utc::now())?;
        let user = self.users.insert(user)?;
        info!(user_id = %user.id, role = %user.role, "user added");
        Ok(user)
    }

    /// Unknown ids are a no-op (`None`).
    pub fn update_user_role(&self, id: &UserId, role: Role) -> Option<User> {
        let updated = self.users.update_role(id, role);
        if updated.is_some() {
            info!(user_id = %id, role = %role, "user role updated");
        }
        updated
    }

    /// Unknown ids are a no-op (`None`). Past requisitions keep their
    /// requester snapshot.
    pub fn delete_user(&self, id: &UserId) -> Option<User> {
        let removed = self.users.remove(id);
        if removed.is_some() {
            info!(user_id = %id, "user deleted");
        }
        removed
    }

    pub fn list_users(&self) -> Vec<User> {
        self.users.list()
    }

    pub fn get_user(&self, id: &UserId) -> Option<User> {
        self.users.get(id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users.find_by_email(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RecordingEmailSender;
    use crate::seed::demo_users;
    use reqflow_requisitions::{AuditAction, Decimal, RouterType};

    fn test_service() -> (RequisitionService, Arc<RecordingEmailSender>) {
        let sender = Arc::new(RecordingEmailSender::new());
        let service =
            RequisitionService::in_memory(&AppConfig::default(), sender.clone(), demo_users())
                .unwrap();
        (service, sender)
    }

    fn actor(service: &RequisitionService, id: &str) -> Actor {
        Actor::from(&service.get_user(&UserId::new(id)).unwrap())
    }

    fn create(service: &RequisitionService) -> Requisition {
        let input = NewRequisition::new(RouterType::Mikrotik, 5, "site A");
        service
            .create_requisition(&input, &actor(service, "1"))
            .unwrap()
    }

    #[test]
    fn get_by_id_equals_creation_result() {
        let (service, _) = test_service();
        let created = create(&service);

        assert_eq!(service.get_by_id(created.id()), Some(created.clone()));
        assert_eq!(created.status(), RequisitionStatus::Pending);
        assert_eq!(created.id().as_str(), "REQ-001");
    }

    #[test]
    fn creation_notifies_store_managers_but_not_the_requester() {
        let (service, _) = test_service();
        let created = create(&service);

        let store_manager = service.list_notifications(&UserId::new("2"));
        assert_eq!(store_manager.len(), 1);
        assert_eq!(
            store_manager[0].message,
            format!("New requisition {} submitted by John Doe", created.id())
        );
        assert!(service.list_notifications(&UserId::new("1")).is_empty());
    }

    #[test]
    fn invalid_creation_leaves_no_trace() {
        let (service, _) = test_service();
        let requester = actor(&service, "1");
        for quantity in [0, i64::from(u32::MAX) + 1] {
            let input = NewRequisition::new(RouterType::Other, quantity, "");
            let err = service.create_requisition(&input, &requester).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{quantity}");
        }

        assert!(service.list_all().is_empty());
        assert!(service.list_notifications(&UserId::new("2")).is_empty());
        assert_eq!(create(&service).id().as_str(), "REQ-001");
    }

    #[test]
    fn largest_quantity_is_accepted() {
        let (service, _) = test_service();
        let input = NewRequisition::new(RouterType::Other, i64::from(u32::MAX), "");
        let created = service
            .create_requisition(&input, &actor(&service, "1"))
            .unwrap();
        assert_eq!(created.quantity(), u32::MAX);
    }

    #[test]
    fn unrepresentable_total_cost_is_rejected_and_nothing_changes() {
        let (service, sender) = test_service();
        let created = create(&service);
        let needed = service
            .transition(created.id(), RequisitionStatus::PricingNeeded, &FieldUpdates::new())
            .unwrap();
        assert!(service.flush_emails(Duration::from_secs(5)));
        sender.clear();
        let notices_before = service.notifications_for_requisition(created.id()).len();

        let err = service
            .transition(
                created.id(),
                RequisitionStatus::PricingReceived,
                &FieldUpdates::new().pricing(Decimal::MAX, "P1"),
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(service.get_by_id(created.id()), Some(needed));
        assert_eq!(service.notifications_for_requisition(created.id()).len(), notices_before);
        assert_eq!(service.audit_trail(created.id()).len(), 2);
        assert!(service.flush_emails(Duration::from_secs(5)));
        assert!(sender.sent().is_empty());
        assert_eq!(service.summary(&RequisitionFilter::default()).total_value, Decimal::ZERO);

        let priced = service
            .transition(
                created.id(),
                RequisitionStatus::PricingReceived,
                &FieldUpdates::new().pricing(Decimal::MAX / Decimal::from(5), "P1"),
            )
            .unwrap();
        assert_eq!(priced.total_cost(), Some(Decimal::MAX));
        assert_eq!(service.summary(&RequisitionFilter::default()).total_value, Decimal::MAX);
    }

    #[test]
    fn transition_of_unknown_id_is_not_found() {
        let (service, _) = test_service();
        let err = service
            .transition(
                &RequisitionId::from_sequence(42, 3),
                RequisitionStatus::PricingNeeded,
                &FieldUpdates::new(),
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn rejected_transition_changes_nothing() {
        let (service, _) = test_service();
        let created = create(&service);
        let notices_before = service.notifications_for_requisition(created.id()).len();

        let err = service
            .transition(created.id(), RequisitionStatus::Paid, &FieldUpdates::new())
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(service.get_by_id(created.id()), Some(created.clone()));
        assert_eq!(service.notifications_for_requisition(created.id()).len(), notices_before);
        assert_eq!(service.audit_trail(created.id()).len(), 1);
    }

    #[test]
    fn transition_as_checks_the_actor_role() {
        let (service, _) = test_service();
        let created = create(&service);

        let target = RequisitionStatus::PricingNeeded;
        let err = service
            .transition_as(&actor(&service, "1"), created.id(), target, &FieldUpdates::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        let moved = service
            .transition_as(&actor(&service, "2"), created.id(), target, &FieldUpdates::new())
            .unwrap();
        assert_eq!(moved.status(), RequisitionStatus::PricingNeeded);

        let trail = service.audit_trail(created.id());
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].action, AuditAction::Created);
        assert_eq!(trail[1].user_id, Some(UserId::new("2")));
        assert_eq!(trail[1].previous_status, Some(RequisitionStatus::Pending));
    }

    #[test]
    fn rejection_requires_a_reason() {
        let (service, _) = test_service();
        let id = create(&service).id().clone();
        service
            .transition(&id, RequisitionStatus::PricingNeeded, &FieldUpdates::new())
            .unwrap();
        service
            .transition(
                &id,
                RequisitionStatus::PricingReceived,
                &FieldUpdates::new().pricing(Decimal::from(2500), "P1"),
            )
            .unwrap();

        let err = service
            .transition(&id, RequisitionStatus::Rejected, &FieldUpdates::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingRequiredField { .. }));

        let reason = FieldUpdates::new().rejection_reason("over budget");
        let rejected = service
            .transition(&id, RequisitionStatus::Rejected, &reason)
            .unwrap();
        assert_eq!(rejected.status(), RequisitionStatus::Rejected);
        assert_eq!(
            service.audit_trail(&id).last().and_then(|e| e.notes.clone()),
            Some("over budget".to_string())
        );
    }

    #[test]
    fn mark_read_twice_and_mark_all_read() {
        let (service, _) = test_service();
        create(&service);
        create(&service);
        let manager = UserId::new("2");

        let first = service.list_notifications(&manager)[0].id;
        service.mark_notification_read(&first);
        service.mark_notification_read(&first);
        service.mark_notification_read(&NotificationId::new());

        assert_eq!(service.unread_count(&manager), 1);
        assert_eq!(service.mark_all_read(&manager), 1);
        assert_eq!(service.unread_count(&manager), 0);
    }

    #[test]
    fn sign_in_known_foreign_and_new_addresses() {
        let (service, _) = test_service();

        assert_eq!(service.sign_in("Jane.Smith@sprintug.com").unwrap().id, UserId::new("2"));
        assert!(matches!(
            service.sign_in("mallory@example.com").unwrap_err(),
            DomainError::Unauthorized(_)
        ));
        assert!(matches!(service.sign_in("no-at-sign").unwrap_err(), DomainError::Validation(_)));

        let fresh = service.sign_in("new.hire@sprintug.com").unwrap();
        assert_eq!(fresh.role, Role::FieldEngineer);
        assert_eq!(fresh.name, "new.hire");
        assert_eq!(service.sign_in("new.hire@sprintug.com").unwrap().id, fresh.id);
    }

    #[test]
    fn user_administration() {
        let (service, _) = test_service();

        let user = service.add_user("sam@sprintug.com", "Sam", Role::Projects).unwrap();
        assert!(matches!(
            service.add_user("SAM@sprintug.com", "Sam Again", Role::Projects).unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            service.add_user("sam@example.com", "Sam", Role::Projects).unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            service.add_user("kim@sprintug.com", "  ", Role::Projects).unwrap_err(),
            DomainError::Validation(_)
        ));

        assert_eq!(
            service.update_user_role(&user.id, Role::Csnoc).map(|u| u.role),
            Some(Role::Csnoc)
        );
        assert!(service.delete_user(&user.id).is_some());
        assert!(service.delete_user(&user.id).is_none());
        assert!(service.update_user_role(&user.id, Role::Admin).is_none());
        assert_eq!(service.list_users().len(), 7);
    }

    #[test]
    fn deleted_requester_keeps_snapshot_and_gets_no_email() {
        let (service, sender) = test_service();
        let created = create(&service);
        assert!(service.flush_emails(Duration::from_secs(5)));
        sender.clear();

        service.delete_user(&UserId::new("1"));
        service
            .transition(created.id(), RequisitionStatus::PricingNeeded, &FieldUpdates::new())
            .unwrap();
        assert!(service.flush_emails(Duration::from_secs(5)));

        assert_eq!(service.get_by_id(created.id()).unwrap().requester().name, "John Doe");
        assert!(sender.sent_to("john.doe@sprintug.com").is_empty());
        assert_eq!(sender.sent_to("bob.wilson@sprintug.com").len(), 1);
    }

    #[test]
    fn queries_and_summary() {
        let (service, _) = test_service();
        let first = create(&service);
        create(&service);
        service
            .transition(first.id(), RequisitionStatus::PricingNeeded, &FieldUpdates::new())
            .unwrap();
        service
            .transition(
                first.id(),
                RequisitionStatus::PricingReceived,
                &FieldUpdates::new().pricing(Decimal::from(2500), "P1"),
            )
            .unwrap();
        let approval = FieldUpdates::new().approved_by("M1");
        service
            .transition(first.id(), RequisitionStatus::Approved, &approval)
            .unwrap();

        assert_eq!(service.list_by_status(RequisitionStatus::Pending).len(), 1);
        assert_eq!(service.list_for_requester(&UserId::new("1")).len(), 2);
        assert!(service.list_for_requester(&UserId::new("2")).is_empty());

        let summary = service.summary(&RequisitionFilter::default());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.approved_or_later, 1);
        assert_eq!(summary.rejected, 0);
        assert_eq!(summary.total_value, Decimal::from(12_500));
    }
}
