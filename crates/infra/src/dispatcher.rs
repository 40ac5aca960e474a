//! Notification dispatcher: in-app notices and background email batches.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use reqflow_auth::User;
use reqflow_core::{NotificationId, RequisitionId, UserId};
use reqflow_requisitions::{
    Notification, NotificationType, Requisition, RequisitionStatus, render_email,
};

use crate::email::{EmailSender, OutboundEmail};
use crate::store::NotificationStore;

/// Outcome of one email batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub sent: usize,
    /// Addresses whose delivery failed.
    pub failed: Vec<String>,
}

/// Handle to a dispatched batch. Dropping it detaches the batch.
#[derive(Debug)]
pub struct DispatchHandle {
    join: Option<thread::JoinHandle<BatchReport>>,
    ready: Option<BatchReport>,
}

impl DispatchHandle {
    fn finished(report: BatchReport) -> Self {
        Self {
            join: None,
            ready: Some(report),
        }
    }

    /// Block until every send in the batch has finished.
    pub fn wait(mut self) -> BatchReport {
        if let Some(report) = self.ready.take() {
            return report;
        }
        match self.join.take().map(thread::JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                warn!("email batch thread panicked");
                BatchReport::default()
            }
            None => BatchReport::default(),
        }
    }
}

/// Counts batches that have been spawned but not yet finished.
#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(self: &Arc<Self>) -> InFlightGuard {
        if let Ok(mut count) = self.count.lock() {
            *count += 1;
        }
        InFlightGuard(self.clone())
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let Ok(mut count) = self.count.lock() else {
            return false;
        };
        while *count > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            count = match self.idle.wait_timeout(count, remaining) {
                Ok((guard, _)) => guard,
                Err(_) => return false,
            };
        }
        true
    }
}

/// Decrements the in-flight count when dropped, including on panic.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut count) = self.0.count.lock() {
            *count = count.saturating_sub(1);
        }
        self.0.idle.notify_all();
    }
}

/// Creates in-app notifications and fans emails out to the sender.
///
/// Email batches run on a detached background thread; inside it every
/// recipient gets its own scoped thread, so one slow or failing delivery
/// never holds up the others or the caller.
pub struct NotificationDispatcher {
    notifications: Arc<dyn NotificationStore>,
    sender: Arc<dyn EmailSender>,
    from: String,
    emails_enabled: bool,
    in_flight: Arc<InFlight>,
}

impl NotificationDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        sender: Arc<dyn EmailSender>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            notifications,
            sender,
            from: from.into(),
            emails_enabled: true,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn with_emails_enabled(mut self, enabled: bool) -> Self {
        self.emails_enabled = enabled;
        self
    }

    /// Raise an unread notification for `user_id`.
    pub fn notify(
        &self,
        user_id: UserId,
        requisition_id: RequisitionId,
        message: impl Into<String>,
        kind: NotificationType,
    ) -> Notification {
        let notification = Notification::new(user_id, requisition_id, message, kind, Utc::now());
        debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            requisition_id = %notification.requisition_id,
            "notification raised"
        );
        self.notifications.insert(notification.clone());
        notification
    }

    /// Idempotent; an unknown id is ignored.
    pub fn mark_read(&self, id: &NotificationId) {
        match self.notifications.mark_read(id) {
            Some(true) => debug!(notification_id = %id, "notification marked read"),
            Some(false) => {}
            None => debug!(notification_id = %id, "mark_read for unknown notification ignored"),
        }
    }

    pub fn mark_all_read(&self, user_id: &UserId) -> usize {
        let changed = self.notifications.mark_all_read(user_id);
        debug!(user_id = %user_id, changed, "notifications marked read");
        changed
    }

    pub fn list_for_user(&self, user_id: &UserId) -> Vec<Notification> {
        self.notifications.list_for_user(user_id)
    }

    pub fn list_for_requisition(&self, requisition_id: &RequisitionId) -> Vec<Notification> {
        self.notifications.list_for_requisition(requisition_id)
    }

    /// Render the `stage` email for every recipient and send the batch in
    /// the background. Returns immediately.
    pub fn send_email_batch(
        &self,
        requisition: &Requisition,
        stage: RequisitionStatus,
        recipients: &[User],
    ) -> DispatchHandle {
        if !self.emails_enabled {
            debug!(requisition_id = %requisition.id(), %stage, "email disabled, batch skipped");
            return DispatchHandle::finished(BatchReport::default());
        }
        if recipients.is_empty() {
            return DispatchHandle::finished(BatchReport::default());
        }

        let emails: Vec<OutboundEmail> = recipients
            .iter()
            .map(|user| {
                OutboundEmail::new(self.from.clone(), render_email(requisition, stage, user))
            })
            .collect();
        let total = emails.len();

        let sender = self.sender.clone();
        let guard = self.in_flight.begin();
        let spawned = thread::Builder::new()
            .name(format!("email-{}", requisition.id()))
            .spawn(move || {
                let _guard = guard;
                deliver_all(sender.as_ref(), emails)
            });

        match spawned {
            Ok(join) => {
                debug!(
                    requisition_id = %requisition.id(),
                    %stage,
                    recipients = total,
                    "email batch dispatched"
                );
                DispatchHandle {
                    join: Some(join),
                    ready: None,
                }
            }
            Err(err) => {
                warn!(
                    requisition_id = %requisition.id(),
                    %stage,
                    error = %err,
                    "failed to spawn email batch thread"
                );
                DispatchHandle::finished(BatchReport {
                    sent: 0,
                    failed: recipients.iter().map(|u| u.email.clone()).collect(),
                })
            }
        }
    }

    /// Wait until no email batch is running, up to `timeout`.
    /// Returns false if batches were still running when it expired.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.in_flight.wait_idle(timeout)
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("from", &self.from)
            .field("emails_enabled", &self.emails_enabled)
            .finish_non_exhaustive()
    }
}

fn deliver_all(sender: &dyn EmailSender, emails: Vec<OutboundEmail>) -> BatchReport {
    let outcomes: Vec<(String, bool)> = thread::scope(|scope| {
        let handles: Vec<_> = emails
            .iter()
            .map(|email| {
                let spawned = thread::Builder::new()
                    .name(format!("email-{}", email.to))
                    .spawn_scoped(scope, move || deliver_one(sender, email));
                (email, spawned)
            })
            .collect();

        handles
            .into_iter()
            .map(|(email, spawned)| {
                let ok = match spawned {
                    Ok(handle) => handle.join().unwrap_or_else(|_| {
                        warn!(
                            to = %email.to,
                            requisition_id = %email.requisition_id,
                            "email send panicked"
                        );
                        false
                    }),
                    // Could not get a thread; deliver on this one instead.
                    Err(_) => deliver_one(sender, email),
                };
                (email.to.clone(), ok)
            })
            .collect()
    });

    let mut report = BatchReport::default();
    for (to, ok) in outcomes {
        if ok {
            report.sent += 1;
        } else {
            report.failed.push(to);
        }
    }

    if let Some(first) = emails.first() {
        info!(
            requisition_id = %first.requisition_id,
            stage = %first.stage,
            sent = report.sent,
            failed = report.failed.len(),
            "email batch finished"
        );
    }
    report
}

fn deliver_one(sender: &dyn EmailSender, email: &OutboundEmail) -> bool {
    match sender.send(email) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                to = %email.to,
                requisition_id = %email.requisition_id,
                error = %err,
                "email delivery failed"
            );
            false
        }
    }
}
