use std::sync::{Arc, RwLock};

use reqflow_core::{NotificationId, RequisitionId, UserId};
use reqflow_requisitions::Notification;

/// In-app notification persistence. Records are never deleted.
pub trait NotificationStore: Send + Sync {
    fn insert(&self, notification: Notification);

    /// `None` if the id is unknown, otherwise whether the flag changed.
    fn mark_read(&self, id: &NotificationId) -> Option<bool>;

    /// Number of notifications that flipped to read.
    fn mark_all_read(&self, user_id: &UserId) -> usize;

    /// Newest first.
    fn list_for_user(&self, user_id: &UserId) -> Vec<Notification>;

    /// Oldest first.
    fn list_for_requisition(&self, requisition_id: &RequisitionId) -> Vec<Notification>;
}

impl<S> NotificationStore for Arc<S>
where
    S: NotificationStore + ?Sized,
{
    fn insert(&self, notification: Notification) {
        (**self).insert(notification)
    }

    fn mark_read(&self, id: &NotificationId) -> Option<bool> {
        (**self).mark_read(id)
    }

    fn mark_all_read(&self, user_id: &UserId) -> usize {
        (**self).mark_all_read(user_id)
    }

    fn list_for_user(&self, user_id: &UserId) -> Vec<Notification> {
        (**self).list_for_user(user_id)
    }

    fn list_for_requisition(&self, requisition_id: &RequisitionId) -> Vec<Notification> {
        (**self).list_for_requisition(requisition_id)
    }
}

/// Append-only in-memory notification log.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn insert(&self, notification: Notification) {
        if let Ok(mut all) = self.notifications.write() {
            all.push(notification);
        }
    }

    fn mark_read(&self, id: &NotificationId) -> Option<bool> {
        let mut all = self.notifications.write().ok()?;
        all.iter_mut().find(|n| &n.id == id).map(Notification::mark_read)
    }

    fn mark_all_read(&self, user_id: &UserId) -> usize {
        let mut all = match self.notifications.write() {
            Ok(a) => a,
            Err(_) => return 0,
        };

        all.iter_mut()
            .filter(|n| &n.user_id == user_id)
            .map(Notification::mark_read)
            .filter(|changed| *changed)
            .count()
    }

    fn list_for_user(&self, user_id: &UserId) -> Vec<Notification> {
        let all = match self.notifications.read() {
            Ok(a) => a,
            Err(_) => return vec![],
        };

        // Insertion order breaks ties between equal timestamps.
        all.iter().rev().filter(|n| &n.user_id == user_id).cloned().collect()
    }

    fn list_for_requisition(&self, requisition_id: &RequisitionId) -> Vec<Notification> {
        let all = match self.notifications.read() {
            Ok(a) => a,
            Err(_) => return vec![],
        };

        all.iter()
            .filter(|n| &n.requisition_id == requisition_id)
            .cloned()
            .collect()
    }
}
