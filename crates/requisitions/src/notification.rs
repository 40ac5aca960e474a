//! In-app notifications raised by requisition transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqflow_core::{Entity, NotificationId, RequisitionId, UserId};

/// Severity/tone of an in-app notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

/// An in-app message addressed to one user about one requisition.
///
/// Created unread; the only mutation is `mark_read`, which never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub requisition_id: RequisitionId,
    pub message: String,
    pub(crate) read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        requisition_id: RequisitionId,
        message: impl Into<String>,
        kind: NotificationType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            requisition_id,
            message: message.into(),
            read: false,
            created_at,
            kind,
        }
    }

    pub fn read(&self) -> bool {
        self.read
    }

    /// Returns true if this call changed the flag.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}

impl Entity for Notification {
    type Id = NotificationId;
    const KIND: &'static str = "notification";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_read_is_idempotent() {
        let mut n = Notification::new(
            UserId::new("1"),
            RequisitionId::from_sequence(1, 3),
            "hello",
            NotificationType::Info,
            Utc::now(),
        );
        assert!(!n.read());
        assert!(n.mark_read());
        assert!(!n.mark_read());
        assert!(n.read());
    }

    #[test]
    fn kind_serializes_as_type() {
        let n = Notification::new(
            UserId::new("1"),
            RequisitionId::from_sequence(1, 3),
            "hello",
            NotificationType::Warning,
            Utc::now(),
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["requisitionId"], "REQ-001");
        assert_eq!(json["read"], false);
    }

    #[test]
    fn read_flag_survives_a_round_trip() {
        let mut n = Notification::new(
            UserId::new("1"),
            RequisitionId::from_sequence(1, 3),
            "hello",
            NotificationType::Info,
            Utc::now(),
        );
        n.mark_read();
        let back: Notification = serde_json::from_value(serde_json::to_value(&n).unwrap()).unwrap();
        assert!(back.read());
        assert_eq!(back, n);
    }
}
