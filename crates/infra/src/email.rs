//! Outbound email collaborator.
//!
//! Real delivery is out of scope; `LoggingEmailSender` writes each message to
//! the log and `RecordingEmailSender` keeps them for inspection in tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use reqflow_core::RequisitionId;
use reqflow_requisitions::{EmailMessage, RequisitionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub requisition_id: RequisitionId,
    pub stage: RequisitionStatus,
}

impl OutboundEmail {
    pub fn new(from: impl Into<String>, message: EmailMessage) -> Self {
        Self {
            from: from.into(),
            to: message.to,
            subject: message.subject,
            body: message.body,
            requisition_id: message.requisition_id,
            stage: message.stage,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("delivery to {to} rejected: {reason}")]
    Rejected { to: String, reason: String },

    #[error("email transport unavailable: {0}")]
    Unavailable(String),
}

/// Delivers one message; called concurrently from dispatcher threads.
pub trait EmailSender: Send + Sync {
    fn send(&self, email: &OutboundEmail) -> Result<(), EmailError>;
}

impl<S> EmailSender for Arc<S>
where
    S: EmailSender + ?Sized,
{
    fn send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        (**self).send(email)
    }
}

/// Logs each email instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEmailSender;

impl EmailSender for LoggingEmailSender {
    fn send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        tracing::info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            requisition_id = %email.requisition_id,
            stage = %email.stage,
            "email notification sent"
        );
        tracing::debug!(to = %email.to, body = %email.body, "email body");
        Ok(())
    }
}

/// Keeps every accepted email in memory; addresses registered with
/// `fail_for` are rejected instead.
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(address.into().to_lowercase());
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|e| e.to.eq_ignore_ascii_case(address))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

impl EmailSender for RecordingEmailSender {
    fn send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        let rejected = self
            .failing
            .lock()
            .map(|f| f.contains(&email.to.to_lowercase()))
            .unwrap_or(false);
        if rejected {
            return Err(EmailError::Rejected {
                to: email.to.clone(),
                reason: "mailbox unavailable".to_string(),
            });
        }

        self.sent
            .lock()
            .map_err(|_| EmailError::Unavailable("recording sender lock poisoned".to_string()))?
            .push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_email(to: &str) -> OutboundEmail {
        OutboundEmail {
            from: "noreply@requisition.sprintug.com".to_string(),
            to: to.to_string(),
            subject: "Subject".to_string(),
            body: "Body".to_string(),
            requisition_id: RequisitionId::from_sequence(1, 3),
            stage: RequisitionStatus::Pending,
        }
    }

    #[test]
    fn recording_sender_keeps_accepted_mail() {
        let sender = RecordingEmailSender::new();
        sender.send(&test_email("a@sprintug.com")).unwrap();
        sender.send(&test_email("b@sprintug.com")).unwrap();

        assert_eq!(sender.sent().len(), 2);
        assert_eq!(sender.sent_to("A@sprintug.com").len(), 1);

        sender.clear();
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn recording_sender_rejects_configured_addresses() {
        let sender = RecordingEmailSender::new();
        sender.fail_for("Broken@sprintug.com");

        let err = sender.send(&test_email("broken@sprintug.com")).unwrap_err();
        assert!(matches!(err, EmailError::Rejected { .. }));
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn logging_sender_always_succeeds() {
        assert!(LoggingEmailSender.send(&test_email("a@sprintug.com")).is_ok());
    }

    #[test]
    fn outbound_email_serializes_camel_case() {
        let json = serde_json::to_value(test_email("a@sprintug.com")).unwrap();
        assert_eq!(json["requisitionId"], "REQ-001");
        assert_eq!(json["stage"], "pending");
    }
}
