//! Infrastructure layer: in-memory stores, email delivery, notification
//! dispatch, configuration, and the service facade external callers use.

pub mod config;
pub mod dispatcher;
pub mod email;
pub mod seed;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use dispatcher::{BatchReport, DispatchHandle, NotificationDispatcher};
pub use email::{EmailError, EmailSender, LoggingEmailSender, OutboundEmail, RecordingEmailSender};
pub use service::RequisitionService;
pub use store::{
    AuditLog, InMemoryAuditLog, InMemoryNotificationStore, InMemoryRequisitionStore,
    InMemoryUserDirectory, NotificationStore, RequisitionStore, UserDirectory,
};
