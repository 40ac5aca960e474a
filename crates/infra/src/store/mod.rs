//! Storage abstractions and their in-memory implementations.
//!
//! Every store is a `Send + Sync` trait so the service can hold it behind an
//! `Arc<dyn ...>`. The in-memory versions guard their state with an `RwLock`;
//! a poisoned lock turns writes into `DomainError::Conflict` and reads into
//! empty results.

pub mod audit;
pub mod notifications;
pub mod requisitions;
pub mod users;

pub use audit::{AuditLog, InMemoryAuditLog};
pub use notifications::{InMemoryNotificationStore, NotificationStore};
pub use requisitions::{InMemoryRequisitionStore, RequisitionStore};
pub use users::{InMemoryUserDirectory, UserDirectory};

pub(crate) fn poisoned(store: &str) -> reqflow_core::DomainError {
    reqflow_core::DomainError::conflict(format!("{store} lock poisoned"))
}
