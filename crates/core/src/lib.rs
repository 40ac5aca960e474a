//! `reqflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, not_found};
pub use error::{DomainError, DomainResult};
pub use id::{AuditEntryId, NotificationId, RequisitionId, UserId};
