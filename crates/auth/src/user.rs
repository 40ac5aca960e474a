//! User records held by the user directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reqflow_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// A person who can raise requisitions or act on them.
///
/// # Invariants
/// - `email` is trimmed, lower-cased and contains `@`.
/// - `name` is non-empty.
/// - Only `role` changes after creation (admin action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Validate and normalize a new user record.
    pub fn new(
        id: UserId,
        email: &str,
        name: &str,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let email = normalize_email(email)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        Ok(Self {
            id,
            email,
            name: name.to_string(),
            role,
            created_at,
        })
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Trim and lower-case an email address, rejecting anything without an `@`.
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::validation("invalid email format")),
    }
}
