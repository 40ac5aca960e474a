//! Placeholder identity gate.
//!
//! The workflow core trusts whatever identity the caller hands it. This gate
//! only reproduces the coarse email-domain check the login screen applies
//! before an actor is looked up or provisioned. It is not an authentication
//! mechanism.

use chrono::{DateTime, Utc};

use reqflow_core::{DomainError, DomainResult, UserId};

use crate::user::normalize_email;
use crate::{Role, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityGate {
    allowed_domain: String,
}

impl IdentityGate {
    pub fn new(allowed_domain: impl Into<String>) -> Self {
        let domain: String = allowed_domain.into();
        Self {
            allowed_domain: domain.trim().trim_start_matches('@').to_lowercase(),
        }
    }

    /// Normalize `email` and check that it belongs to the allowed domain.
    pub fn admit(&self, email: &str) -> DomainResult<String> {
        let email = normalize_email(email)?;
        let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or_default();
        if domain != self.allowed_domain {
            tracing::debug!(
                email = %email,
                allowed = %self.allowed_domain,
                "email outside allowed domain"
            );
            return Err(DomainError::unauthorized(format!(
                "only @{} addresses may sign in",
                self.allowed_domain
            )));
        }
        Ok(email)
    }

    /// Build the directory entry for a first-time sign-in: a field engineer
    /// named after the local part of the address.
    pub fn provision(&self, email: &str, now: DateTime<Utc>) -> DomainResult<User> {
        let email = self.admit(email)?;
        let name = email.split('@').next().unwrap_or_default().to_string();
        User::new(UserId::generate(), &email, &name, Role::FieldEngineer, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> IdentityGate {
        IdentityGate::new("sprintug.com")
    }

    #[test]
    fn admits_addresses_in_the_allowed_domain() {
        assert_eq!(
            gate().admit(" Jane.Smith@SPRINTUG.com").unwrap(),
            "jane.smith@sprintug.com"
        );
    }

    #[test]
    fn rejects_foreign_domains_and_malformed_addresses() {
        assert!(matches!(
            gate().admit("eve@example.com"),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            gate().admit("not-an-email"),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn provisions_field_engineer_named_after_local_part() {
        let user = gate().provision("new.hire@sprintug.com", Utc::now()).unwrap();
        assert_eq!(user.role, Role::FieldEngineer);
        assert_eq!(user.name, "new.hire");
        assert_eq!(user.email, "new.hire@sprintug.com");
    }

    #[test]
    fn leading_at_sign_in_configured_domain_is_ignored() {
        let gate = IdentityGate::new(" @SprintUG.com");
        assert_eq!(gate.admit("a@sprintug.com").unwrap(), "a@sprintug.com");
        assert!(gate.admit("a@example.com").is_err());
    }
}
