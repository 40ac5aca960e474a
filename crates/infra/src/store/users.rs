use std::sync::{Arc, RwLock};

use reqflow_auth::{Role, User};
use reqflow_core::{DomainError, DomainResult, UserId};

use super::poisoned;

/// The user directory consulted for recipient resolution and administration.
pub trait UserDirectory: Send + Sync {
    fn list(&self) -> Vec<User>;
    fn get(&self, id: &UserId) -> Option<User>;
    /// Case-insensitive lookup.
    fn find_by_email(&self, email: &str) -> Option<User>;
    /// Rejects a duplicate email (`Validation`) or a duplicate id (`Conflict`).
    fn insert(&self, user: User) -> DomainResult<User>;
    /// `None` if the id is unknown.
    fn update_role(&self, id: &UserId, role: Role) -> Option<User>;
    /// `None` if the id is unknown.
    fn remove(&self, id: &UserId) -> Option<User>;
}

impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    fn list(&self) -> Vec<User> {
        (**self).list()
    }

    fn get(&self, id: &UserId) -> Option<User> {
        (**self).get(id)
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        (**self).find_by_email(email)
    }

    fn insert(&self, user: User) -> DomainResult<User> {
        (**self).insert(user)
    }

    fn update_role(&self, id: &UserId, role: Role) -> Option<User> {
        (**self).update_role(id, role)
    }

    fn remove(&self, id: &UserId) -> Option<User> {
        (**self).remove(id)
    }
}

/// In-memory directory; listing keeps insertion order.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> DomainResult<Self> {
        let directory = Self::new();
        for user in users {
            directory.insert(user)?;
        }
        Ok(directory)
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn list(&self) -> Vec<User> {
        match self.users.read() {
            Ok(users) => users.clone(),
            Err(_) => vec![],
        }
    }

    fn get(&self, id: &UserId) -> Option<User> {
        let users = self.users.read().ok()?;
        users.iter().find(|u| &u.id == id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        let email = email.trim();
        let users = self.users.read().ok()?;
        users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn insert(&self, user: User) -> DomainResult<User> {
        let mut users = self.users.write().map_err(|_| poisoned("user directory"))?;

        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DomainError::validation(format!(
                "a user with email {} already exists",
                user.email
            )));
        }
        if users.iter().any(|u| u.id == user.id) {
            return Err(DomainError::conflict(format!("user id {} already taken", user.id)));
        }

        users.push(user.clone());
        Ok(user)
    }

    fn update_role(&self, id: &UserId, role: Role) -> Option<User> {
        let mut users = self.users.write().ok()?;
        let user = users.iter_mut().find(|u| &u.id == id)?;
        user.role = role;
        Some(user.clone())
    }

    fn remove(&self, id: &UserId) -> Option<User> {
        let mut users = self.users.write().ok()?;
        let index = users.iter().position(|u| &u.id == id)?;
        Some(users.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user(id: &str, email: &str, role: Role) -> User {
        User::new(UserId::new(id), email, "Test User", role, Utc::now()).unwrap()
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let dir = InMemoryUserDirectory::new();
        dir.insert(test_user("1", "jane@sprintug.com", Role::StoreManager)).unwrap();

        let err = dir
            .insert(test_user("2", "JANE@sprintug.com", Role::Projects))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn duplicate_id_is_a_conflict() {
        let dir = InMemoryUserDirectory::new();
        dir.insert(test_user("1", "a@sprintug.com", Role::Admin)).unwrap();

        let err = dir.insert(test_user("1", "b@sprintug.com", Role::Admin)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn find_by_email_ignores_case_and_whitespace() {
        let dir =
            InMemoryUserDirectory::with_users([test_user("1", "jane@sprintug.com", Role::Csnoc)])
                .unwrap();

        assert_eq!(
            dir.find_by_email("  Jane@SprintUG.com ").map(|u| u.id),
            Some(UserId::new("1"))
        );
        assert!(dir.find_by_email("nobody@sprintug.com").is_none());
    }

    #[test]
    fn role_update_and_removal_are_idempotent() {
        let dir = InMemoryUserDirectory::with_users([test_user(
            "1",
            "a@sprintug.com",
            Role::FieldEngineer,
        )])
        .unwrap();
        let id = UserId::new("1");

        assert_eq!(dir.update_role(&id, Role::Accounts).map(|u| u.role), Some(Role::Accounts));
        assert_eq!(dir.update_role(&id, Role::Accounts).map(|u| u.role), Some(Role::Accounts));
        assert!(dir.remove(&id).is_some());
        assert!(dir.remove(&id).is_none());
        assert!(dir.update_role(&id, Role::Admin).is_none());
        assert!(dir.list().is_empty());
    }
}
