//! Demo directory used by the binary and the integration tests.

use chrono::{DateTime, TimeZone, Utc};

use reqflow_auth::{Role, User};
use reqflow_core::UserId;

const DEMO_USERS: [(&str, &str, &str, Role); 7] = [
    ("1", "john.doe@sprintug.com", "John Doe", Role::FieldEngineer),
    ("2", "jane.smith@sprintug.com", "Jane Smith", Role::StoreManager),
    ("3", "bob.wilson@sprintug.com", "Bob Wilson", Role::Projects),
    ("4", "alice.johnson@sprintug.com", "Alice Johnson", Role::Management),
    ("5", "charlie.brown@sprintug.com", "Charlie Brown", Role::Accounts),
    ("6", "diana.prince@sprintug.com", "Diana Prince", Role::Csnoc),
    ("7", "admin@sprintug.com", "System Admin", Role::Admin),
];

/// One user per role, ids "1" through "7".
pub fn demo_users() -> Vec<User> {
    let created_at = seeded_at();
    DEMO_USERS
        .iter()
        .filter_map(|(id, email, name, role)| {
            User::new(UserId::new(*id), email, name, *role, created_at).ok()
        })
        .collect()
}

fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}
