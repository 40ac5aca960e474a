use core::str::FromStr;

use serde::{Deserialize, Serialize};

use reqflow_core::DomainError;

/// Actor category. Roles decide which workflow steps a user is expected to
/// perform and which notifications they receive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    FieldEngineer,
    StoreManager,
    Projects,
    Management,
    Accounts,
    Csnoc,
    Admin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::FieldEngineer,
        Role::StoreManager,
        Role::Projects,
        Role::Management,
        Role::Accounts,
        Role::Csnoc,
        Role::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::FieldEngineer => "field_engineer",
            Role::StoreManager => "store_manager",
            Role::Projects => "projects",
            Role::Management => "management",
            Role::Accounts => "accounts",
            Role::Csnoc => "csnoc",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}
