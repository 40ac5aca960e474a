//! Recipient resolution: which users are told about a status.

use std::collections::HashSet;

use reqflow_auth::{Role, User};
use reqflow_core::UserId;

use crate::requisition::{Requisition, RequisitionStatus};
use crate::rules::{Audience, rule_for};

/// Users who receive the stage email for `status`.
///
/// The requester (looked up by id; silently skipped if no longer in the
/// directory) plus every user holding one of the status's email roles.
/// Each user appears once even if they qualify more than once.
pub fn resolve_recipients(
    status: RequisitionStatus,
    requisition: &Requisition,
    all_users: &[User],
) -> Vec<User> {
    let requester = all_users
        .iter()
        .filter(|u| &u.id == requisition.requester_id());
    let by_role = rule_for(status)
        .email_roles
        .iter()
        .flat_map(|role| users_with_role(*role, all_users));

    dedup_by_id(requester.chain(by_role))
}

/// Users addressed by an in-app notice audience.
pub fn resolve_audience(
    audience: Audience,
    requisition: &Requisition,
    all_users: &[User],
) -> Vec<UserId> {
    match audience {
        // The requester is addressed by id even if they left the directory,
        // so their inbox still shows the history if they return.
        Audience::Requester => vec![requisition.requester_id().clone()],
        Audience::Role(role) => users_with_role(role, all_users)
            .map(|u| u.id.clone())
            .collect(),
    }
}

pub fn users_with_role(role: Role, all_users: &[User]) -> impl Iterator<Item = &User> {
    all_users.iter().filter(move |u| u.role == role)
}

fn dedup_by_id<'a>(users: impl Iterator<Item = &'a User>) -> Vec<User> {
    let mut seen: HashSet<&UserId> = HashSet::new();
    users
        .filter(|u| seen.insert(&u.id))
        .cloned()
        .collect()
}
