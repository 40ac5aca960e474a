//! `reqflow-auth`: identities and roles of the actors in the requisition workflow.
//!
//! This crate is intentionally decoupled from HTTP and storage. It performs no
//! credential verification: identities are supplied by the caller.

pub mod identity;
pub mod principal;
pub mod roles;
pub mod user;

pub use identity::IdentityGate;
pub use principal::Actor;
pub use roles::Role;
pub use user::User;
