//! Role-based authorization matrix.
//!
//! | Action          | Admin | Clinician | ReadOnly |
//! |-----------------|-------|-----------|----------|
//! | read, search    | yes   | yes       | yes      |
//! | create, update  | yes   | yes       | no       |
//! | delete          | yes   | no        | no       |
//!
//! The matrix is the same for every resource kind.

use std::fmt;
use std::str::FromStr;

use fhirlite_core::ResourceKind;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Clinician,
    ReadOnly,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Clinician, Role::ReadOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Clinician => "clinician",
            Role::ReadOnly => "read_only",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{s}' (expected admin, clinician or read_only)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Search,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Read,
        Action::Search,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Search => "search",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `role` may perform `action`.
pub const fn allowed(role: Role, action: Action) -> bool {
    match (role, action) {
        (Role::Admin, _) => true,
        (Role::Clinician, Action::Delete) => false,
        (Role::Clinician, _) => true,
        (Role::ReadOnly, Action::Read | Action::Search) => true,
        (Role::ReadOnly, _) => false,
    }
}

/// Gate an operation on `kind`, failing with `Forbidden` when not allowed.
pub fn authorize(role: Role, action: Action, kind: ResourceKind) -> Result<(), AuthError> {
    if allowed(role, action) {
        return Ok(());
    }
    tracing::info!(%role, %action, resource_type = %kind, "authorization denied");
    Err(AuthError::forbidden("Insufficient permissions"))
}
