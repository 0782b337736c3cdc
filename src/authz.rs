//! Roles and the single authorization gate.
//!
//! Every handler that is not public goes through `require_role` (or an
//! ownership check against the authenticated `Identity`); there is no
//! role-string matching anywhere else in the crate.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::jwt::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    AcademicSupervisor,
    IndustrialSupervisor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::AcademicSupervisor => "academic_supervisor",
            Role::IndustrialSupervisor => "industrial_supervisor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "student" => Some(Role::Student),
            "academic_supervisor" => Some(Role::AcademicSupervisor),
            "industrial_supervisor" => Some(Role::IndustrialSupervisor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Human-readable form used in login error messages ("academic supervisor").
    pub fn readable(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SUPERVISORS: &[Role] = &[Role::AcademicSupervisor, Role::IndustrialSupervisor];

pub const ADMIN_OR_SUPERVISOR: &[Role] = &[
    Role::Admin,
    Role::AcademicSupervisor,
    Role::IndustrialSupervisor,
];

/// Gate a handler on the caller's role. On mismatch the error carries the
/// required set and the caller's actual role for the 403 body.
pub fn require_role(identity: &Identity, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AppError::forbidden_role(allowed, identity.role))
    }
}

impl Identity {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_supervisor(&self) -> bool {
        SUPERVISORS.contains(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
