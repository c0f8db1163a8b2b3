//! Registration access policy
//!
//! The deployed contracts let any caller register council members and set
//! identity flags. That behaviour is kept as [`AccessPolicy::Open`]; deployments
//! that want a closed registrar set choose [`AccessPolicy::AdminGated`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::principal::PrincipalId;

/// Who may perform a registration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Any caller may register any identity
    #[default]
    Open,
    /// Only the listed administrators may register
    AdminGated { admins: BTreeSet<PrincipalId> },
}

impl AccessPolicy {
    /// Build an admin-gated policy from a list of administrators
    pub fn admin_gated(admins: impl IntoIterator<Item = PrincipalId>) -> Self {
        AccessPolicy::AdminGated {
            admins: admins.into_iter().collect(),
        }
    }

    /// Whether `registrar` may perform a registration under this policy
    pub fn permits(&self, registrar: &PrincipalId) -> bool {
        match self {
            AccessPolicy::Open => true,
            AccessPolicy::AdminGated { admins } => admins.contains(registrar),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, AccessPolicy::Open)
    }
}
