//! # SALAPI Common
//!
//! Shared types, errors, and coordination primitives for the SALAPI ledger
//! and its governance contracts.
//!
//! ## Core Types
//!
//! - [`PrincipalId`]: opaque identity of an account, approver or registrar
//! - [`ResourceId`]: a pausable target resource (a deployed contract)
//! - [`AccessPolicy`]: who may perform registrations
//! - [`PauseRegistry`]: shared set of paused resources
//!
//! ## Errors
//!
//! - [`SalapiError`]: unified error with governance and ledger variants

pub mod error;
pub mod pause;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{GovernanceError, IdentifierError, LedgerError, Result, SalapiError};
pub use pause::PauseRegistry;
pub use types::{
    access::AccessPolicy,
    principal::{PrincipalId, ResourceId},
};

/// Approvals required by the emergency council
pub const DEFAULT_QUORUM: u32 = 3;
