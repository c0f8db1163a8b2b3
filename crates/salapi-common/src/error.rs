//! Error types for SALAPI
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;

/// Result type alias using SalapiError
pub type Result<T> = std::result::Result<T, SalapiError>;

/// Unified error type for SALAPI operations
#[derive(Debug, Error)]
pub enum SalapiError {
    // Governance errors
    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    // Ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // Identifier errors
    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Approval gate errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Caller {caller} is not a registered approver")]
    Unauthorized { caller: String },

    #[error("Registrar {registrar} may not register approvers")]
    RegistrationDenied { registrar: String },

    #[error("Invalid quorum {quorum}: must be at least 1")]
    InvalidQuorum { quorum: u32 },

    #[error("Invalid event buffer {capacity}: must be between 1 and {max}")]
    InvalidEventBuffer { capacity: usize, max: usize },

    #[error("Invalid open round limit {limit}: must be at least 1")]
    InvalidRoundLimit { limit: usize },

    #[error("Admin-gated registration requires at least one admin")]
    NoAdmins,

    #[error("Too many open approval rounds (limit {limit})")]
    TooManyOpenRounds { limit: usize },
}

/// Token ledger and registry errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("KYC not verified: {principal}")]
    KycRequired { principal: String },

    #[error("Recipient not KYC verified: {recipient}")]
    RecipientNotVerified { recipient: String },

    #[error("{caller} is not the owner of token {token_id}")]
    NotOwner { caller: String, token_id: u64 },

    #[error("Token not found: {token_id}")]
    TokenNotFound { token_id: u64 },

    #[error("Resource is paused: {resource}")]
    Paused { resource: String },

    #[error("Not a validator: {caller}")]
    NotValidator { caller: String },

    #[error("Not a valid delegate: {delegate}")]
    NotDelegate { delegate: String },

    #[error("Registrar {registrar} may not update identity credentials")]
    RegistrarDenied { registrar: String },

    #[error("Arithmetic overflow in {counter}")]
    Overflow { counter: &'static str },
}

/// Identifier parsing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Identifier must not be empty")]
    Empty,
}

// Implement From for common external error types
impl From<serde_json::Error> for SalapiError {
    fn from(err: serde_json::Error) -> Self {
        SalapiError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SalapiError {
    fn from(err: std::io::Error) -> Self {
        SalapiError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for SalapiError {
    fn from(err: anyhow::Error) -> Self {
        SalapiError::Internal(err.to_string())
    }
}
