//! # SALAPI Governance
//!
//! Multi-party approval for emergency actions on the SALAPI ledger.
//!
//! ## Components
//!
//! - **Gate**: [`ThresholdApprovalGate`], N-of-M approvals with one-shot
//!   trigger and reset
//! - **Kill switch**: [`KillSwitchGovernance`], council-driven pause and
//!   resume of ledger resources
//! - **Config**: [`GovernanceConfig`], quorum and policy selection
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   KillSwitchGovernance                   │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐  trigger  ┌───────────────────┐  │
//! │  │ThresholdApprovalGate│─────────▶│   PauseRegistry   │  │
//! │  │ (approvers, rounds) │          │ (shared w/ ledger)│  │
//! │  └────────────────────┘           └───────────────────┘  │
//! │            │ broadcast                                   │
//! │            ▼                                             │
//! │       subscribers                                        │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod gate;
pub mod kill_switch;

pub use config::{GovernanceConfig, RoundScope, VotePolicy};
pub use gate::{ApprovalOutcome, ApproverDirectory, ThresholdApprovalGate, TriggerHandler, Triggered};
pub use kill_switch::{GatedAction, KillSwitchGovernance};

/// Governance crate version
pub const GOVERNANCE_VERSION: &str = env!("CARGO_PKG_VERSION");
