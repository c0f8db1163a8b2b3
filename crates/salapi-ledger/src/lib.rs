//! # SALAPI Ledger
//!
//! In-memory SALAPI token ledger and the registries around it.
//!
//! ## Components
//!
//! - **Identity**: KYC / KYB / identity badge credentials
//! - **Token**: non-fungible purpose-tagged tokens, KYC-gated mint and transfer
//! - **Consensus**: proof-of-identity validators and delegated responsibility
//! - **Rewards**: contribution scores, bug bounties, audit scanner
//! - **Events**: append-only event log shared by all components
//!
//! Every component is addressed by a [`ResourceId`] and refuses mutations
//! while that resource is paused in the shared [`PauseRegistry`], which the
//! governance kill switch controls.

pub mod consensus;
pub mod events;
pub mod identity;
pub mod rewards;
pub mod token;

use std::sync::Arc;

use salapi_common::{AccessPolicy, IdentifierError, PauseRegistry, ResourceId};
use serde::{Deserialize, Serialize};

pub use consensus::{DelegatedResponsibility, ProofOfIdentity};
pub use events::{EventLog, LedgerEvent, RecordedEvent};
pub use identity::{Credential, IdentityRegistry, IdentityVerifier};
pub use rewards::{AuditFinding, AuditScanner, BugBountyProgram, BugReport, ContributionLedger};
pub use token::{SalapiToken, TokenData};

/// Shared state every ledger component writes through
#[derive(Debug, Clone, Default)]
pub struct LedgerContext {
    pub pauses: PauseRegistry,
    pub events: EventLog,
}

impl LedgerContext {
    pub fn new(pauses: PauseRegistry) -> Self {
        Self {
            pauses,
            events: EventLog::new(),
        }
    }
}

/// Resource addresses of the ledger components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAddresses {
    pub identity: ResourceId,
    pub token: ResourceId,
    pub validators: ResourceId,
    pub delegation: ResourceId,
    pub contributions: ResourceId,
    pub bounty: ResourceId,
    pub scanner: ResourceId,
}

impl LedgerAddresses {
    /// Addresses derived from a common prefix, e.g. `salapi.token`
    pub fn with_prefix(prefix: &str) -> Result<Self, IdentifierError> {
        let at = |name: &str| ResourceId::new(format!("{prefix}.{name}"));
        Ok(Self {
            identity: at("identity")?,
            token: at("token")?,
            validators: at("validators")?,
            delegation: at("delegation")?,
            contributions: at("contributions")?,
            bounty: at("bounty")?,
            scanner: at("scanner")?,
        })
    }
}

/// The full ledger wired to one identity registry and one pause registry
pub struct SalapiLedger {
    addresses: LedgerAddresses,
    ctx: LedgerContext,
    identity: Arc<IdentityRegistry>,
    token: Arc<SalapiToken>,
    validators: ProofOfIdentity,
    delegation: DelegatedResponsibility,
    contributions: ContributionLedger,
    bounty: BugBountyProgram,
    scanner: AuditScanner,
}

impl SalapiLedger {
    pub fn new(addresses: LedgerAddresses, registrars: AccessPolicy, pauses: PauseRegistry) -> Self {
        let ctx = LedgerContext::new(pauses);

        let identity = Arc::new(IdentityRegistry::new(
            addresses.identity.clone(),
            registrars,
            ctx.clone(),
        ));
        let verifier: Arc<dyn IdentityVerifier> = identity.clone();

        let token = Arc::new(SalapiToken::new(
            addresses.token.clone(),
            verifier.clone(),
            ctx.clone(),
        ));
        let validators = ProofOfIdentity::new(
            addresses.validators.clone(),
            verifier.clone(),
            token.clone(),
            ctx.clone(),
        );
        let delegation =
            DelegatedResponsibility::new(addresses.delegation.clone(), verifier.clone(), ctx.clone());
        let contributions =
            ContributionLedger::new(addresses.contributions.clone(), verifier, ctx.clone());
        let bounty = BugBountyProgram::new(addresses.bounty.clone(), ctx.clone());
        let scanner = AuditScanner::new(addresses.scanner.clone(), ctx.clone());

        Self {
            addresses,
            ctx,
            identity,
            token,
            validators,
            delegation,
            contributions,
            bounty,
            scanner,
        }
    }

    pub fn addresses(&self) -> &LedgerAddresses {
        &self.addresses
    }

    pub fn identity(&self) -> &IdentityRegistry {
        &self.identity
    }

    pub fn token(&self) -> &SalapiToken {
        &self.token
    }

    pub fn validators(&self) -> &ProofOfIdentity {
        &self.validators
    }

    pub fn delegation(&self) -> &DelegatedResponsibility {
        &self.delegation
    }

    pub fn contributions(&self) -> &ContributionLedger {
        &self.contributions
    }

    pub fn bounty(&self) -> &BugBountyProgram {
        &self.bounty
    }

    pub fn scanner(&self) -> &AuditScanner {
        &self.scanner
    }

    pub fn events(&self) -> &EventLog {
        &self.ctx.events
    }

    pub fn pauses(&self) -> &PauseRegistry {
        &self.ctx.pauses
    }
}

impl std::fmt::Debug for SalapiLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalapiLedger")
            .field("addresses", &self.addresses)
            .field("token", &self.token)
            .field("events", &self.ctx.events.len())
            .finish()
    }
}
