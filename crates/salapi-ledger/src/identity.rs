//! Identity credential registry
//!
//! Tracks per-principal credential flags: KYC for individuals, KYB for
//! businesses, and a soulbound identity badge. Token operations and every
//! satellite registry consult the KYC flag through [`IdentityVerifier`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use salapi_common::{AccessPolicy, LedgerError, PrincipalId, ResourceId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::LedgerEvent;
use crate::LedgerContext;

/// Identity credential kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    /// Know-your-customer check for an individual
    Kyc,
    /// Know-your-business check for an organization
    Kyb,
    /// Non-transferable identity badge
    IdentityBadge,
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Kyc => write!(f, "kyc"),
            Credential::Kyb => write!(f, "kyb"),
            Credential::IdentityBadge => write!(f, "identity_badge"),
        }
    }
}

/// KYC predicate consumed by the token and satellite registries
pub trait IdentityVerifier: Send + Sync {
    fn is_kyc_verified(&self, principal: &PrincipalId) -> bool;
}

/// Credential flag store
pub struct IdentityRegistry {
    address: ResourceId,
    registrars: AccessPolicy,
    credentials: RwLock<HashMap<PrincipalId, HashSet<Credential>>>,
    ctx: LedgerContext,
}

impl IdentityRegistry {
    pub fn new(address: ResourceId, registrars: AccessPolicy, ctx: LedgerContext) -> Self {
        if registrars.is_open() {
            warn!(registry = %address, "Identity registry accepts updates from any caller");
        }
        Self {
            address,
            registrars,
            credentials: RwLock::new(HashMap::new()),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    /// Grant or revoke a credential
    ///
    /// Returns whether the principal's credentials changed. Re-granting a held
    /// credential or revoking one never held records nothing.
    pub fn set_credential(
        &self,
        registrar: &PrincipalId,
        principal: &PrincipalId,
        credential: Credential,
        status: bool,
    ) -> Result<bool, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        if !self.registrars.permits(registrar) {
            warn!(registrar = %registrar, principal = %principal, "Credential update denied");
            return Err(LedgerError::RegistrarDenied {
                registrar: registrar.to_string(),
            });
        }

        let changed = {
            let mut credentials = self.credentials.write();
            if status {
                credentials
                    .entry(principal.clone())
                    .or_default()
                    .insert(credential)
            } else if let Some(held) = credentials.get_mut(principal) {
                let removed = held.remove(&credential);
                if held.is_empty() {
                    credentials.remove(principal);
                }
                removed
            } else {
                false
            }
        };
        if !changed {
            debug!(principal = %principal, credential = %credential, status, "Credential unchanged");
            return Ok(false);
        }

        info!(
            registrar = %registrar,
            principal = %principal,
            credential = %credential,
            status,
            "Credential updated"
        );
        self.ctx.events.record(
            &self.address,
            LedgerEvent::CredentialUpdated {
                principal: principal.clone(),
                credential,
                status,
            },
        );
        Ok(true)
    }

    pub fn set_kyc(
        &self,
        registrar: &PrincipalId,
        user: &PrincipalId,
        status: bool,
    ) -> Result<bool, LedgerError> {
        self.set_credential(registrar, user, Credential::Kyc, status)
    }

    pub fn verify_user(&self, registrar: &PrincipalId, user: &PrincipalId) -> Result<bool, LedgerError> {
        self.set_credential(registrar, user, Credential::Kyc, true)
    }

    pub fn verify_business(
        &self,
        registrar: &PrincipalId,
        business: &PrincipalId,
    ) -> Result<bool, LedgerError> {
        self.set_credential(registrar, business, Credential::Kyb, true)
    }

    pub fn mint_badge(&self, registrar: &PrincipalId, user: &PrincipalId) -> Result<bool, LedgerError> {
        self.set_credential(registrar, user, Credential::IdentityBadge, true)
    }

    pub fn has(&self, principal: &PrincipalId, credential: Credential) -> bool {
        self.credentials
            .read()
            .get(principal)
            .is_some_and(|held| held.contains(&credential))
    }

    pub fn is_kyc_verified(&self, principal: &PrincipalId) -> bool {
        self.has(principal, Credential::Kyc)
    }

    pub fn is_kyb_verified(&self, principal: &PrincipalId) -> bool {
        self.has(principal, Credential::Kyb)
    }

    pub fn has_identity_badge(&self, principal: &PrincipalId) -> bool {
        self.has(principal, Credential::IdentityBadge)
    }
}

impl IdentityVerifier for IdentityRegistry {
    fn is_kyc_verified(&self, principal: &PrincipalId) -> bool {
        IdentityRegistry::is_kyc_verified(self, principal)
    }
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("address", &self.address)
            .field("registrars", &self.registrars)
            .field("principals", &self.credentials.read().len())
            .finish()
    }
}
