//! Identity-backed consensus registries
//!
//! - [`ProofOfIdentity`]: KYC-verified validators attest that a token exists
//! - [`DelegatedResponsibility`]: KYC-verified delegates receive delegations

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use salapi_common::{LedgerError, PrincipalId, ResourceId};
use tracing::{debug, info};

use crate::events::LedgerEvent;
use crate::identity::IdentityVerifier;
use crate::token::SalapiToken;
use crate::LedgerContext;

fn require_kyc(identity: &dyn IdentityVerifier, principal: &PrincipalId) -> Result<(), LedgerError> {
    if identity.is_kyc_verified(principal) {
        Ok(())
    } else {
        Err(LedgerError::KycRequired {
            principal: principal.to_string(),
        })
    }
}

/// Proof-of-identity validator registry
pub struct ProofOfIdentity {
    address: ResourceId,
    identity: Arc<dyn IdentityVerifier>,
    token: Arc<SalapiToken>,
    validators: RwLock<HashSet<PrincipalId>>,
    ctx: LedgerContext,
}

impl ProofOfIdentity {
    pub fn new(
        address: ResourceId,
        identity: Arc<dyn IdentityVerifier>,
        token: Arc<SalapiToken>,
        ctx: LedgerContext,
    ) -> Self {
        Self {
            address,
            identity,
            token,
            validators: RwLock::new(HashSet::new()),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    /// Register the caller as a validator. Returns `false` if already registered.
    pub fn register_validator(&self, caller: &PrincipalId) -> Result<bool, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        require_kyc(self.identity.as_ref(), caller)?;

        let inserted = self.validators.write().insert(caller.clone());
        if inserted {
            info!(validator = %caller, "Validator registered");
            self.ctx.events.record(
                &self.address,
                LedgerEvent::ValidatorRegistered {
                    validator: caller.clone(),
                },
            );
        }
        Ok(inserted)
    }

    pub fn is_validator(&self, principal: &PrincipalId) -> bool {
        self.validators.read().contains(principal)
    }

    /// Whether `token_id` has been minted; callable by validators only
    pub fn validate_transaction(&self, caller: &PrincipalId, token_id: u64) -> Result<bool, LedgerError> {
        if !self.is_validator(caller) {
            return Err(LedgerError::NotValidator {
                caller: caller.to_string(),
            });
        }
        let valid = self.token.exists(token_id);
        debug!(validator = %caller, token_id, valid, "Transaction validated");
        Ok(valid)
    }
}

/// Delegated proof-of-responsibility registry
pub struct DelegatedResponsibility {
    address: ResourceId,
    identity: Arc<dyn IdentityVerifier>,
    delegates: RwLock<HashSet<PrincipalId>>,
    delegations: RwLock<HashMap<PrincipalId, PrincipalId>>,
    ctx: LedgerContext,
}

impl DelegatedResponsibility {
    pub fn new(address: ResourceId, identity: Arc<dyn IdentityVerifier>, ctx: LedgerContext) -> Self {
        Self {
            address,
            identity,
            delegates: RwLock::new(HashSet::new()),
            delegations: RwLock::new(HashMap::new()),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    /// Register the caller as a delegate. Returns `false` if already registered.
    pub fn register_delegate(&self, caller: &PrincipalId) -> Result<bool, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        require_kyc(self.identity.as_ref(), caller)?;

        let inserted = self.delegates.write().insert(caller.clone());
        if inserted {
            info!(delegate = %caller, "Delegate registered");
            self.ctx.events.record(
                &self.address,
                LedgerEvent::DelegateRegistered {
                    delegate: caller.clone(),
                },
            );
        }
        Ok(inserted)
    }

    pub fn is_delegate(&self, principal: &PrincipalId) -> bool {
        self.delegates.read().contains(principal)
    }

    /// Delegate the caller's responsibility; replaces any earlier delegation
    pub fn delegate_to(&self, caller: &PrincipalId, delegate: &PrincipalId) -> Result<(), LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        if !self.is_delegate(delegate) {
            return Err(LedgerError::NotDelegate {
                delegate: delegate.to_string(),
            });
        }

        self.delegations
            .write()
            .insert(caller.clone(), delegate.clone());
        info!(delegator = %caller, delegate = %delegate, "Responsibility delegated");
        self.ctx.events.record(
            &self.address,
            LedgerEvent::Delegated {
                delegator: caller.clone(),
                delegate: delegate.clone(),
            },
        );
        Ok(())
    }

    pub fn delegation_of(&self, principal: &PrincipalId) -> Option<PrincipalId> {
        self.delegations.read().get(principal).cloned()
    }

    /// Principals currently delegating to `delegate`, sorted
    pub fn delegators_of(&self, delegate: &PrincipalId) -> Vec<PrincipalId> {
        let mut out: Vec<_> = self
            .delegations
            .read()
            .iter()
            .filter(|(_, d)| *d == delegate)
            .map(|(p, _)| p.clone())
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityRegistry;
    use salapi_common::AccessPolicy;

    fn id(s: &str) -> PrincipalId {
        PrincipalId::new(s).unwrap()
    }

    fn identity(ctx: &LedgerContext) -> Arc<IdentityRegistry> {
        Arc::new(IdentityRegistry::new(
            ResourceId::new("salapi.identity").unwrap(),
            AccessPolicy::Open,
            ctx.clone(),
        ))
    }

    #[test]
    fn test_validator_flow() {
        let ctx = LedgerContext::default();
        let identity = identity(&ctx);
        let token = Arc::new(SalapiToken::new(
            ResourceId::new("salapi.token").unwrap(),
            identity.clone(),
            ctx.clone(),
        ));
        let poi = ProofOfIdentity::new(
            ResourceId::new("salapi.poi").unwrap(),
            identity.clone(),
            token.clone(),
            ctx,
        );
        let val = id("0xval");

        assert!(matches!(
            poi.register_validator(&val),
            Err(LedgerError::KycRequired { .. })
        ));
        assert!(matches!(
            poi.validate_transaction(&val, 1),
            Err(LedgerError::NotValidator { .. })
        ));

        identity.verify_user(&val, &val).unwrap();
        assert!(poi.register_validator(&val).unwrap());
        assert!(!poi.register_validator(&val).unwrap());

        assert!(!poi.validate_transaction(&val, 1).unwrap());
        let minted = token.mint_token(&val, "rice").unwrap();
        assert!(poi.validate_transaction(&val, minted).unwrap());
    }

    #[test]
    fn test_delegation_flow() {
        let ctx = LedgerContext::default();
        let identity = identity(&ctx);
        let dpor = DelegatedResponsibility::new(
            ResourceId::new("salapi.dpor").unwrap(),
            identity.clone(),
            ctx,
        );
        let delegate = id("0xdelegate");
        let voter = id("0xvoter");

        assert!(matches!(
            dpor.delegate_to(&voter, &delegate),
            Err(LedgerError::NotDelegate { .. })
        ));

        identity.verify_user(&delegate, &delegate).unwrap();
        dpor.register_delegate(&delegate).unwrap();
        dpor.delegate_to(&voter, &delegate).unwrap();

        assert_eq!(dpor.delegation_of(&voter), Some(delegate.clone()));
        assert_eq!(dpor.delegators_of(&delegate), vec![voter]);
    }

    #[test]
    fn test_redelegation_replaces() {
        let ctx = LedgerContext::default();
        let identity = identity(&ctx);
        let dpor = DelegatedResponsibility::new(
            ResourceId::new("salapi.dpor").unwrap(),
            identity.clone(),
            ctx,
        );
        let (first, second, voter) = (id("0xd1"), id("0xd2"), id("0xvoter"));
        for d in [&first, &second] {
            identity.verify_user(d, d).unwrap();
            dpor.register_delegate(d).unwrap();
        }

        dpor.delegate_to(&voter, &first).unwrap();
        dpor.delegate_to(&voter, &second).unwrap();
        assert_eq!(dpor.delegation_of(&voter), Some(second));
        assert!(dpor.delegators_of(&first).is_empty());
    }
}
