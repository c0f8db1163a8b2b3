//! SALAPI token
//!
//! Each minted token is a distinct record carrying its owner, a purpose tag
//! and the mint timestamp, so two tokens are never interchangeable. Minting
//! and transferring require KYC on both sides of the operation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use salapi_common::{LedgerError, PrincipalId, ResourceId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::events::LedgerEvent;
use crate::identity::IdentityVerifier;
use crate::LedgerContext;

/// Token name
pub const TOKEN_NAME: &str = "SALAPI";

/// Token symbol
pub const TOKEN_SYMBOL: &str = "$SALAPI";

/// Supply at deployment, in base units (18 decimals)
pub const INITIAL_SUPPLY: u128 = 314_159_000 * 10u128.pow(18);

/// A minted token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub owner: PrincipalId,
    pub purpose_tag: String,
    /// Mint timestamp (Unix milliseconds)
    pub minted_at: i64,
}

#[derive(Debug)]
struct TokenState {
    tokens: BTreeMap<u64, TokenData>,
    last_id: u64,
    total_supply: u128,
}

/// Identity-gated token ledger
pub struct SalapiToken {
    address: ResourceId,
    identity: Arc<dyn IdentityVerifier>,
    state: RwLock<TokenState>,
    ctx: LedgerContext,
}

impl SalapiToken {
    pub fn new(address: ResourceId, identity: Arc<dyn IdentityVerifier>, ctx: LedgerContext) -> Self {
        Self {
            address,
            identity,
            state: RwLock::new(TokenState {
                tokens: BTreeMap::new(),
                last_id: 0,
                total_supply: INITIAL_SUPPLY,
            }),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    pub fn name(&self) -> &'static str {
        TOKEN_NAME
    }

    pub fn symbol(&self) -> &'static str {
        TOKEN_SYMBOL
    }

    pub fn total_supply(&self) -> u128 {
        self.state.read().total_supply
    }

    /// Mint a token owned by `caller`; ids start at 1
    pub fn mint_token(
        &self,
        caller: &PrincipalId,
        purpose_tag: impl Into<String>,
    ) -> Result<u64, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        self.require_kyc(caller)?;

        let purpose_tag = purpose_tag.into();
        let token_id = {
            let mut state = self.state.write();
            let token_id = state
                .last_id
                .checked_add(1)
                .ok_or(LedgerError::Overflow { counter: "token id" })?;
            let total_supply = state
                .total_supply
                .checked_add(1)
                .ok_or(LedgerError::Overflow {
                    counter: "total supply",
                })?;

            state.last_id = token_id;
            state.total_supply = total_supply;
            state.tokens.insert(
                token_id,
                TokenData {
                    owner: caller.clone(),
                    purpose_tag: purpose_tag.clone(),
                    minted_at: chrono::Utc::now().timestamp_millis(),
                },
            );
            token_id
        };

        info!(token_id, owner = %caller, purpose = %purpose_tag, "Token minted");
        self.ctx.events.record(
            &self.address,
            LedgerEvent::TokenMinted {
                token_id,
                owner: caller.clone(),
                purpose_tag,
            },
        );
        Ok(token_id)
    }

    /// Move `token_id` from `caller` to `to`
    pub fn transfer_token(
        &self,
        caller: &PrincipalId,
        token_id: u64,
        to: &PrincipalId,
    ) -> Result<(), LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        self.require_kyc(caller)?;

        {
            let mut state = self.state.write();
            let token = state
                .tokens
                .get_mut(&token_id)
                .ok_or(LedgerError::TokenNotFound { token_id })?;
            if &token.owner != caller {
                return Err(LedgerError::NotOwner {
                    caller: caller.to_string(),
                    token_id,
                });
            }
            if !self.identity.is_kyc_verified(to) {
                return Err(LedgerError::RecipientNotVerified {
                    recipient: to.to_string(),
                });
            }
            token.owner = to.clone();
        }

        info!(token_id, from = %caller, to = %to, "Token transferred");
        self.ctx.events.record(
            &self.address,
            LedgerEvent::TokenTransferred {
                token_id,
                from: caller.clone(),
                to: to.clone(),
            },
        );
        Ok(())
    }

    pub fn token_data(&self, token_id: u64) -> Option<TokenData> {
        self.state.read().tokens.get(&token_id).cloned()
    }

    pub fn exists(&self, token_id: u64) -> bool {
        self.state.read().tokens.contains_key(&token_id)
    }

    /// Ids of tokens currently owned by `owner`
    pub fn tokens_of(&self, owner: &PrincipalId) -> Vec<u64> {
        self.state
            .read()
            .tokens
            .iter()
            .filter(|(_, data)| &data.owner == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    fn require_kyc(&self, principal: &PrincipalId) -> Result<(), LedgerError> {
        if !self.identity.is_kyc_verified(principal) {
            debug!(principal = %principal, token = %self.address, "KYC check failed");
            return Err(LedgerError::KycRequired {
                principal: principal.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SalapiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SalapiToken")
            .field("address", &self.address)
            .field("minted", &state.last_id)
            .field("total_supply", &state.total_supply)
            .finish()
    }
}
