//! Emergency kill switch
//!
//! A council of approvers pauses or resumes ledger resources once enough
//! members agree. Completed rounds are applied to the shared
//! [`PauseRegistry`] from inside the gate's critical section, so the pause
//! state always reflects triggers in the order they fired.

use std::fmt;
use std::sync::Arc;

use salapi_common::{GovernanceError, PauseRegistry, PrincipalId, ResourceId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::GovernanceConfig;
use crate::gate::{ApprovalOutcome, ThresholdApprovalGate, TriggerHandler, Triggered};

/// Action released by the emergency council
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum GatedAction {
    Pause(ResourceId),
    Unpause(ResourceId),
}

impl GatedAction {
    pub fn target(&self) -> &ResourceId {
        match self {
            GatedAction::Pause(target) | GatedAction::Unpause(target) => target,
        }
    }
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatedAction::Pause(target) => write!(f, "pause {target}"),
            GatedAction::Unpause(target) => write!(f, "unpause {target}"),
        }
    }
}

impl TriggerHandler<GatedAction> for PauseRegistry {
    fn on_triggered(&self, triggered: &Triggered<GatedAction>) {
        match &triggered.action {
            GatedAction::Pause(target) => {
                self.pause(target);
            }
            GatedAction::Unpause(target) => {
                self.unpause(target);
            }
        }
    }
}

/// Multi-party emergency pause governance
#[derive(Debug)]
pub struct KillSwitchGovernance {
    gate: ThresholdApprovalGate<GatedAction>,
    pauses: PauseRegistry,
}

impl KillSwitchGovernance {
    /// Create a kill switch writing to `pauses`
    pub fn new(config: GovernanceConfig, pauses: PauseRegistry) -> Result<Self, GovernanceError> {
        let gate = ThresholdApprovalGate::new(config)?.with_handler(Arc::new(pauses.clone()));
        Ok(Self { gate, pauses })
    }

    /// Add a member to the emergency council
    pub fn register_council_member(
        &self,
        registrar: &PrincipalId,
        member: PrincipalId,
    ) -> Result<bool, GovernanceError> {
        self.gate.register_approver(registrar, member)
    }

    pub fn is_council_member(&self, identity: &PrincipalId) -> bool {
        self.gate.is_approver(identity)
    }

    /// Vote to pause `target`
    pub fn approve_pause(
        &self,
        caller: &PrincipalId,
        target: ResourceId,
    ) -> Result<ApprovalOutcome<GatedAction>, GovernanceError> {
        self.gate.approve(caller, GatedAction::Pause(target))
    }

    /// Vote to resume `target`
    pub fn approve_unpause(
        &self,
        caller: &PrincipalId,
        target: ResourceId,
    ) -> Result<ApprovalOutcome<GatedAction>, GovernanceError> {
        self.gate.approve(caller, GatedAction::Unpause(target))
    }

    pub fn is_paused(&self, target: &ResourceId) -> bool {
        self.pauses.is_paused(target)
    }

    pub fn required_approvals(&self) -> u32 {
        self.gate.quorum()
    }

    /// Approvals collected toward the round `action` belongs to
    pub fn pending_approvals(&self, action: &GatedAction) -> u32 {
        self.gate.pending_approvals(action)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Triggered<GatedAction>> {
        self.gate.subscribe()
    }

    pub fn gate(&self) -> &ThresholdApprovalGate<GatedAction> {
        &self.gate
    }

    pub fn pause_registry(&self) -> &PauseRegistry {
        &self.pauses
    }
}
