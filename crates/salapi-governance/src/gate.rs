//! Threshold approval gate
//!
//! Gates an action behind N approvals from a registered approver set. The
//! gate owns two pieces of state: the approver set and the open approval
//! rounds. Both live behind one mutex, so "authorize, count, check, trigger,
//! reset" is a single indivisible step even when the gate is shared across
//! threads:
//!
//! - a rejected approval leaves every counter untouched
//! - the quorum-completing approval is the only one that observes the trigger
//! - no caller ever observes a round counter at or above quorum
//!
//! Triggers are delivered in three ways: as the return value of the approval
//! that completed the round, to every [`TriggerHandler`] attached at
//! construction (invoked while the gate lock is held), and on a tokio
//! broadcast channel for asynchronous subscribers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use salapi_common::{AccessPolicy, GovernanceError, PrincipalId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::{GovernanceConfig, RoundScope, VotePolicy};

/// Identity-verification predicate consumed by gated components
pub trait ApproverDirectory {
    fn is_approver(&self, identity: &PrincipalId) -> bool;
}

/// Receives triggers synchronously, inside the gate's critical section
///
/// Handlers must not call back into the gate.
pub trait TriggerHandler<A>: Send + Sync {
    fn on_triggered(&self, triggered: &Triggered<A>);
}

/// A completed approval round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggered<A> {
    /// The gated action released by this round
    pub action: A,
    /// Sequence number of the completed round, starting at 1
    pub round: u64,
    /// Approvers counted toward the round, in arrival order
    pub approvals: Vec<PrincipalId>,
    /// Trigger timestamp (Unix milliseconds)
    pub triggered_at: i64,
}

/// Result of a successful `approve` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome<A> {
    /// Approval counted, quorum not yet reached
    Pending { approvals: u32, quorum: u32 },
    /// Approver already voted in this round; nothing changed
    AlreadyCounted { approvals: u32, quorum: u32 },
    /// Approval completed the round; the counter is back at zero
    Triggered(Triggered<A>),
}

impl<A> ApprovalOutcome<A> {
    pub fn is_triggered(&self) -> bool {
        matches!(self, ApprovalOutcome::Triggered(_))
    }

    /// Round counter after the call
    pub fn approvals(&self) -> u32 {
        match self {
            ApprovalOutcome::Pending { approvals, .. }
            | ApprovalOutcome::AlreadyCounted { approvals, .. } => *approvals,
            ApprovalOutcome::Triggered(_) => 0,
        }
    }
}

#[derive(Debug, Default)]
struct Round {
    approvals: Vec<PrincipalId>,
    voters: HashSet<PrincipalId>,
}

impl Round {
    fn count(&self) -> u32 {
        // Bounded by quorum, which is a u32
        self.approvals.len() as u32
    }
}

#[derive(Debug)]
struct GateState<A> {
    approvers: HashSet<PrincipalId>,
    /// Open rounds; keyed by `None` under [`RoundScope::Shared`]
    rounds: HashMap<Option<A>, Round>,
    completed: u64,
}

/// N-of-M approval gate over actions of type `A`
pub struct ThresholdApprovalGate<A> {
    quorum: u32,
    registration: AccessPolicy,
    vote_policy: VotePolicy,
    round_scope: RoundScope,
    max_open_rounds: usize,
    state: Mutex<GateState<A>>,
    handlers: Vec<Arc<dyn TriggerHandler<A>>>,
    events: broadcast::Sender<Triggered<A>>,
}

impl<A> ThresholdApprovalGate<A>
where
    A: Clone + Eq + Hash + fmt::Debug,
{
    /// Create a gate from configuration
    pub fn new(config: GovernanceConfig) -> Result<Self, GovernanceError> {
        config.validate()?;

        if config.registration.is_open() {
            warn!(
                quorum = config.quorum,
                "Approver registration is open: any caller may register approvers"
            );
        }

        let (events, _) = broadcast::channel(config.event_buffer);

        Ok(Self {
            quorum: config.quorum,
            registration: config.registration,
            vote_policy: config.vote_policy,
            round_scope: config.round_scope,
            max_open_rounds: config.max_open_rounds,
            state: Mutex::new(GateState {
                approvers: HashSet::new(),
                rounds: HashMap::new(),
                completed: 0,
            }),
            handlers: Vec::new(),
            events,
        })
    }

    /// Create a gate with the given quorum and default policies
    pub fn with_quorum(quorum: u32) -> Result<Self, GovernanceError> {
        Self::new(GovernanceConfig::with_quorum(quorum))
    }

    /// Attach a synchronous trigger handler
    pub fn with_handler(mut self, handler: Arc<dyn TriggerHandler<A>>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Approvals required to fire the gated action
    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    pub fn vote_policy(&self) -> VotePolicy {
        self.vote_policy
    }

    pub fn round_scope(&self) -> RoundScope {
        self.round_scope
    }

    /// Add `identity` to the approver set
    ///
    /// Idempotent: returns `Ok(false)` when the identity was already an
    /// approver. Under admin-gated registration a non-admin `registrar` is
    /// rejected and the set is left unchanged.
    pub fn register_approver(
        &self,
        registrar: &PrincipalId,
        identity: PrincipalId,
    ) -> Result<bool, GovernanceError> {
        if !self.registration.permits(registrar) {
            warn!(registrar = %registrar, identity = %identity, "Approver registration denied");
            return Err(GovernanceError::RegistrationDenied {
                registrar: registrar.to_string(),
            });
        }

        let mut state = self.state.lock();
        let inserted = state.approvers.insert(identity.clone());
        if inserted {
            info!(
                registrar = %registrar,
                approver = %identity,
                approvers = state.approvers.len(),
                "Approver registered"
            );
        }
        Ok(inserted)
    }

    /// Record an approval of `action` by `caller`
    ///
    /// Fails with [`GovernanceError::Unauthorized`] when the caller is not a
    /// registered approver, and with [`GovernanceError::TooManyOpenRounds`]
    /// when it would open a round beyond the configured limit. When the
    /// approval completes the round, every
    /// handler runs, subscribers are notified and the round is reset before
    /// the lock is released.
    pub fn approve(
        &self,
        caller: &PrincipalId,
        action: A,
    ) -> Result<ApprovalOutcome<A>, GovernanceError> {
        let mut state = self.state.lock();

        if !state.approvers.contains(caller) {
            warn!(caller = %caller, action = ?action, "Approval rejected: not an approver");
            return Err(GovernanceError::Unauthorized {
                caller: caller.to_string(),
            });
        }

        let key = self.round_key(&action);
        if !state.rounds.contains_key(&key) && state.rounds.len() >= self.max_open_rounds {
            warn!(
                caller = %caller,
                action = ?action,
                limit = self.max_open_rounds,
                "Approval rejected: too many open rounds"
            );
            return Err(GovernanceError::TooManyOpenRounds {
                limit: self.max_open_rounds,
            });
        }
        let round = state.rounds.entry(key.clone()).or_default();

        if self.vote_policy == VotePolicy::Distinct && round.voters.contains(caller) {
            debug!(caller = %caller, action = ?action, "Approval already counted this round");
            return Ok(ApprovalOutcome::AlreadyCounted {
                approvals: round.count(),
                quorum: self.quorum,
            });
        }

        round.voters.insert(caller.clone());
        round.approvals.push(caller.clone());

        let approvals = round.count();
        if approvals < self.quorum {
            debug!(
                caller = %caller,
                action = ?action,
                approvals,
                quorum = self.quorum,
                "Approval counted"
            );
            return Ok(ApprovalOutcome::Pending {
                approvals,
                quorum: self.quorum,
            });
        }

        let finished = std::mem::take(round);
        state.rounds.remove(&key);
        state.completed += 1;

        let triggered = Triggered {
            action,
            round: state.completed,
            approvals: finished.approvals,
            triggered_at: chrono::Utc::now().timestamp_millis(),
        };

        info!(
            action = ?triggered.action,
            round = triggered.round,
            quorum = self.quorum,
            "Quorum reached, gated action triggered"
        );

        for handler in &self.handlers {
            handler.on_triggered(&triggered);
        }

        // No subscribers is fine
        let _ = self.events.send(triggered.clone());

        Ok(ApprovalOutcome::Triggered(triggered))
    }

    pub fn is_approver(&self, identity: &PrincipalId) -> bool {
        self.state.lock().approvers.contains(identity)
    }

    /// Sorted snapshot of the approver set
    pub fn approvers(&self) -> Vec<PrincipalId> {
        let mut approvers: Vec<_> = self.state.lock().approvers.iter().cloned().collect();
        approvers.sort();
        approvers
    }

    /// Current counter of the round `action` belongs to
    pub fn pending_approvals(&self, action: &A) -> u32 {
        let key = self.round_key(action);
        self.state
            .lock()
            .rounds
            .get(&key)
            .map(Round::count)
            .unwrap_or(0)
    }

    /// Rounds holding at least one approval
    pub fn open_rounds(&self) -> usize {
        self.state.lock().rounds.len()
    }

    /// Number of rounds that reached quorum so far
    pub fn rounds_completed(&self) -> u64 {
        self.state.lock().completed
    }

    /// Subscribe to trigger notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Triggered<A>> {
        self.events.subscribe()
    }

    fn round_key(&self, action: &A) -> Option<A> {
        match self.round_scope {
            RoundScope::Shared => None,
            RoundScope::PerAction => Some(action.clone()),
        }
    }
}

impl<A> ApproverDirectory for ThresholdApprovalGate<A>
where
    A: Clone + Eq + Hash + fmt::Debug,
{
    fn is_approver(&self, identity: &PrincipalId) -> bool {
        ThresholdApprovalGate::is_approver(self, identity)
    }
}

impl<A> fmt::Debug for ThresholdApprovalGate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdApprovalGate")
            .field("quorum", &self.quorum)
            .field("registration", &self.registration)
            .field("vote_policy", &self.vote_policy)
            .field("round_scope", &self.round_scope)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
