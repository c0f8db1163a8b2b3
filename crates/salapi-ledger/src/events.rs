//! Ledger event log
//!
//! In-memory, append-only record of every state change made by the ledger
//! components. Each entry carries a uuid v7 id.

use std::sync::Arc;

use parking_lot::RwLock;
use salapi_common::{PrincipalId, ResourceId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Credential;

/// Ledger state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    CredentialUpdated {
        principal: PrincipalId,
        credential: Credential,
        status: bool,
    },
    TokenMinted {
        token_id: u64,
        owner: PrincipalId,
        purpose_tag: String,
    },
    TokenTransferred {
        token_id: u64,
        from: PrincipalId,
        to: PrincipalId,
    },
    ValidatorRegistered {
        validator: PrincipalId,
    },
    DelegateRegistered {
        delegate: PrincipalId,
    },
    Delegated {
        delegator: PrincipalId,
        delegate: PrincipalId,
    },
    ContributionRecorded {
        user: PrincipalId,
        score: u64,
        total: u64,
    },
    BugSubmitted {
        researcher: PrincipalId,
        contract: ResourceId,
        description: String,
    },
    AuditLogged {
        contract: ResourceId,
        result: String,
    },
}

/// An event as stored in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event_id: Uuid,
    /// Component that emitted the event
    pub source: ResourceId,
    /// Unix milliseconds
    pub recorded_at: i64,
    pub event: LedgerEvent,
}

/// Shared append-only event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<RwLock<Vec<RecordedEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event emitted by `source`
    pub fn record(&self, source: &ResourceId, event: LedgerEvent) -> RecordedEvent {
        let recorded = RecordedEvent {
            event_id: Uuid::now_v7(),
            source: source.clone(),
            recorded_at: chrono::Utc::now().timestamp_millis(),
            event,
        };
        self.entries.write().push(recorded.clone());
        recorded
    }

    /// Snapshot of all events in append order
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.entries.read().clone()
    }

    /// Events emitted by one component
    pub fn events_from(&self, source: &ResourceId) -> Vec<RecordedEvent> {
        self.entries
            .read()
            .iter()
            .filter(|e| &e.source == source)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
