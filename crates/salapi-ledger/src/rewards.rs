//! Contribution scores, bug bounties and contract audits

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use salapi_common::{LedgerError, PrincipalId, ResourceId};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::events::LedgerEvent;
use crate::identity::IdentityVerifier;
use crate::LedgerContext;

/// Reward credited per accepted bug submission, in SALAPI units
pub const BUG_BOUNTY_REWARD: u64 = 1_000;

/// Result reported by the contract scanner
pub const NO_CRITICAL_FINDINGS: &str = "No critical vulnerabilities found.";

/// Proof-of-contribution score ledger
pub struct ContributionLedger {
    address: ResourceId,
    identity: Arc<dyn IdentityVerifier>,
    scores: RwLock<HashMap<PrincipalId, u64>>,
    ctx: LedgerContext,
}

impl ContributionLedger {
    pub fn new(address: ResourceId, identity: Arc<dyn IdentityVerifier>, ctx: LedgerContext) -> Self {
        Self {
            address,
            identity,
            scores: RwLock::new(HashMap::new()),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    /// Add `score` to a KYC-verified user's total; returns the new total
    pub fn record_contribution(&self, user: &PrincipalId, score: u64) -> Result<u64, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;
        if !self.identity.is_kyc_verified(user) {
            return Err(LedgerError::KycRequired {
                principal: user.to_string(),
            });
        }

        let total = {
            let mut scores = self.scores.write();
            let current = scores.entry(user.clone()).or_insert(0);
            *current = current.checked_add(score).ok_or(LedgerError::Overflow {
                counter: "contribution score",
            })?;
            *current
        };

        info!(user = %user, score, total, "Contribution recorded");
        self.ctx.events.record(
            &self.address,
            LedgerEvent::ContributionRecorded {
                user: user.clone(),
                score,
                total,
            },
        );
        Ok(total)
    }

    pub fn score_of(&self, user: &PrincipalId) -> u64 {
        self.scores.read().get(user).copied().unwrap_or(0)
    }
}

/// An accepted bug submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugReport {
    pub report_id: Uuid,
    pub researcher: PrincipalId,
    pub contract: ResourceId,
    pub description: String,
    pub reward: u64,
    /// Unix milliseconds
    pub submitted_at: i64,
}

/// Bug bounty program
pub struct BugBountyProgram {
    address: ResourceId,
    rewards: RwLock<HashMap<PrincipalId, u64>>,
    reports: RwLock<Vec<BugReport>>,
    ctx: LedgerContext,
}

impl BugBountyProgram {
    pub fn new(address: ResourceId, ctx: LedgerContext) -> Self {
        Self {
            address,
            rewards: RwLock::new(HashMap::new()),
            reports: RwLock::new(Vec::new()),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    /// Accept a submission and credit the researcher
    pub fn submit_bug(
        &self,
        researcher: &PrincipalId,
        contract: &ResourceId,
        description: impl Into<String>,
    ) -> Result<BugReport, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;

        {
            let mut rewards = self.rewards.write();
            let balance = rewards.entry(researcher.clone()).or_insert(0);
            *balance = balance
                .checked_add(BUG_BOUNTY_REWARD)
                .ok_or(LedgerError::Overflow {
                    counter: "bounty rewards",
                })?;
        }

        let report = BugReport {
            report_id: Uuid::now_v7(),
            researcher: researcher.clone(),
            contract: contract.clone(),
            description: description.into(),
            reward: BUG_BOUNTY_REWARD,
            submitted_at: chrono::Utc::now().timestamp_millis(),
        };
        self.reports.write().push(report.clone());

        info!(
            report_id = %report.report_id,
            researcher = %researcher,
            contract = %contract,
            "Bug submitted"
        );
        self.ctx.events.record(
            &self.address,
            LedgerEvent::BugSubmitted {
                researcher: researcher.clone(),
                contract: contract.clone(),
                description: report.description.clone(),
            },
        );
        Ok(report)
    }

    pub fn rewards_of(&self, researcher: &PrincipalId) -> u64 {
        self.rewards.read().get(researcher).copied().unwrap_or(0)
    }

    pub fn reports(&self) -> Vec<BugReport> {
        self.reports.read().clone()
    }
}

/// Logged result of a contract scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub contract: ResourceId,
    pub result: String,
    /// Unix milliseconds
    pub scanned_at: i64,
}

/// On-ledger audit scanner
///
/// Scanning is a placeholder that always reports [`NO_CRITICAL_FINDINGS`];
/// the value is in the logged audit trail.
pub struct AuditScanner {
    address: ResourceId,
    findings: RwLock<Vec<AuditFinding>>,
    ctx: LedgerContext,
}

impl AuditScanner {
    pub fn new(address: ResourceId, ctx: LedgerContext) -> Self {
        Self {
            address,
            findings: RwLock::new(Vec::new()),
            ctx,
        }
    }

    pub fn address(&self) -> &ResourceId {
        &self.address
    }

    pub fn scan_contract(&self, contract: &ResourceId) -> Result<AuditFinding, LedgerError> {
        self.ctx.pauses.ensure_active(&self.address)?;

        let finding = AuditFinding {
            contract: contract.clone(),
            result: NO_CRITICAL_FINDINGS.to_string(),
            scanned_at: chrono::Utc::now().timestamp_millis(),
        };
        self.findings.write().push(finding.clone());

        info!(contract = %contract, result = %finding.result, "Audit logged");
        self.ctx.events.record(
            &self.address,
            LedgerEvent::AuditLogged {
                contract: contract.clone(),
                result: finding.result.clone(),
            },
        );
        Ok(finding)
    }

    /// Findings for one contract, oldest first
    pub fn findings_for(&self, contract: &ResourceId) -> Vec<AuditFinding> {
        self.findings
            .read()
            .iter()
            .filter(|f| &f.contract == contract)
            .cloned()
            .collect()
    }
}
