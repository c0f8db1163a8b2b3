//! Governance configuration

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use salapi_common::{AccessPolicy, GovernanceError, PrincipalId, DEFAULT_QUORUM};
use serde::{Deserialize, Serialize};

/// Default capacity of the trigger notification channel
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Largest accepted trigger channel capacity
pub const MAX_EVENT_BUFFER: usize = 1 << 16;

/// Default limit on concurrently open per-action rounds
pub const DEFAULT_MAX_OPEN_ROUNDS: usize = 1024;

/// How repeated approvals from one approver within a round are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePolicy {
    /// Every approval counts, including repeats from the same approver
    #[default]
    Cumulative,
    /// Only the first approval from each approver counts in a round
    Distinct,
}

impl FromStr for VotePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cumulative" => Ok(VotePolicy::Cumulative),
            "distinct" => Ok(VotePolicy::Distinct),
            other => Err(anyhow!("unknown vote policy: {other}")),
        }
    }
}

impl fmt::Display for VotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VotePolicy::Cumulative => write!(f, "cumulative"),
            VotePolicy::Distinct => write!(f, "distinct"),
        }
    }
}

/// How approval rounds are keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundScope {
    /// One round for the whole gate; the quorum-completing approval names the action
    #[default]
    Shared,
    /// An independent round per distinct action
    PerAction,
}

impl FromStr for RoundScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(RoundScope::Shared),
            "per_action" | "per-action" => Ok(RoundScope::PerAction),
            other => Err(anyhow!("unknown round scope: {other}")),
        }
    }
}

impl fmt::Display for RoundScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundScope::Shared => write!(f, "shared"),
            RoundScope::PerAction => write!(f, "per_action"),
        }
    }
}

/// Approval gate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Approvals required to fire the gated action
    pub quorum: u32,
    /// Who may register approvers
    pub registration: AccessPolicy,
    /// Counting of repeated approvals
    pub vote_policy: VotePolicy,
    /// Keying of approval rounds
    pub round_scope: RoundScope,
    /// Capacity of the trigger notification channel
    pub event_buffer: usize,
    /// Open rounds allowed at once; only reachable under [`RoundScope::PerAction`]
    pub max_open_rounds: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            quorum: DEFAULT_QUORUM,
            registration: AccessPolicy::Open,
            vote_policy: VotePolicy::default(),
            round_scope: RoundScope::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            max_open_rounds: DEFAULT_MAX_OPEN_ROUNDS,
        }
    }
}

impl GovernanceConfig {
    /// Configuration with the given quorum and defaults elsewhere
    pub fn with_quorum(quorum: u32) -> Self {
        Self {
            quorum,
            ..Self::default()
        }
    }

    /// Load configuration from `.env` and `SALAPI_*` environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(val) = lookup("SALAPI_QUORUM") {
            cfg.quorum = val
                .trim()
                .parse()
                .with_context(|| format!("invalid SALAPI_QUORUM: {val}"))?;
        }

        let admins = match lookup("SALAPI_ADMINS") {
            Some(list) => parse_admins(&list)?,
            None => BTreeSet::new(),
        };

        if let Some(mode) = lookup("SALAPI_REGISTRATION") {
            cfg.registration = match mode.trim().to_ascii_lowercase().as_str() {
                "open" => AccessPolicy::Open,
                "admin" | "admin_gated" => AccessPolicy::AdminGated { admins },
                other => bail!("unknown registration mode: {other}"),
            };
        } else if !admins.is_empty() {
            cfg.registration = AccessPolicy::AdminGated { admins };
        }

        if let Some(val) = lookup("SALAPI_VOTE_POLICY") {
            cfg.vote_policy = val.parse()?;
        }
        if let Some(val) = lookup("SALAPI_ROUND_SCOPE") {
            cfg.round_scope = val.parse()?;
        }
        if let Some(val) = lookup("SALAPI_EVENT_BUFFER") {
            cfg.event_buffer = val
                .trim()
                .parse()
                .with_context(|| format!("invalid SALAPI_EVENT_BUFFER: {val}"))?;
        }
        if let Some(val) = lookup("SALAPI_MAX_OPEN_ROUNDS") {
            cfg.max_open_rounds = val
                .trim()
                .parse()
                .with_context(|| format!("invalid SALAPI_MAX_OPEN_ROUNDS: {val}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a file, with `SALAPI__*` environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("SALAPI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading {}", path.display()))?;

        let cfg: Self = settings
            .try_deserialize()
            .with_context(|| format!("parsing {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the gate cannot run with
    pub fn validate(&self) -> std::result::Result<(), GovernanceError> {
        if self.quorum == 0 {
            return Err(GovernanceError::InvalidQuorum {
                quorum: self.quorum,
            });
        }
        if self.event_buffer == 0 || self.event_buffer > MAX_EVENT_BUFFER {
            return Err(GovernanceError::InvalidEventBuffer {
                capacity: self.event_buffer,
                max: MAX_EVENT_BUFFER,
            });
        }
        if self.max_open_rounds == 0 {
            return Err(GovernanceError::InvalidRoundLimit {
                limit: self.max_open_rounds,
            });
        }
        if let AccessPolicy::AdminGated { admins } = &self.registration {
            if admins.is_empty() {
                return Err(GovernanceError::NoAdmins);
            }
        }
        Ok(())
    }
}

fn parse_admins(list: &str) -> Result<BTreeSet<PrincipalId>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PrincipalId::new(s).with_context(|| format!("invalid admin id: {s:?}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = GovernanceConfig::default();
        assert_eq!(cfg.quorum, 3);
        assert!(cfg.registration.is_open());
        assert_eq!(cfg.vote_policy, VotePolicy::Cumulative);
        assert_eq!(cfg.round_scope, RoundScope::Shared);
    }

    #[test]
    fn test_from_lookup() {
        let cfg = GovernanceConfig::from_lookup(lookup(&[
            ("SALAPI_QUORUM", "5"),
            ("SALAPI_REGISTRATION", "admin"),
            ("SALAPI_ADMINS", "0xa, 0xb,,"),
            ("SALAPI_VOTE_POLICY", "Distinct"),
            ("SALAPI_ROUND_SCOPE", "per-action"),
        ]))
        .unwrap();

        assert_eq!(cfg.quorum, 5);
        assert_eq!(cfg.vote_policy, VotePolicy::Distinct);
        assert_eq!(cfg.round_scope, RoundScope::PerAction);
        assert!(cfg.registration.permits(&PrincipalId::new("0xb").unwrap()));
        assert!(!cfg.registration.permits(&PrincipalId::new("0xc").unwrap()));
    }

    #[test]
    fn test_admins_imply_admin_gating() {
        let cfg = GovernanceConfig::from_lookup(lookup(&[("SALAPI_ADMINS", "0xa")])).unwrap();
        assert!(!cfg.registration.is_open());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(GovernanceConfig::from_lookup(lookup(&[("SALAPI_QUORUM", "0")])).is_err());
        assert!(GovernanceConfig::from_lookup(lookup(&[("SALAPI_QUORUM", "three")])).is_err());
        assert!(
            GovernanceConfig::from_lookup(lookup(&[("SALAPI_VOTE_POLICY", "weighted")])).is_err()
        );
        assert!(
            GovernanceConfig::from_lookup(lookup(&[("SALAPI_REGISTRATION", "closed")])).is_err()
        );
        assert!(
            GovernanceConfig::from_lookup(lookup(&[("SALAPI_MAX_OPEN_ROUNDS", "0")])).is_err()
        );
    }

    #[test]
    fn test_event_buffer_bounds() {
        let huge = usize::MAX.to_string();
        for capacity in ["0", "65537", huge.as_str()] {
            assert!(
                GovernanceConfig::from_lookup(lookup(&[("SALAPI_EVENT_BUFFER", capacity)]))
                    .is_err(),
                "capacity {capacity} accepted"
            );
        }

        let cfg =
            GovernanceConfig::from_lookup(lookup(&[("SALAPI_EVENT_BUFFER", "65536")])).unwrap();
        assert_eq!(cfg.event_buffer, MAX_EVENT_BUFFER);

        let oversized = GovernanceConfig {
            event_buffer: usize::MAX,
            ..GovernanceConfig::default()
        };
        assert_eq!(
            oversized.validate(),
            Err(GovernanceError::InvalidEventBuffer {
                capacity: usize::MAX,
                max: MAX_EVENT_BUFFER,
            })
        );
    }

    #[test]
    fn test_admin_gating_requires_admins() {
        let err = GovernanceConfig::from_lookup(lookup(&[("SALAPI_REGISTRATION", "admin")]))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<GovernanceError>(),
            Some(&GovernanceError::NoAdmins)
        );

        let cfg = GovernanceConfig {
            registration: AccessPolicy::admin_gated([]),
            ..GovernanceConfig::default()
        };
        assert_eq!(cfg.validate(), Err(GovernanceError::NoAdmins));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "salapi-governance-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{
                "quorum": 4,
                "vote_policy": "distinct",
                "registration": { "mode": "admin_gated", "admins": ["0xadmin"] }
            }"#,
        )
        .unwrap();

        let cfg = GovernanceConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.quorum, 4);
        assert_eq!(cfg.vote_policy, VotePolicy::Distinct);
        assert_eq!(cfg.round_scope, RoundScope::Shared);
        assert_eq!(cfg.event_buffer, DEFAULT_EVENT_BUFFER);
        assert!(cfg.registration.permits(&PrincipalId::new("0xadmin").unwrap()));
    }
}
