//! SALAPI Governor
//!
//! Replays a kill-switch scenario file against a fresh council and prints
//! the resulting pause state.
//!
//! ```text
//! salapi-governor scenario.json
//! ```
//!
//! Scenario format:
//!
//! ```json
//! {
//!   "registrar": "0xdeployer",
//!   "council": ["0xa", "0xb", "0xc"],
//!   "steps": [
//!     { "caller": "0xa", "vote": "pause", "target": "0xtoken" }
//!   ]
//! }
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salapi_common::{PauseRegistry, PrincipalId, ResourceId};
use salapi_governance::{
    ApprovalOutcome, GatedAction, GovernanceConfig, KillSwitchGovernance, Triggered,
    GOVERNANCE_VERSION,
};

#[derive(Debug, Deserialize)]
struct Scenario {
    registrar: PrincipalId,
    council: Vec<PrincipalId>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    caller: PrincipalId,
    vote: Vote,
    target: ResourceId,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Vote {
    Pause,
    Unpause,
}

#[derive(Debug, Serialize)]
struct Summary {
    quorum: u32,
    triggers: Vec<Triggered<GatedAction>>,
    rejected: usize,
    paused: Vec<ResourceId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    info!("Starting SALAPI governor v{}", GOVERNANCE_VERSION);

    let config = match std::env::var("SALAPI_CONFIG") {
        Ok(path) => GovernanceConfig::from_file(&path)?,
        Err(_) => GovernanceConfig::load()?,
    };
    info!(
        quorum = config.quorum,
        vote_policy = %config.vote_policy,
        round_scope = %config.round_scope,
        "Loaded configuration"
    );

    let path: PathBuf = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SALAPI_SCENARIO").ok())
        .context("usage: salapi-governor <scenario.json>")?
        .into();
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", path.display()))?;

    let switch = KillSwitchGovernance::new(config, PauseRegistry::new())?;

    let mut rx = switch.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(triggered) => {
                    info!(action = %triggered.action, round = triggered.round, "Council action applied")
                }
                Err(RecvError::Lagged(missed)) => warn!(missed, "Trigger listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    for member in scenario.council {
        switch.register_council_member(&scenario.registrar, member)?;
    }

    let mut triggers = Vec::new();
    let mut rejected = 0;
    for (n, step) in scenario.steps.into_iter().enumerate() {
        let result = match step.vote {
            Vote::Pause => switch.approve_pause(&step.caller, step.target),
            Vote::Unpause => switch.approve_unpause(&step.caller, step.target),
        };
        match result {
            Ok(ApprovalOutcome::Triggered(triggered)) => triggers.push(triggered),
            Ok(outcome) => info!(
                step = n,
                caller = %step.caller,
                approvals = outcome.approvals(),
                "Approval recorded"
            ),
            Err(err) => {
                rejected += 1;
                warn!(step = n, caller = %step.caller, error = %err, "Step rejected");
            }
        }
    }

    let quorum = switch.required_approvals();
    let paused = switch.pause_registry().paused();
    drop(switch);

    listener.await.context("trigger listener failed")?;

    let summary = Summary {
        quorum,
        triggers,
        rejected,
        paused,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
