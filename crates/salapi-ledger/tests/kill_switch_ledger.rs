//! Emergency council pausing and resuming ledger components
//!
//! These tests wire a `KillSwitchGovernance` and a `SalapiLedger` to the
//! same pause registry and drive them the way a deployment would.

use salapi_common::{AccessPolicy, GovernanceError, LedgerError, PauseRegistry, PrincipalId};
use salapi_governance::{
    ApprovalOutcome, GatedAction, GovernanceConfig, KillSwitchGovernance, RoundScope, VotePolicy,
};
use salapi_ledger::{LedgerAddresses, LedgerEvent, SalapiLedger};

fn id(s: &str) -> PrincipalId {
    PrincipalId::new(s).unwrap()
}

struct Deployment {
    ledger: SalapiLedger,
    council: KillSwitchGovernance,
}

fn deploy(config: GovernanceConfig) -> Deployment {
    let pauses = PauseRegistry::new();
    let ledger = SalapiLedger::new(
        LedgerAddresses::with_prefix("salapi").unwrap(),
        AccessPolicy::Open,
        pauses.clone(),
    );
    let council = KillSwitchGovernance::new(config, pauses).unwrap();

    let deployer = id("0xdeployer");
    for member in ["0xa", "0xb", "0xc"] {
        council.register_council_member(&deployer, id(member)).unwrap();
    }
    for user in ["0xalice", "0xbob"] {
        ledger.identity().verify_user(&deployer, &id(user)).unwrap();
    }

    Deployment { ledger, council }
}

#[test]
fn test_council_pause_blocks_token() {
    let Deployment { ledger, council } = deploy(GovernanceConfig::default());
    let token = ledger.addresses().token.clone();
    let alice = id("0xalice");
    let bob = id("0xbob");

    let token_id = ledger.token().mint_token(&alice, "rice").unwrap();

    council.approve_pause(&id("0xa"), token.clone()).unwrap();
    council.approve_pause(&id("0xb"), token.clone()).unwrap();
    // Still live with two of three approvals
    ledger.token().transfer_token(&alice, token_id, &bob).unwrap();

    let outcome = council.approve_pause(&id("0xc"), token.clone()).unwrap();
    assert!(outcome.is_triggered());
    assert!(ledger.pauses().is_paused(&token));

    assert_eq!(
        ledger.token().transfer_token(&bob, token_id, &alice),
        Err(LedgerError::Paused {
            resource: token.to_string()
        })
    );
    assert!(matches!(
        ledger.token().mint_token(&alice, "rice"),
        Err(LedgerError::Paused { .. })
    ));

    // Other components keep running
    ledger.validators().register_validator(&alice).unwrap();
}

#[test]
fn test_council_unpause_restores_token() {
    let Deployment { ledger, council } = deploy(GovernanceConfig::default());
    let token = ledger.addresses().token.clone();

    for member in ["0xa", "0xb", "0xc"] {
        council.approve_pause(&id(member), token.clone()).unwrap();
    }
    assert!(ledger.token().mint_token(&id("0xalice"), "rice").is_err());

    for member in ["0xa", "0xb", "0xc"] {
        council.approve_unpause(&id(member), token.clone()).unwrap();
    }
    assert!(!ledger.pauses().is_paused(&token));
    assert_eq!(ledger.token().mint_token(&id("0xalice"), "rice").unwrap(), 1);
}

#[test]
fn test_outsider_cannot_pause() {
    let Deployment { ledger, council } = deploy(GovernanceConfig::default());
    let token = ledger.addresses().token.clone();

    council.approve_pause(&id("0xa"), token.clone()).unwrap();
    let err = council.approve_pause(&id("0xalice"), token.clone()).unwrap_err();
    assert_eq!(
        err,
        GovernanceError::Unauthorized {
            caller: "0xalice".to_string()
        }
    );
    assert_eq!(
        council.pending_approvals(&GatedAction::Pause(token.clone())),
        1
    );
    assert!(!ledger.pauses().is_paused(&token));
}

#[test]
fn test_fresh_round_after_pause() {
    let Deployment { ledger, council } = deploy(GovernanceConfig::default());
    let bounty = ledger.addresses().bounty.clone();

    for member in ["0xa", "0xb", "0xc"] {
        council.approve_pause(&id(member), bounty.clone()).unwrap();
    }

    let fourth = council.approve_pause(&id("0xa"), bounty.clone()).unwrap();
    assert_eq!(fourth, ApprovalOutcome::Pending { approvals: 1, quorum: 3 });
    assert!(ledger.pauses().is_paused(&bounty));
}

#[test]
fn test_distinct_council_needs_three_members() {
    let Deployment { ledger, council } = deploy(GovernanceConfig {
        vote_policy: VotePolicy::Distinct,
        round_scope: RoundScope::PerAction,
        ..GovernanceConfig::default()
    });
    let scanner = ledger.addresses().scanner.clone();

    for _ in 0..5 {
        council.approve_pause(&id("0xa"), scanner.clone()).unwrap();
    }
    assert!(!ledger.pauses().is_paused(&scanner));

    council.approve_pause(&id("0xb"), scanner.clone()).unwrap();
    council.approve_pause(&id("0xc"), scanner.clone()).unwrap();
    assert!(ledger.pauses().is_paused(&scanner));
    assert!(ledger.scanner().scan_contract(&scanner).is_err());
}

#[test]
fn test_admin_gated_council() {
    let admin = id("0xadmin");
    let council = KillSwitchGovernance::new(
        GovernanceConfig {
            registration: AccessPolicy::admin_gated([admin.clone()]),
            ..GovernanceConfig::default()
        },
        PauseRegistry::new(),
    )
    .unwrap();

    let err = council
        .register_council_member(&id("0xmallory"), id("0xmallory"))
        .unwrap_err();
    assert!(matches!(err, GovernanceError::RegistrationDenied { .. }));
    assert!(council.register_council_member(&admin, id("0xa")).unwrap());
    assert!(council.is_council_member(&id("0xa")));
}

#[tokio::test]
async fn test_subscriber_sees_pause_with_ledger_state() {
    let Deployment { ledger, council } = deploy(GovernanceConfig::default());
    let token = ledger.addresses().token.clone();
    let mut rx = council.subscribe();

    for member in ["0xa", "0xb", "0xc"] {
        council.approve_pause(&id(member), token.clone()).unwrap();
    }

    let triggered = rx.recv().await.unwrap();
    assert_eq!(triggered.action, GatedAction::Pause(token.clone()));
    assert_eq!(triggered.round, 1);
    assert!(ledger.pauses().is_paused(triggered.action.target()));
}

#[test]
fn test_event_log_records_ledger_activity() {
    let Deployment { ledger, .. } = deploy(GovernanceConfig::default());
    let alice = id("0xalice");
    let token = ledger.addresses().token.clone();

    ledger.token().mint_token(&alice, "rice").unwrap();
    ledger.contributions().record_contribution(&alice, 10).unwrap();
    ledger.bounty().submit_bug(&alice, &token, "rounding").unwrap();

    let token_events = ledger.events().events_from(&token);
    assert_eq!(token_events.len(), 1);
    assert!(matches!(
        token_events[0].event,
        LedgerEvent::TokenMinted { token_id: 1, .. }
    ));
    assert_eq!(ledger.bounty().rewards_of(&alice), 1_000);
    assert_eq!(ledger.contributions().score_of(&alice), 10);
}
