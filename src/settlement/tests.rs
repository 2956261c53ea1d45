use num_bigint::BigUint;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::*;
use crate::error::ErrorKind;
use crate::host::StaticDirectory;
use crate::rules::PointsRule;

const DAPP: &str = "dapp";
const OFFICIAL: &str = "official.com";
const CONTRACT: &str = "contract";
const USER_POINTS: u64 = 6_180_000;
const KOL_SHARE: u64 = 988_800;
const INVITER_SHARE: u64 = 494_400;
const BRIDGE_SHARE: u64 = 158_208;

fn rule(action: &str, point: &str) -> PointsRule {
    PointsRule {
        action_name: action.into(),
        point_name: point.into(),
        user_points: USER_POINTS,
        kol_points_percent: 1_600,
        inviter_points_percent: 800,
        enable_proportional_calculation: true,
    }
}

fn dapp_info() -> DappInfo {
    DappInfo {
        official_domain: OFFICIAL.into(),
        admin: "admin".into(),
        contract_address: CONTRACT.into(),
        points_rules: vec![
            rule(JOIN_ACTION, "points"),
            rule(ACCEPT_REFERRAL_ACTION, "points"),
            rule("Trade", "settle-points"),
        ],
        self_increasing_rule: Some(rule("SelfIncrease", "self-points")),
    }
}

fn directory() -> StaticDirectory {
    StaticDirectory::new(2)
        .with_dapp(DAPP.into(), dapp_info())
        .reserve(&["reserved.com"])
}

struct Harness {
    directory: StaticDirectory,
    config: EngineConfig,
    state: PointsState,
}

impl Harness {
    fn new() -> Self {
        Self::with_directory(directory())
    }

    fn with_directory(directory: StaticDirectory) -> Self {
        Self {
            directory,
            config: EngineConfig::default(),
            state: PointsState::new(),
        }
    }

    fn engine(&self) -> SettlementEngine<'_, StaticDirectory> {
        SettlementEngine::new(&self.directory, &self.config)
    }

    fn run(&mut self, sender: &str, now: Timestamp, op: Operation) -> Result<Vec<EngineEvent>, EngineError> {
        let engine = SettlementEngine::new(&self.directory, &self.config);
        engine.apply(&mut self.state, &CallContext::new(sender, now), &op)
    }

    fn join(&mut self, now: Timestamp, registrant: &str, domain: &str) -> Vec<EngineEvent> {
        self.run(
            CONTRACT,
            now,
            Operation::Join(JoinInput {
                dapp_id: DAPP.into(),
                registrant: registrant.into(),
                domain: domain.into(),
            }),
        )
        .unwrap()
    }

    fn claim(&mut self, now: Timestamp, sender: &str, invitee: &str, domain: &str) -> Vec<EngineEvent> {
        self.run(
            sender,
            now,
            Operation::ApplyToBeAdvocate(ApplyToBeAdvocateInput {
                dapp_id: DAPP.into(),
                invitee: invitee.into(),
                inviter: None,
                domain: domain.into(),
            }),
        )
        .unwrap()
    }

    fn refer(&mut self, now: Timestamp, referrer: &str, invitee: &str) -> Result<Vec<EngineEvent>, EngineError> {
        self.run(
            CONTRACT,
            now,
            Operation::AcceptReferral(AcceptReferralInput {
                dapp_id: DAPP.into(),
                referrer: referrer.into(),
                invitee: invitee.into(),
            }),
        )
    }

    fn settle(&mut self, now: Timestamp, user: &str, points: u64) -> Vec<EngineEvent> {
        self.run(
            CONTRACT,
            now,
            Operation::Settle(SettleInput {
                dapp_id: DAPP.into(),
                action_name: "Trade".into(),
                entry: SettleEntry {
                    user: user.into(),
                    points: BigUint::from(points),
                },
            }),
        )
        .unwrap()
    }

    fn balance(&self, address: &str, domain: &str, source: IncomeSourceType, point: &str) -> BigUint {
        self.state
            .points_balance(&address.into(), domain, source, point)
    }
}

fn details(events: &[EngineEvent]) -> Vec<&PointsChangeDetail> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::PointsChanged { details } => Some(details),
            _ => None,
        })
        .flatten()
        .collect()
}

#[test]
fn join_credits_the_user_and_emits_points_before_joined() {
    let mut h = Harness::new();
    let events = h.join(0, "bob", OFFICIAL);

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], EngineEvent::PointsChanged { .. }));
    assert_eq!(
        events[1],
        EngineEvent::Joined {
            dapp_id: DAPP.into(),
            domain: OFFICIAL.into(),
            registrant: "bob".into(),
        }
    );
    let credited = details(&events);
    assert_eq!(credited.len(), 3);
    assert_eq!(credited[0].action_name, JOIN_ACTION);
    assert_eq!(credited[0].increase_value, BigUint::from(USER_POINTS));
    // first touch of both accrual families is reported with nothing earned
    assert!(credited[1..]
        .iter()
        .all(|detail| detail.point_name == "self-points" && detail.increase_value.is_zero()));
    assert_eq!(h.state.registration(&DAPP.into(), &"bob".into()), Some(OFFICIAL));
}

#[test]
fn second_registration_is_rejected_without_side_effects() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    let before = h.state.clone();

    let err = h
        .run(
            CONTRACT,
            3,
            Operation::Join(JoinInput {
                dapp_id: DAPP.into(),
                registrant: "bob".into(),
                domain: OFFICIAL.into(),
            }),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRegistered { .. }));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(h.state, before);
}

#[test]
fn joining_requires_a_known_domain() {
    let mut h = Harness::new();
    let join = |domain: &str| {
        Operation::Join(JoinInput {
            dapp_id: DAPP.into(),
            registrant: "bob".into(),
            domain: domain.into(),
        })
    };

    let err = h.run(CONTRACT, 0, join("nowhere.com")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = h.run(CONTRACT, 0, join("")).unwrap_err();
    assert!(matches!(err, EngineError::InvalidDomain { .. }));
    assert_eq!(h.state, PointsState::new());
}

#[test]
fn only_the_dapp_contract_may_register_users() {
    let mut h = Harness::new();
    let err = h
        .run(
            "mallory",
            0,
            Operation::Join(JoinInput {
                dapp_id: DAPP.into(),
                registrant: "bob".into(),
                domain: OFFICIAL.into(),
            }),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    let err = h
        .run(
            CONTRACT,
            0,
            Operation::Join(JoinInput {
                dapp_id: "ghost".into(),
                registrant: "bob".into(),
                domain: OFFICIAL.into(),
            }),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownDapp { .. }));
}

#[test]
fn repeated_settlement_at_one_instant_accrues_nothing() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    let events = h.settle(0, "bob", 1_000);

    let accrued: Vec<_> = details(&events)
        .into_iter()
        .filter(|detail| detail.point_name == "self-points")
        .collect();
    assert_eq!(accrued.len(), 2);
    assert!(accrued.iter().all(|detail| detail.increase_value.is_zero()));
    assert!(h
        .balance("bob", OFFICIAL, IncomeSourceType::User, "self-points")
        .is_zero());
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "settle-points"),
        BigUint::from(1_000u32)
    );
}

#[test]
fn accrual_is_paid_once_per_elapsed_interval() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    h.settle(5, "bob", 1);
    h.settle(5, "bob", 1);
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(USER_POINTS * 5)
    );
    h.settle(7, "bob", 1);
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(USER_POINTS * 7)
    );
}

#[test]
fn referral_pays_the_referrer_and_grows_its_accrual() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    let events = h.refer(0, "bob", "carol").unwrap();

    assert_eq!(
        events.last(),
        Some(&EngineEvent::ReferralAccepted {
            dapp_id: DAPP.into(),
            domain: OFFICIAL.into(),
            referrer: "bob".into(),
            invitee: "carol".into(),
            inviter: None,
        })
    );
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "points"),
        BigUint::from(USER_POINTS + KOL_SHARE)
    );
    assert_eq!(
        h.balance("carol", OFFICIAL, IncomeSourceType::User, "points"),
        BigUint::from(USER_POINTS)
    );
    assert_eq!(h.state.follower_counts(&DAPP.into(), &"bob".into()).follower_count, 1);

    h.settle(5, "bob", 1);
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(35_844_000u64)
    );
}

#[test]
fn second_level_referral_pays_the_inviter() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    h.refer(0, "bob", "carol").unwrap();
    h.refer(0, "carol", "dave").unwrap();

    let relation = h
        .state
        .referral_relation(&DAPP.into(), &"dave".into())
        .unwrap();
    assert_eq!(relation.referrer, "carol".into());
    assert_eq!(relation.inviter, Some("bob".into()));
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "points"),
        BigUint::from(USER_POINTS + KOL_SHARE + INVITER_SHARE)
    );
    assert_eq!(
        h.state.follower_counts(&DAPP.into(), &"bob".into()),
        crate::referral::FollowerCounts {
            follower_count: 1,
            sub_follower_count: 1,
        }
    );

    h.settle(5, "bob", 1);
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(USER_POINTS * 5 + (KOL_SHARE + INVITER_SHARE) * 5)
    );
}

#[test]
fn referrals_through_an_advocate_domain_reach_its_kol() {
    let mut h = Harness::new();
    let claimed = h.claim(0, "kol", "kol", "user.com");
    assert_eq!(
        claimed,
        vec![EngineEvent::InviterApplied {
            dapp_id: DAPP.into(),
            domain: "user.com".into(),
            invitee: "kol".into(),
            inviter: "kol".into(),
        }]
    );
    assert_eq!(
        h.state.domain_relationship("user.com").unwrap().inviter,
        None
    );

    h.join(0, "bob", "user.com");
    assert_eq!(h.state.invitation_count(&DAPP.into(), &"kol".into(), "user.com"), 1);
    h.refer(0, "bob", "carol").unwrap();
    assert_eq!(h.state.kol_sub_follower_count(&DAPP.into(), &"kol".into()), 1);
    assert_eq!(
        h.balance("kol", "user.com", IncomeSourceType::Kol, "points"),
        BigUint::from(KOL_SHARE + BRIDGE_SHARE)
    );

    h.settle(5, "carol", USER_POINTS);
    assert_eq!(
        h.balance("carol", OFFICIAL, IncomeSourceType::User, "settle-points"),
        BigUint::from(USER_POINTS)
    );
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "settle-points"),
        BigUint::from(KOL_SHARE)
    );
    assert_eq!(
        h.balance("kol", "user.com", IncomeSourceType::Kol, "settle-points"),
        BigUint::from(BRIDGE_SHARE)
    );
    assert_eq!(
        h.balance("kol", "user.com", IncomeSourceType::Kol, "self-points"),
        BigUint::from(KOL_SHARE * 5 + BRIDGE_SHARE * 5)
    );
    assert_eq!(
        h.balance("bob", "user.com", IncomeSourceType::User, "self-points"),
        BigUint::from(USER_POINTS * 5)
    );
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(KOL_SHARE * 5)
    );
    assert_eq!(
        h.balance("carol", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(USER_POINTS * 5)
    );
}

#[test]
fn kol_joining_its_own_domain_is_not_paid_as_kol() {
    let mut h = Harness::new();
    h.claim(0, "kol", "kol", "user.com");
    let events = h.join(0, "kol", "user.com");

    assert!(details(&events)
        .iter()
        .filter(|detail| detail.income_source_type != IncomeSourceType::User)
        .all(|detail| detail.increase_value.is_zero()));
    assert!(h
        .balance("kol", "user.com", IncomeSourceType::Kol, "points")
        .is_zero());

    h.refer(0, "kol", "carol").unwrap();
    assert_eq!(
        h.balance("kol", "user.com", IncomeSourceType::Kol, "points"),
        BigUint::from(BRIDGE_SHARE)
    );
    assert_eq!(
        h.balance("kol", OFFICIAL, IncomeSourceType::User, "points"),
        BigUint::from(KOL_SHARE)
    );
}

#[test]
fn a_domain_kol_cannot_be_referred_through_its_own_domain() {
    let mut h = Harness::new();
    h.claim(0, "kol", "kol", "user.com");
    h.join(0, "bob", "user.com");
    let before = h.state.clone();

    let err = h.refer(1, "bob", "kol").unwrap_err();
    assert_eq!(err, EngineError::ReferKol { kol: "kol".into() });
    assert_eq!(h.state, before);
}

#[test]
fn referrer_must_have_joined() {
    let mut h = Harness::new();
    let err = h.refer(0, "bob", "carol").unwrap_err();
    assert!(matches!(err, EngineError::NotRegistered { role: "referrer", .. }));
    assert_eq!(h.state, PointsState::new());
}

#[test]
fn reserved_domains_cannot_be_claimed() {
    let mut h = Harness::new();
    let before = h.state.clone();
    let err = h
        .run(
            "scout",
            0,
            Operation::ApplyToBeAdvocate(ApplyToBeAdvocateInput {
                dapp_id: DAPP.into(),
                invitee: "kol".into(),
                inviter: None,
                domain: "reserved.com".into(),
            }),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::ReservedDomain { .. }));
    assert_eq!(h.state, before);

    let err = h
        .run(
            "scout",
            0,
            Operation::ApplyToBeAdvocate(ApplyToBeAdvocateInput {
                dapp_id: DAPP.into(),
                invitee: "kol".into(),
                inviter: None,
                domain: OFFICIAL.into(),
            }),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::DomainClaimed { .. }));
}

#[test]
fn advocate_rule_pays_kol_and_inviter_up_to_the_apply_limit() {
    let mut info = dapp_info();
    info.points_rules.push(PointsRule {
        action_name: APPLY_TO_BE_ADVOCATE_ACTION.into(),
        point_name: "points".into(),
        user_points: 0,
        kol_points_percent: 500,
        inviter_points_percent: 200,
        enable_proportional_calculation: false,
    });
    let mut h = Harness::with_directory(StaticDirectory::new(2).with_dapp(DAPP.into(), info));

    let events = h.claim(0, "scout", "kol", "kol.com");
    assert_eq!(details(&events).len(), 2);
    assert_eq!(
        h.balance("kol", "kol.com", IncomeSourceType::Kol, "points"),
        BigUint::from(500u32)
    );
    assert_eq!(
        h.balance("scout", "kol.com", IncomeSourceType::Inviter, "points"),
        BigUint::from(200u32)
    );

    h.claim(1, "scout", "kol2", "kol2.com");
    assert_eq!(h.state.apply_count(&"scout".into(), &DAPP.into()), 2);
    let before = h.state.clone();
    let err = h
        .run(
            "scout",
            2,
            Operation::ApplyToBeAdvocate(ApplyToBeAdvocateInput {
                dapp_id: DAPP.into(),
                invitee: "kol3".into(),
                inviter: None,
                domain: "kol3.com".into(),
            }),
        )
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ApplyLimitReached {
            inviter: "scout".into(),
            limit: 2,
        }
    );
    assert_eq!(h.state, before);
}

#[test]
fn domain_inviter_accrues_per_joined_user() {
    let mut h = Harness::new();
    h.claim(0, "scout", "kol", "kol.com");
    h.join(0, "bob", "kol.com");
    assert_eq!(
        h.state
            .domains
            .tier_two_invitation_count(&DAPP.into(), &"scout".into(), "kol.com"),
        1
    );
    assert_eq!(
        h.balance("scout", "kol.com", IncomeSourceType::Inviter, "points"),
        BigUint::from(INVITER_SHARE)
    );

    h.settle(4, "bob", 1);
    assert_eq!(
        h.balance("scout", "kol.com", IncomeSourceType::Inviter, "self-points"),
        BigUint::from(INVITER_SHARE * 4)
    );
    assert_eq!(
        h.balance("kol", "kol.com", IncomeSourceType::Kol, "self-points"),
        BigUint::from(KOL_SHARE * 4)
    );
}

#[test]
fn batch_is_validated_before_any_entry_settles() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    h.refer(0, "bob", "carol").unwrap();
    let before = h.state.clone();
    let batch = |users: &[&str]| {
        Operation::BatchSettle(BatchSettleInput {
            dapp_id: DAPP.into(),
            action_name: "Trade".into(),
            entries: users
                .iter()
                .map(|user| SettleEntry {
                    user: (*user).into(),
                    points: BigUint::from(10u32),
                })
                .collect(),
        })
    };

    let err = h.run(CONTRACT, 1, batch(&["bob", "ghost"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.state, before);

    let err = h.run(CONTRACT, 1, batch(&[])).unwrap_err();
    assert_eq!(err, EngineError::InvalidSettleList { len: 0, max: 20 });
    let too_many = vec!["bob"; 21];
    let err = h.run(CONTRACT, 1, batch(&too_many)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidSettleList { len: 21, .. }));
    assert_eq!(h.state, before);

    let events = h.run(CONTRACT, 1, batch(&["bob", "carol"])).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(
        h.balance("carol", OFFICIAL, IncomeSourceType::User, "settle-points"),
        BigUint::from(10u32)
    );
}

#[test]
fn settle_rejects_zero_points_and_blank_actions() {
    let mut h = Harness::new();
    h.join(0, "bob", OFFICIAL);
    let settle = |action: &str, points: u64| {
        Operation::Settle(SettleInput {
            dapp_id: DAPP.into(),
            action_name: action.into(),
            entry: SettleEntry {
                user: "bob".into(),
                points: BigUint::from(points),
            },
        })
    };

    assert_eq!(
        h.run(CONTRACT, 1, settle("Trade", 0)).unwrap_err(),
        EngineError::InvalidPointsValue
    );
    assert_eq!(
        h.run(CONTRACT, 1, settle(" ", 5)).unwrap_err(),
        EngineError::InvalidActionName
    );
    assert_eq!(h.state.clock, Some(0));
}

#[test]
fn calls_cannot_move_the_clock_backwards() {
    let mut h = Harness::new();
    h.join(10, "bob", OFFICIAL);
    let err = h
        .run(
            CONTRACT,
            5,
            Operation::Join(JoinInput {
                dapp_id: DAPP.into(),
                registrant: "carol".into(),
                domain: OFFICIAL.into(),
            }),
        )
        .unwrap_err();
    assert_eq!(err, EngineError::ClockRegression { now: 5, last: 10 });
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn replays_reach_the_same_state_root() {
    let replay = || {
        let mut h = Harness::new();
        h.claim(0, "kol", "kol", "user.com");
        h.join(1, "bob", "user.com");
        h.refer(2, "bob", "carol").unwrap();
        h.settle(9, "carol", 77);
        h.state.state_root_hex()
    };
    assert_eq!(replay(), replay());
}

#[test]
fn accrual_does_not_depend_on_how_often_it_is_settled() {
    let setup = || {
        let mut h = Harness::new();
        h.join(0, "bob", OFFICIAL);
        h.refer(0, "bob", "carol").unwrap();
        h.refer(0, "carol", "dave").unwrap();
        h
    };
    let mut rng = StdRng::seed_from_u64(7);
    let mut often = setup();
    let mut now = 0;
    for _ in 0..12 {
        now += rng.gen_range(0..50);
        often.settle(now, "bob", 1);
    }
    let mut once = setup();
    once.settle(now, "bob", 1);

    let self_points = |h: &Harness| h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points");
    assert_eq!(self_points(&often), self_points(&once));
    assert_eq!(
        self_points(&once),
        BigUint::from((USER_POINTS + KOL_SHARE + INVITER_SHARE) * now)
    );
}

#[test]
fn operations_and_events_use_tagged_json() {
    let op: Operation = serde_json::from_str(
        r#"{"op":"settle","dapp_id":"dapp","action_name":"Trade","user":"bob","points":"12"}"#,
    )
    .unwrap();
    assert_eq!(
        op,
        Operation::Settle(SettleInput {
            dapp_id: DAPP.into(),
            action_name: "Trade".into(),
            entry: SettleEntry {
                user: "bob".into(),
                points: BigUint::from(12u32),
            },
        })
    );

    let h = Harness::new();
    assert!(h.engine().directory.dapp(&DAPP.into()).is_some());
    let event = serde_json::to_value(EngineEvent::Joined {
        dapp_id: DAPP.into(),
        domain: OFFICIAL.into(),
        registrant: "bob".into(),
    })
    .unwrap();
    assert_eq!(event["type"], "joined");
}

#[test]
fn accrual_touches_are_reported_even_when_nothing_is_earned() {
    let mut info = dapp_info();
    info.points_rules.clear();
    let mut h = Harness::with_directory(StaticDirectory::new(2).with_dapp(DAPP.into(), info));

    let events = h.join(0, "bob", OFFICIAL);
    assert_eq!(events.len(), 2);
    let touched = details(&events);
    assert_eq!(touched.len(), 2);
    assert!(touched.iter().all(|detail| detail.receiver == Address::from("bob")
        && detail.income_source_type == IncomeSourceType::User
        && detail.action_name == "SelfIncrease"
        && detail.increase_value.is_zero()));

    let events = h.settle(0, "bob", 5);
    assert_eq!(events.len(), 1);
    assert_eq!(details(&events).len(), 2);
    assert_eq!(h.state.ledger, crate::ledger::BalanceLedger::new());
}

#[test]
fn flat_self_increasing_rule_only_flattens_the_domain_family() {
    let mut info = dapp_info();
    if let Some(rule) = info.self_increasing_rule.as_mut() {
        rule.enable_proportional_calculation = false;
    }
    let mut h = Harness::with_directory(StaticDirectory::new(2).with_dapp(DAPP.into(), info));
    h.claim(0, "kol", "kol", "user.com");
    h.join(0, "bob", "user.com");
    h.refer(0, "bob", "carol").unwrap();
    h.settle(5, "carol", USER_POINTS);

    // domain family pays 1600 flat per second per joined user, the referral
    // family stays proportional: 8_000 + 791_040
    assert_eq!(
        h.balance("kol", "user.com", IncomeSourceType::Kol, "self-points"),
        BigUint::from(799_040u64)
    );
    assert_eq!(
        h.balance("bob", OFFICIAL, IncomeSourceType::User, "self-points"),
        BigUint::from(4_944_000u64)
    );
    assert_eq!(
        h.balance("bob", "user.com", IncomeSourceType::User, "self-points"),
        BigUint::from(USER_POINTS * 5)
    );
}

#[test]
fn claims_without_an_advocate_rule_do_not_count_towards_the_limit() {
    let mut h = Harness::new();
    for (at, (invitee, domain)) in [("a", "a.com"), ("b", "b.com"), ("c", "c.com")]
        .into_iter()
        .enumerate()
    {
        h.claim(at as Timestamp, "scout", invitee, domain);
    }
    assert_eq!(h.state.apply_count(&"scout".into(), &DAPP.into()), 0);
    assert_eq!(
        h.state.domain_relationship("c.com").unwrap().inviter,
        Some("scout".into())
    );
}
