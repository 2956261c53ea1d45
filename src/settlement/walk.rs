//! The two hierarchies one settlement walks.
//!
//! Under an advocate domain the chain is `inviter -> kol -> user`. Under the
//! official domain it is `inviter -> referrer -> user`. The two meet when the
//! referrer itself joined through an advocate domain, in which case that
//! domain's KOL is paid as well:
//!
//! `inviter -> kol -> referrer (advocate domain) -> user (official domain)`
//!
//! Every lookup is a flat table read; no walk goes deeper than two levels.

use num_bigint::BigUint;
use tracing::debug;

use crate::accrual::{AccrualCheckpoints, AccrualEngine, AccrualFamily, AccrualKey};
use crate::host::DappInfo;
use crate::ledger::{BalanceLedger, ChangeSet};
use crate::rules::{proportion, PointsRule, RuleResolver};
use crate::state::PointsState;
use crate::types::{Address, DappId, IncomeSourceType, Timestamp};

/// Fixed inputs of one settlement.
pub(crate) struct Settlement<'a> {
    pub dapp_id: &'a DappId,
    pub dapp: &'a DappInfo,
    pub now: Timestamp,
}

/// Direct distribution for `action_name` followed by self-increasing
/// settlement. The user must be registered.
pub(crate) fn settle_for_action(
    state: &mut PointsState,
    settlement: &Settlement<'_>,
    user: &Address,
    action_name: &str,
    base: Option<&BigUint>,
) -> ChangeSet {
    let mut changes = ChangeSet::new(settlement.dapp_id.clone());
    match RuleResolver::new(settlement.dapp).resolve(action_name) {
        Some(rule) => distribute(state, settlement, user, rule, base, &mut changes),
        None => debug!(action = action_name, "no points rule, skipping direct distribution"),
    }
    if let Some(rule) = &settlement.dapp.self_increasing_rule {
        settle_self_increasing(state, settlement, user, rule, &mut changes);
    }
    changes
}

fn distribute(
    state: &mut PointsState,
    settlement: &Settlement<'_>,
    user: &Address,
    rule: &PointsRule,
    base: Option<&BigUint>,
    changes: &mut ChangeSet,
) {
    let PointsState {
        registry,
        domains,
        referrals,
        ledger,
        ..
    } = state;
    let Some(domain) = registry.domain_of(settlement.dapp_id, user) else {
        return;
    };
    let shares = rule.shares(base);
    changes.credit(ledger, rule, user, domain, IncomeSourceType::User, shares.user);

    if !settlement.dapp.is_official(domain) {
        if let Some(relationship) = domains.relationship(domain) {
            if relationship.invitee != *user {
                changes.credit(
                    ledger,
                    rule,
                    &relationship.invitee,
                    domain,
                    IncomeSourceType::Kol,
                    shares.kol,
                );
            }
            if let Some(inviter) = &relationship.inviter {
                changes.credit(
                    ledger,
                    rule,
                    inviter,
                    domain,
                    IncomeSourceType::Inviter,
                    shares.inviter,
                );
            }
        }
        return;
    }

    let Some(relation) = referrals.relation(settlement.dapp_id, user) else {
        return;
    };
    changes.credit(
        ledger,
        rule,
        &relation.referrer,
        domain,
        IncomeSourceType::User,
        shares.kol.clone(),
    );
    if let Some(inviter) = &relation.inviter {
        changes.credit(
            ledger,
            rule,
            inviter,
            domain,
            IncomeSourceType::User,
            shares.inviter,
        );
    }

    let Some(referrer_domain) = registry.domain_of(settlement.dapp_id, &relation.referrer) else {
        return;
    };
    if settlement.dapp.is_official(referrer_domain) {
        return;
    }
    if let Some(relationship) = domains.relationship(referrer_domain) {
        changes.credit(
            ledger,
            rule,
            &relationship.invitee,
            referrer_domain,
            IncomeSourceType::Kol,
            proportion(&shares.kol, rule.kol_points_percent),
        );
    }
}

/// Realises accrual for everybody the user's settlement touches, in a fixed
/// order so replays emit identical batches.
fn settle_self_increasing(
    state: &mut PointsState,
    settlement: &Settlement<'_>,
    user: &Address,
    rule: &PointsRule,
    changes: &mut ChangeSet,
) {
    let PointsState {
        registry,
        domains,
        referrals,
        checkpoints,
        ledger,
        ..
    } = state;
    let Some(user_domain) = registry.domain_of(settlement.dapp_id, user) else {
        return;
    };
    let official = settlement.dapp.official_domain.as_str();
    let mut accrual = SelfIncreasing {
        engine: AccrualEngine::new(rule, domains, referrals, settlement.now),
        dapp_id: settlement.dapp_id,
        checkpoints,
        ledger,
        changes,
    };

    accrual.settle(AccrualFamily::Domain, user, user_domain, IncomeSourceType::User);
    if let Some(relationship) = domains.relationship(user_domain) {
        accrual.settle(
            AccrualFamily::Domain,
            &relationship.invitee,
            user_domain,
            IncomeSourceType::Kol,
        );
        if let Some(inviter) = &relationship.inviter {
            accrual.settle(
                AccrualFamily::Domain,
                inviter,
                user_domain,
                IncomeSourceType::Inviter,
            );
        }
    }
    accrual.settle(AccrualFamily::Referral, user, official, IncomeSourceType::User);

    let Some(relation) = referrals.relation(settlement.dapp_id, user) else {
        return;
    };
    for upstream in std::iter::once(&relation.referrer).chain(relation.inviter.as_ref()) {
        if let Some(upstream_domain) = registry.domain_of(settlement.dapp_id, upstream) {
            accrual.settle(
                AccrualFamily::Domain,
                upstream,
                upstream_domain,
                IncomeSourceType::User,
            );
        }
        accrual.settle(AccrualFamily::Referral, upstream, official, IncomeSourceType::User);
    }

    let Some(referrer_domain) = registry.domain_of(settlement.dapp_id, &relation.referrer) else {
        return;
    };
    let Some(relationship) = domains.relationship(referrer_domain) else {
        return;
    };
    let kol = &relationship.invitee;
    if let Some(kol_domain) = registry.domain_of(settlement.dapp_id, kol) {
        accrual.settle(AccrualFamily::Domain, kol, kol_domain, IncomeSourceType::User);
    }
    accrual.settle(
        AccrualFamily::Domain,
        kol,
        referrer_domain,
        IncomeSourceType::Kol,
    );
    accrual.settle(
        AccrualFamily::Referral,
        kol,
        referrer_domain,
        IncomeSourceType::Kol,
    );
}

struct SelfIncreasing<'s> {
    engine: AccrualEngine<'s>,
    dapp_id: &'s DappId,
    checkpoints: &'s mut AccrualCheckpoints,
    ledger: &'s mut BalanceLedger,
    changes: &'s mut ChangeSet,
}

impl SelfIncreasing<'_> {
    fn settle(
        &mut self,
        family: AccrualFamily,
        address: &Address,
        domain: &str,
        income_source_type: IncomeSourceType,
    ) {
        let key = AccrualKey::new(self.dapp_id, address, domain, income_source_type);
        let earned = self.engine.realize(self.checkpoints, family, &key);
        self.changes.credit(
            self.ledger,
            self.engine.rule(),
            address,
            domain,
            income_source_type,
            earned,
        );
    }
}
