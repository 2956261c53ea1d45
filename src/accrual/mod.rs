//! Lazily realised self-increasing points.
//!
//! Nothing ticks in the background. A key only earns when a settlement
//! touches it: the engine multiplies the key's rate by the seconds elapsed
//! since the key's checkpoint, then moves the checkpoint to `now`. A key seen
//! for the first time earns nothing for the time before it was first seen.
//!
//! Two checkpoint families run side by side. The domain family pays users,
//! KOLs and inviters for the advocate hierarchy, weighted by how many users
//! joined through a domain. The referral family pays for the social
//! hierarchy, weighted by follower aggregates.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::domains::DomainGraph;
use crate::ledger::serde_entries;
use crate::referral::ReferralGraph;
use crate::rules::{proportion, PointsRule};
use crate::types::{Address, DappId, IncomeSourceType, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccrualFamily {
    Domain,
    Referral,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccrualKey {
    pub dapp_id: DappId,
    pub address: Address,
    pub domain: String,
    pub income_source_type: IncomeSourceType,
}

impl AccrualKey {
    pub fn new(
        dapp_id: &DappId,
        address: &Address,
        domain: &str,
        income_source_type: IncomeSourceType,
    ) -> Self {
        Self {
            dapp_id: dapp_id.clone(),
            address: address.clone(),
            domain: domain.to_string(),
            income_source_type,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccrualCheckpoints {
    #[serde(with = "serde_entries")]
    domain: BTreeMap<AccrualKey, Timestamp>,
    #[serde(with = "serde_entries")]
    referral: BTreeMap<AccrualKey, Timestamp>,
}

impl AccrualCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    fn family(&self, family: AccrualFamily) -> &BTreeMap<AccrualKey, Timestamp> {
        match family {
            AccrualFamily::Domain => &self.domain,
            AccrualFamily::Referral => &self.referral,
        }
    }

    pub fn get(&self, family: AccrualFamily, key: &AccrualKey) -> Option<Timestamp> {
        self.family(family).get(key).copied()
    }

    /// Moves the checkpoint to `now` and returns the previous one.
    pub fn advance(
        &mut self,
        family: AccrualFamily,
        key: &AccrualKey,
        now: Timestamp,
    ) -> Option<Timestamp> {
        let map = match family {
            AccrualFamily::Domain => &mut self.domain,
            AccrualFamily::Referral => &mut self.referral,
        };
        map.insert(key.clone(), now)
    }

    pub(crate) fn leaves(&self) -> impl Iterator<Item = (&'static [u8], &AccrualKey, Timestamp)> {
        let domain = self
            .domain
            .iter()
            .map(|(key, at)| (b"domain-checkpoint".as_slice(), key, *at));
        let referral = self
            .referral
            .iter()
            .map(|(key, at)| (b"referral-checkpoint".as_slice(), key, *at));
        domain.chain(referral)
    }
}

/// Computes accrual for one settlement. `now` is fixed for the engine's
/// lifetime so every key in a settlement sees the same instant.
pub struct AccrualEngine<'a> {
    rule: &'a PointsRule,
    domains: &'a DomainGraph,
    referrals: &'a ReferralGraph,
    now: Timestamp,
}

impl<'a> AccrualEngine<'a> {
    pub fn new(
        rule: &'a PointsRule,
        domains: &'a DomainGraph,
        referrals: &'a ReferralGraph,
        now: Timestamp,
    ) -> Self {
        Self {
            rule,
            domains,
            referrals,
            now,
        }
    }

    pub fn rule(&self) -> &'a PointsRule {
        self.rule
    }

    /// Realises whatever `key` earned since its checkpoint and advances the
    /// checkpoint, even when nothing was earned.
    pub fn realize(
        &self,
        checkpoints: &mut AccrualCheckpoints,
        family: AccrualFamily,
        key: &AccrualKey,
    ) -> BigUint {
        let waiting = match checkpoints.get(family, key) {
            Some(last) => {
                let elapsed = self.now.saturating_sub(last);
                match family {
                    AccrualFamily::Domain => self.domain_waiting(key, elapsed),
                    AccrualFamily::Referral => self.referral_waiting(key, elapsed),
                }
            }
            None => BigUint::zero(),
        };
        checkpoints.advance(family, key, self.now);
        waiting
    }

    /// Domain family: users earn the flat rate, KOLs and inviters earn their
    /// share per user joined through the domain.
    pub fn domain_waiting(&self, key: &AccrualKey, elapsed: u64) -> BigUint {
        let elapsed = BigUint::from(elapsed);
        match key.income_source_type {
            IncomeSourceType::User => BigUint::from(self.rule.user_points) * elapsed,
            IncomeSourceType::Kol => {
                let count =
                    self.domains
                        .invitation_count(&key.dapp_id, &key.address, &key.domain);
                self.rule.kol_points(None) * elapsed * BigUint::from(count)
            }
            IncomeSourceType::Inviter => {
                let count = self.domains.tier_two_invitation_count(
                    &key.dapp_id,
                    &key.address,
                    &key.domain,
                );
                self.rule.inviter_points(None) * elapsed * BigUint::from(count)
            }
        }
    }

    /// Referral family: followers pay the KOL share, sub-followers the
    /// inviter share. A domain's KOL settling as KOL is paid on the referral
    /// chains passing through its domain, reduced by the KOL percent twice.
    pub fn referral_waiting(&self, key: &AccrualKey, elapsed: u64) -> BigUint {
        let user_points = BigUint::from(self.rule.user_points);
        let is_domain_kol = key.income_source_type == IncomeSourceType::Kol
            && self
                .domains
                .relationship(&key.domain)
                .is_some_and(|relationship| relationship.invitee == key.address);

        if is_domain_kol {
            let sub_followers = self
                .referrals
                .kol_sub_follower_count(&key.dapp_id, &key.address);
            let earned = per_follower(
                &user_points,
                self.rule.kol_points_percent,
                sub_followers,
                elapsed,
            );
            return proportion(&earned, self.rule.kol_points_percent);
        }

        let Some(counts) = self.referrals.follower_counts(&key.dapp_id, &key.address) else {
            return BigUint::zero();
        };
        per_follower(
            &user_points,
            self.rule.kol_points_percent,
            counts.follower_count,
            elapsed,
        ) + per_follower(
            &user_points,
            self.rule.inviter_points_percent,
            counts.sub_follower_count,
            elapsed,
        )
    }
}

/// `points * percent / 10000 * count * elapsed`, truncating after the division.
fn per_follower(points: &BigUint, percent: u64, count: u64, elapsed: u64) -> BigUint {
    proportion(points, percent) * BigUint::from(count) * BigUint::from(elapsed)
}
