use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domains::DomainGraph;
use crate::error::EngineError;
use crate::ledger::serde_entries;
use crate::state::Registry;
use crate::types::{Address, DappId};

/// Social-referral edge. `inviter` is the referrer's own referrer as it was
/// when the edge was created; it is never rewritten afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralRelation {
    pub dapp_id: DappId,
    pub invitee: Address,
    pub referrer: Address,
    pub inviter: Option<Address>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowerCounts {
    pub follower_count: u64,
    pub sub_follower_count: u64,
}

/// A referral that passed every precondition and can be applied as is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralPlan {
    pub dapp_id: DappId,
    pub referrer: Address,
    pub invitee: Address,
    pub inviter: Option<Address>,
    pub referrer_domain: String,
    /// KOL of the referrer's advocate domain, when it has one.
    pub kol: Option<Address>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralGraph {
    #[serde(with = "serde_entries")]
    relations: BTreeMap<(DappId, Address), ReferralRelation>,
    #[serde(with = "serde_entries")]
    followers: BTreeMap<(DappId, Address), FollowerCounts>,
    #[serde(with = "serde_entries")]
    kol_sub_followers: BTreeMap<(DappId, Address), u64>,
}

impl ReferralGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relation(&self, dapp_id: &DappId, invitee: &Address) -> Option<&ReferralRelation> {
        self.relations.get(&(dapp_id.clone(), invitee.clone()))
    }

    pub fn follower_counts(&self, dapp_id: &DappId, address: &Address) -> Option<FollowerCounts> {
        self.followers
            .get(&(dapp_id.clone(), address.clone()))
            .copied()
    }

    pub fn kol_sub_follower_count(&self, dapp_id: &DappId, kol: &Address) -> u64 {
        self.kol_sub_followers
            .get(&(dapp_id.clone(), kol.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Validates a referral without mutating anything.
    pub fn plan_referral(
        &self,
        registry: &Registry,
        domains: &DomainGraph,
        dapp_id: &DappId,
        referrer: &Address,
        invitee: &Address,
    ) -> Result<ReferralPlan, EngineError> {
        if !referrer.is_valid() {
            return Err(EngineError::InvalidAddress { role: "referrer" });
        }
        let referrer_domain = registry.domain_of(dapp_id, referrer).ok_or_else(|| {
            EngineError::NotRegistered {
                role: "referrer",
                dapp_id: dapp_id.clone(),
                address: referrer.clone(),
            }
        })?;
        if !invitee.is_valid() {
            return Err(EngineError::InvalidAddress { role: "invitee" });
        }
        registry.ensure_unregistered(dapp_id, invitee)?;

        let kol = domains
            .relationship(referrer_domain)
            .map(|relationship| relationship.invitee.clone());
        if kol.as_ref() == Some(invitee) {
            return Err(EngineError::ReferKol {
                kol: invitee.clone(),
            });
        }

        Ok(ReferralPlan {
            dapp_id: dapp_id.clone(),
            referrer: referrer.clone(),
            invitee: invitee.clone(),
            inviter: self
                .relation(dapp_id, referrer)
                .map(|relation| relation.referrer.clone()),
            referrer_domain: referrer_domain.to_string(),
            kol,
        })
    }

    /// Stores the edge and gives the invitee an empty follower aggregate.
    pub fn link(&mut self, plan: &ReferralPlan) {
        let key = (plan.dapp_id.clone(), plan.invitee.clone());
        self.relations.insert(
            key.clone(),
            ReferralRelation {
                dapp_id: plan.dapp_id.clone(),
                invitee: plan.invitee.clone(),
                referrer: plan.referrer.clone(),
                inviter: plan.inviter.clone(),
            },
        );
        self.followers.insert(key, FollowerCounts::default());
    }

    /// Bumps the follower aggregates the new edge feeds into.
    pub fn record_acceptance(&mut self, plan: &ReferralPlan) {
        self.followers
            .entry((plan.dapp_id.clone(), plan.referrer.clone()))
            .or_default()
            .follower_count += 1;
        if let Some(inviter) = &plan.inviter {
            self.followers
                .entry((plan.dapp_id.clone(), inviter.clone()))
                .or_default()
                .sub_follower_count += 1;
        }
        if let Some(kol) = &plan.kol {
            *self
                .kol_sub_followers
                .entry((plan.dapp_id.clone(), kol.clone()))
                .or_default() += 1;
        }
    }
}
