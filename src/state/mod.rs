use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::accrual::AccrualCheckpoints;
use crate::domains::{DomainGraph, DomainRelationship};
use crate::error::EngineError;
use crate::ledger::{leaf_hash, serde_entries, state_root_of, BalanceKey, BalanceLedger};
use crate::referral::{FollowerCounts, ReferralGraph, ReferralRelation};
use crate::types::{Address, DappId, IncomeSourceType, Timestamp};

/// Write-once registrations and the per-inviter apply counters.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    #[serde(with = "serde_entries")]
    registrations: BTreeMap<(DappId, Address), String>,
    #[serde(with = "serde_entries")]
    apply_counts: BTreeMap<(Address, DappId), u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain_of(&self, dapp_id: &DappId, address: &Address) -> Option<&str> {
        self.registrations
            .get(&(dapp_id.clone(), address.clone()))
            .map(String::as_str)
    }

    pub fn ensure_unregistered(&self, dapp_id: &DappId, address: &Address) -> Result<(), EngineError> {
        if self.domain_of(dapp_id, address).is_some() {
            return Err(EngineError::AlreadyRegistered {
                dapp_id: dapp_id.clone(),
                address: address.clone(),
            });
        }
        Ok(())
    }

    /// Registers `address` under `domain`; a pair can only register once.
    pub fn register(
        &mut self,
        dapp_id: &DappId,
        address: &Address,
        domain: &str,
    ) -> Result<(), EngineError> {
        self.ensure_unregistered(dapp_id, address)?;
        self.registrations
            .insert((dapp_id.clone(), address.clone()), domain.to_string());
        Ok(())
    }

    pub fn apply_count(&self, inviter: &Address, dapp_id: &DappId) -> u32 {
        self.apply_counts
            .get(&(inviter.clone(), dapp_id.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn increment_apply_count(&mut self, inviter: &Address, dapp_id: &DappId) {
        *self
            .apply_counts
            .entry((inviter.clone(), dapp_id.clone()))
            .or_default() += 1;
    }
}

/// Everything the engine reads and writes, handed in explicitly on every
/// call. The host persists it between calls.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointsState {
    /// Time of the last committed call.
    pub clock: Option<Timestamp>,
    pub registry: Registry,
    pub domains: DomainGraph,
    pub referrals: ReferralGraph,
    pub checkpoints: AccrualCheckpoints,
    pub ledger: BalanceLedger,
}

impl PointsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check_clock(&self, now: Timestamp) -> Result<(), EngineError> {
        match self.clock {
            Some(last) if now < last => Err(EngineError::ClockRegression { now, last }),
            _ => Ok(()),
        }
    }

    pub(crate) fn commit_clock(&mut self, now: Timestamp) {
        self.clock = Some(now);
    }

    pub fn points_balance(
        &self,
        address: &Address,
        domain: &str,
        income_source_type: IncomeSourceType,
        point_name: &str,
    ) -> BigUint {
        self.ledger
            .balance(&BalanceKey::new(address, domain, income_source_type, point_name))
    }

    pub fn referral_relation(&self, dapp_id: &DappId, invitee: &Address) -> Option<&ReferralRelation> {
        self.referrals.relation(dapp_id, invitee)
    }

    pub fn domain_relationship(&self, domain: &str) -> Option<&DomainRelationship> {
        self.domains.relationship(domain)
    }

    pub fn registration(&self, dapp_id: &DappId, address: &Address) -> Option<&str> {
        self.registry.domain_of(dapp_id, address)
    }

    pub fn follower_counts(&self, dapp_id: &DappId, address: &Address) -> FollowerCounts {
        self.referrals
            .follower_counts(dapp_id, address)
            .unwrap_or_default()
    }

    pub fn kol_sub_follower_count(&self, dapp_id: &DappId, kol: &Address) -> u64 {
        self.referrals.kol_sub_follower_count(dapp_id, kol)
    }

    pub fn invitation_count(&self, dapp_id: &DappId, kol: &Address, domain: &str) -> u64 {
        self.domains.invitation_count(dapp_id, kol, domain)
    }

    pub fn apply_count(&self, inviter: &Address, dapp_id: &DappId) -> u32 {
        self.registry.apply_count(inviter, dapp_id)
    }

    /// Merkle root over balances, checkpoints and registrations. Two replays
    /// of the same calls produce the same root.
    pub fn state_root(&self) -> [u8; 32] {
        let mut leaves: Vec<[u8; 32]> = self.ledger.leaves().collect();
        leaves.extend(self.checkpoints.leaves().map(|(tag, key, at)| {
            leaf_hash(
                tag,
                &[
                    key.dapp_id.as_str().as_bytes(),
                    key.address.as_str().as_bytes(),
                    key.domain.as_bytes(),
                    key.income_source_type.as_str().as_bytes(),
                    at.to_le_bytes().as_slice(),
                ],
            )
        }));
        leaves.extend(
            self.registry
                .registrations
                .iter()
                .map(|((dapp_id, address), domain)| {
                    leaf_hash(
                        b"registration",
                        &[
                            dapp_id.as_str().as_bytes(),
                            address.as_str().as_bytes(),
                            domain.as_bytes(),
                        ],
                    )
                }),
        );
        state_root_of(leaves)
    }

    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}
