use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::host::DappDirectory;
use crate::ledger::serde_entries;
use crate::types::{Address, DappId};

/// Who claimed an advocate domain and who nominated them.
///
/// `inviter` is a plain back-reference; it is never resolved further, which
/// caps the advocate hierarchy at two levels.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainRelationship {
    pub domain: String,
    pub invitee: Address,
    pub inviter: Option<Address>,
}

/// Advocate hierarchy plus the per-domain join counters accrual scales by.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainGraph {
    relationships: BTreeMap<String, DomainRelationship>,
    #[serde(with = "serde_entries")]
    invitation_counts: BTreeMap<(DappId, Address, String), u64>,
    #[serde(with = "serde_entries")]
    tier_two_invitation_counts: BTreeMap<(DappId, Address, String), u64>,
}

/// Domains are non-empty, whitespace free and at most `max_len` characters.
pub fn validate_domain(domain: &str, max_len: usize) -> Result<(), EngineError> {
    let invalid = domain.is_empty()
        || domain.chars().count() > max_len
        || domain.chars().any(char::is_whitespace);
    if invalid {
        return Err(EngineError::InvalidDomain {
            domain: domain.to_string(),
        });
    }
    Ok(())
}

impl DomainGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relationship(&self, domain: &str) -> Option<&DomainRelationship> {
        self.relationships.get(domain)
    }

    /// Checks every claim precondition without touching the graph.
    pub fn check_claim<D: DappDirectory + ?Sized>(
        &self,
        directory: &D,
        domain: &str,
        invitee: &Address,
        max_domain_len: usize,
    ) -> Result<(), EngineError> {
        if !invitee.is_valid() {
            return Err(EngineError::InvalidAddress { role: "invitee" });
        }
        validate_domain(domain, max_domain_len)?;
        if self.relationships.contains_key(domain) {
            return Err(EngineError::DomainClaimed {
                domain: domain.to_string(),
            });
        }
        if directory.is_reserved_domain(domain) {
            return Err(EngineError::ReservedDomain {
                domain: domain.to_string(),
            });
        }
        Ok(())
    }

    /// Claims `domain` for `invitee`. A self-nomination stores no inviter.
    pub fn claim_domain<D: DappDirectory + ?Sized>(
        &mut self,
        directory: &D,
        domain: &str,
        invitee: &Address,
        inviter: &Address,
        max_domain_len: usize,
    ) -> Result<&DomainRelationship, EngineError> {
        self.check_claim(directory, domain, invitee, max_domain_len)?;
        let relationship = DomainRelationship {
            domain: domain.to_string(),
            invitee: invitee.clone(),
            inviter: (inviter != invitee).then(|| inviter.clone()),
        };
        Ok(self
            .relationships
            .entry(domain.to_string())
            .or_insert(relationship))
    }

    /// Counts one more user joined through `domain`, for its KOL and, one
    /// level up, for its inviter. Unclaimed domains are ignored.
    pub fn record_join(&mut self, dapp_id: &DappId, domain: &str) {
        let Some(relationship) = self.relationships.get(domain) else {
            return;
        };
        *self
            .invitation_counts
            .entry((dapp_id.clone(), relationship.invitee.clone(), domain.to_string()))
            .or_default() += 1;
        if let Some(inviter) = &relationship.inviter {
            *self
                .tier_two_invitation_counts
                .entry((dapp_id.clone(), inviter.clone(), domain.to_string()))
                .or_default() += 1;
        }
    }

    pub fn invitation_count(&self, dapp_id: &DappId, kol: &Address, domain: &str) -> u64 {
        self.invitation_counts
            .get(&(dapp_id.clone(), kol.clone(), domain.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn tier_two_invitation_count(
        &self,
        dapp_id: &DappId,
        inviter: &Address,
        domain: &str,
    ) -> u64 {
        self.tier_two_invitation_counts
            .get(&(dapp_id.clone(), inviter.clone(), domain.to_string()))
            .copied()
            .unwrap_or_default()
    }
}
