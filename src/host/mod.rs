//! Collaborators the engine consumes but does not own.
//!
//! Dapp registration, rule lists, the reserved-domain list and the apply
//! limit are managed by an admin layer outside this crate. The engine only
//! reads them through [`DappDirectory`]. [`StaticDirectory`] is the in-memory
//! rendition used by the replay binary and the tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::rules::PointsRule;
use crate::types::{Address, DappId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DappInfo {
    pub official_domain: String,
    pub admin: Address,
    /// The only sender allowed to register users and settle points.
    pub contract_address: Address,
    #[serde(default)]
    pub points_rules: Vec<PointsRule>,
    /// Rule driving the per-second accrual; `None` disables accrual.
    #[serde(default)]
    pub self_increasing_rule: Option<PointsRule>,
}

impl DappInfo {
    pub fn is_official(&self, domain: &str) -> bool {
        self.official_domain == domain
    }
}

pub trait DappDirectory {
    fn dapp(&self, dapp_id: &DappId) -> Option<&DappInfo>;

    fn is_reserved_domain(&self, domain: &str) -> bool;

    /// Maximum number of domains one inviter may nominate per dapp.
    fn max_apply_count(&self) -> u32;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticDirectory {
    #[serde(default)]
    pub dapps: BTreeMap<DappId, DappInfo>,
    #[serde(default)]
    pub reserved_domains: BTreeSet<String>,
    pub max_apply_count: u32,
}

impl StaticDirectory {
    pub fn new(max_apply_count: u32) -> Self {
        Self {
            dapps: BTreeMap::new(),
            reserved_domains: BTreeSet::new(),
            max_apply_count,
        }
    }

    pub fn with_dapp(mut self, dapp_id: DappId, info: DappInfo) -> Self {
        self.dapps.insert(dapp_id, info);
        self
    }

    /// Blank entries are ignored, mirroring how the admin layer filters them.
    pub fn reserve(mut self, domains: &[&str]) -> Self {
        for domain in domains {
            if !domain.trim().is_empty() {
                self.reserved_domains.insert((*domain).to_string());
            }
        }
        self
    }
}

impl DappDirectory for StaticDirectory {
    fn dapp(&self, dapp_id: &DappId) -> Option<&DappInfo> {
        self.dapps.get(dapp_id)
    }

    fn is_reserved_domain(&self, domain: &str) -> bool {
        self.reserved_domains.contains(domain)
    }

    fn max_apply_count(&self) -> u32 {
        self.max_apply_count
    }
}
