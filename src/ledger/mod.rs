use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::rules::PointsRule;
use crate::types::{Address, DappId, IncomeSourceType};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BalanceKey {
    pub address: Address,
    pub domain: String,
    pub income_source_type: IncomeSourceType,
    pub point_name: String,
}

impl BalanceKey {
    pub fn new(
        address: &Address,
        domain: &str,
        income_source_type: IncomeSourceType,
        point_name: &str,
    ) -> Self {
        Self {
            address: address.clone(),
            domain: domain.to_string(),
            income_source_type,
            point_name: point_name.to_string(),
        }
    }
}

/// Additive-only store of point balances.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceLedger {
    #[serde(with = "serde_entries")]
    balances: BTreeMap<BalanceKey, BigUint>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` and returns the resulting balance.
    pub fn credit(&mut self, key: BalanceKey, amount: &BigUint) -> BigUint {
        let balance = self.balances.entry(key).or_insert_with(BigUint::zero);
        *balance += amount;
        balance.clone()
    }

    pub fn balance(&self, key: &BalanceKey) -> BigUint {
        self.balances.get(key).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub(crate) fn leaves(&self) -> impl Iterator<Item = [u8; 32]> + '_ {
        self.balances.iter().map(|(key, balance)| {
            leaf_hash(
                b"balance",
                &[
                    key.address.as_str().as_bytes(),
                    key.domain.as_bytes(),
                    key.income_source_type.as_str().as_bytes(),
                    key.point_name.as_bytes(),
                    balance.to_bytes_le().as_slice(),
                ],
            )
        })
    }
}

/// Audit record of one balance delta.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointsChangeDetail {
    pub dapp_id: DappId,
    pub receiver: Address,
    pub domain: String,
    pub income_source_type: IncomeSourceType,
    pub action_name: String,
    pub point_name: String,
    #[serde(with = "serde_decimal")]
    pub increase_value: BigUint,
    #[serde(with = "serde_decimal")]
    pub balance: BigUint,
}

/// Ordered batch of deltas produced by one settlement.
#[derive(Clone, Debug)]
pub struct ChangeSet {
    dapp_id: DappId,
    details: Vec<PointsChangeDetail>,
}

impl ChangeSet {
    pub fn new(dapp_id: DappId) -> Self {
        Self {
            dapp_id,
            details: Vec::new(),
        }
    }

    /// Credits `amount` under `rule`'s action and point names. A zero amount
    /// still lands in the batch, so every touched key is reported, but leaves
    /// the ledger untouched.
    pub fn credit(
        &mut self,
        ledger: &mut BalanceLedger,
        rule: &PointsRule,
        receiver: &Address,
        domain: &str,
        income_source_type: IncomeSourceType,
        amount: BigUint,
    ) {
        let key = BalanceKey::new(receiver, domain, income_source_type, &rule.point_name);
        let balance = if amount.is_zero() {
            ledger.balance(&key)
        } else {
            ledger.credit(key, &amount)
        };
        debug!(
            dapp = %self.dapp_id,
            receiver = %receiver,
            domain,
            source = %income_source_type,
            point = %rule.point_name,
            amount = %amount,
            "points credited"
        );
        self.details.push(PointsChangeDetail {
            dapp_id: self.dapp_id.clone(),
            receiver: receiver.clone(),
            domain: domain.to_string(),
            income_source_type,
            action_name: rule.action_name.clone(),
            point_name: rule.point_name.clone(),
            increase_value: amount,
            balance,
        });
    }

    pub fn details(&self) -> &[PointsChangeDetail] {
        &self.details
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn into_details(self) -> Vec<PointsChangeDetail> {
        self.details
    }
}

/// Hash of one state-root leaf: a tag followed by NUL-separated fields.
pub(crate) fn leaf_hash(tag: &[u8], fields: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for field in fields {
        hasher.update([0u8]);
        hasher.update(field);
    }
    hasher.finalize().into()
}

/// Folds sorted leaves level by level into one root. A level with an odd
/// count carries its last node up unchanged.
pub(crate) fn state_root_of(leaves: Vec<[u8; 32]>) -> [u8; 32] {
    let mut level = leaves;
    if level.is_empty() {
        return leaf_hash(b"points-state-empty", &[]);
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => leaf_hash(b"node", &[left.as_slice(), right.as_slice()]),
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}

/// Big integers as decimal strings, so JSON consumers never lose precision.
pub(crate) mod serde_decimal {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        BigUint::parse_bytes(encoded.trim().as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("invalid decimal integer {encoded:?}")))
    }
}

/// Maps with structured keys as a list of `[key, value]` pairs; JSON objects
/// only accept string keys.
pub(crate) mod serde_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let entries = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
