use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::host::DappInfo;

/// Fixed denominator every percent field is measured against.
pub const DENOMINATOR: u64 = 10_000;

/// One action-triggered reward rule of a dapp.
///
/// `kol_points_percent` and `inviter_points_percent` are basis points of the
/// base amount when `enable_proportional_calculation` is set. Otherwise they
/// are flat point amounts handed out regardless of the base.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointsRule {
    pub action_name: String,
    pub point_name: String,
    pub user_points: u64,
    pub kol_points_percent: u64,
    pub inviter_points_percent: u64,
    #[serde(default)]
    pub enable_proportional_calculation: bool,
}

/// Amounts one triggering event hands to the user and the two levels above.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shares {
    pub user: BigUint,
    pub kol: BigUint,
    pub inviter: BigUint,
}

impl PointsRule {
    fn base_or_default(&self, base: Option<&BigUint>) -> BigUint {
        base.cloned()
            .unwrap_or_else(|| BigUint::from(self.user_points))
    }

    pub fn user_points(&self, base: Option<&BigUint>) -> BigUint {
        if self.enable_proportional_calculation {
            self.base_or_default(base)
        } else {
            BigUint::from(self.user_points)
        }
    }

    pub fn kol_points(&self, base: Option<&BigUint>) -> BigUint {
        if self.enable_proportional_calculation {
            proportion(&self.base_or_default(base), self.kol_points_percent)
        } else {
            BigUint::from(self.kol_points_percent)
        }
    }

    pub fn inviter_points(&self, base: Option<&BigUint>) -> BigUint {
        if self.enable_proportional_calculation {
            proportion(&self.base_or_default(base), self.inviter_points_percent)
        } else {
            BigUint::from(self.inviter_points_percent)
        }
    }

    pub fn shares(&self, base: Option<&BigUint>) -> Shares {
        Shares {
            user: self.user_points(base),
            kol: self.kol_points(base),
            inviter: self.inviter_points(base),
        }
    }
}

/// `amount * percent / 10000`, truncating.
pub fn proportion(amount: &BigUint, percent: u64) -> BigUint {
    amount * BigUint::from(percent) / BigUint::from(DENOMINATOR)
}

/// Looks rules up in a dapp's externally supplied rule list.
pub struct RuleResolver<'a> {
    rules: &'a [PointsRule],
}

impl<'a> RuleResolver<'a> {
    pub fn new(dapp: &'a DappInfo) -> Self {
        Self::from_rules(&dapp.points_rules)
    }

    pub fn from_rules(rules: &'a [PointsRule]) -> Self {
        Self { rules }
    }

    /// First rule registered for `action_name`, if any.
    pub fn resolve(&self, action_name: &str) -> Option<&'a PointsRule> {
        self.rules.iter().find(|rule| rule.action_name == action_name)
    }
}
