use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds since an arbitrary epoch, supplied by the host once per call.
pub type Timestamp = u64;

/// Opaque participant identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An address is usable once it carries at least one non-blank character.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque tenant identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DappId(String);

impl DappId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DappId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for DappId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which role a balance was earned in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeSourceType {
    User,
    Kol,
    Inviter,
}

impl IncomeSourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            IncomeSourceType::User => "user",
            IncomeSourceType::Kol => "kol",
            IncomeSourceType::Inviter => "inviter",
        }
    }
}

impl fmt::Display for IncomeSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncomeSourceType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "user" => Ok(IncomeSourceType::User),
            "kol" => Ok(IncomeSourceType::Kol),
            "inviter" => Ok(IncomeSourceType::Inviter),
            other => Err(format!("unknown income source type {other}")),
        }
    }
}
