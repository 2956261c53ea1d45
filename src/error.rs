use thiserror::Error;

use crate::types::{Address, DappId, Timestamp};

/// Coarse classification every rejection maps onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: empty address or domain, zero points, bad list sizes.
    Validation,
    /// The caller is not allowed to drive this dapp.
    Permission,
    /// The request contradicts existing state.
    StateConflict,
    /// A referenced dapp, user or domain does not exist.
    NotFound,
}

/// Canonical error type returned by every engine operation.
///
/// All variants are raised before the store is touched, so a rejected call
/// leaves the state exactly as it found it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid {role} address")]
    InvalidAddress { role: &'static str },

    #[error("invalid domain {domain:?}")]
    InvalidDomain { domain: String },

    #[error("invalid action name")]
    InvalidActionName,

    #[error("invalid user points value")]
    InvalidPointsValue,

    #[error("invalid settle list: {len} entries, limit {max}")]
    InvalidSettleList { len: usize, max: usize },

    #[error("timestamp {now} precedes the last processed call at {last}")]
    ClockRegression { now: Timestamp, last: Timestamp },

    #[error("no permission: {sender} cannot act for dapp {dapp_id}")]
    NoPermission { dapp_id: DappId, sender: Address },

    #[error("{address} is already registered in dapp {dapp_id}")]
    AlreadyRegistered { dapp_id: DappId, address: Address },

    #[error("domain {domain} has already been claimed")]
    DomainClaimed { domain: String },

    #[error("domain {domain} is an officially reserved domain")]
    ReservedDomain { domain: String },

    #[error("apply count of {inviter} reached the limit of {limit}")]
    ApplyLimitReached { inviter: Address, limit: u32 },

    #[error("cannot refer {kol}, the kol of the referrer's domain")]
    ReferKol { kol: Address },

    #[error("unknown dapp {dapp_id}")]
    UnknownDapp { dapp_id: DappId },

    #[error("domain {domain} does not exist")]
    UnknownDomain { domain: String },

    #[error("{role} {address} has not joined dapp {dapp_id}")]
    NotRegistered {
        role: &'static str,
        dapp_id: DappId,
        address: Address,
    },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidAddress { .. }
            | EngineError::InvalidDomain { .. }
            | EngineError::InvalidActionName
            | EngineError::InvalidPointsValue
            | EngineError::InvalidSettleList { .. }
            | EngineError::ClockRegression { .. } => ErrorKind::Validation,
            EngineError::NoPermission { .. } => ErrorKind::Permission,
            EngineError::AlreadyRegistered { .. }
            | EngineError::DomainClaimed { .. }
            | EngineError::ReservedDomain { .. }
            | EngineError::ApplyLimitReached { .. }
            | EngineError::ReferKol { .. } => ErrorKind::StateConflict,
            EngineError::UnknownDapp { .. }
            | EngineError::UnknownDomain { .. }
            | EngineError::NotRegistered { .. } => ErrorKind::NotFound,
        }
    }
}
