//! Deterministic points settlement for dapps.
//!
//! Users join a dapp either under its official domain or under an advocate
//! (KOL) domain, and may be referred by existing members. Every triggering
//! action pays the user and up to two levels above them, and a per-second
//! self-increasing rule keeps paying along the same hierarchy. All state
//! lives in an explicit [`PointsState`] that the host hands to
//! [`SettlementEngine`] on every call.

pub mod accrual;
pub mod config;
pub mod domains;
pub mod error;
pub mod host;
pub mod ledger;
pub mod referral;
pub mod rules;
pub mod scenario;
pub mod settlement;
pub mod state;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind};
pub use host::{DappDirectory, DappInfo, StaticDirectory};
pub use ledger::PointsChangeDetail;
pub use rules::PointsRule;
pub use settlement::{CallContext, EngineEvent, Operation, SettlementEngine};
pub use state::PointsState;
pub use types::{Address, DappId, IncomeSourceType, Timestamp};
