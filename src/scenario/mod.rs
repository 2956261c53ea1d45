//! Recorded call sequences and their deterministic replay.
//!
//! A scenario file bundles the host side (engine limits plus a static dapp
//! directory) with an ordered list of calls. Replaying it against a store
//! yields one outcome per step; rejected steps leave the store untouched and
//! replay carries on with the next step.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::host::StaticDirectory;
use crate::settlement::{CallContext, EngineEvent, Operation, SettlementEngine};
use crate::state::PointsState;
use crate::types::{Address, Timestamp};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    /// Host timestamp of the call, in seconds.
    pub at: Timestamp,
    pub sender: Address,
    #[serde(flatten)]
    pub op: Operation,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    #[serde(default)]
    pub config: EngineConfig,
    pub directory: StaticDirectory,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Accepted { events: Vec<EngineEvent> },
    Rejected { kind: String, reason: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub at: Timestamp,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Applies every step in order and reports what each one did.
    pub fn replay(&self, state: &mut PointsState) -> Vec<StepReport> {
        let engine = SettlementEngine::new(&self.directory, &self.config);
        let reports: Vec<StepReport> = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let call = CallContext {
                    sender: step.sender.clone(),
                    now: step.at,
                };
                let outcome = match engine.apply(state, &call, &step.op) {
                    Ok(events) => StepOutcome::Accepted { events },
                    Err(err) => StepOutcome::Rejected {
                        kind: format!("{:?}", err.kind()),
                        reason: err.to_string(),
                    },
                };
                debug!(index, at = step.at, "step replayed");
                StepReport {
                    index,
                    at: step.at,
                    outcome,
                }
            })
            .collect();
        let rejected = reports
            .iter()
            .filter(|report| matches!(report.outcome, StepOutcome::Rejected { .. }))
            .count();
        info!(steps = reports.len(), rejected, "scenario replayed");
        reports
    }
}

pub fn load_state(path: &Path) -> Result<PointsState, ScenarioError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_state(path: &Path, state: &PointsState) -> Result<(), ScenarioError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(state)?)?;
    Ok(())
}
