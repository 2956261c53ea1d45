//! Public operations of the engine.
//!
//! Every operation follows the same shape: check all preconditions against
//! the untouched store, then commit. Nothing after the first write can fail,
//! so a rejected call leaves the store exactly as it was. Events are returned
//! to the caller instead of being published.

mod walk;

#[cfg(test)]
mod tests;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::domains::validate_domain;
use crate::error::EngineError;
use crate::host::{DappDirectory, DappInfo};
use crate::ledger::{serde_decimal, ChangeSet, PointsChangeDetail};
use crate::rules::RuleResolver;
use crate::state::PointsState;
use crate::types::{Address, DappId, IncomeSourceType, Timestamp};

use walk::{settle_for_action, Settlement};

pub const JOIN_ACTION: &str = "Join";
pub const APPLY_TO_BE_ADVOCATE_ACTION: &str = "ApplyToBeAdvocate";
pub const ACCEPT_REFERRAL_ACTION: &str = "AcceptReferral";

/// Host-supplied facts about the current call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    /// Held constant for the whole call.
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(sender: impl Into<Address>, now: Timestamp) -> Self {
        Self {
            sender: sender.into(),
            now,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinInput {
    pub dapp_id: DappId,
    pub registrant: Address,
    pub domain: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyToBeAdvocateInput {
    pub dapp_id: DappId,
    pub invitee: Address,
    /// Defaults to the sender.
    #[serde(default)]
    pub inviter: Option<Address>,
    pub domain: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcceptReferralInput {
    pub dapp_id: DappId,
    pub referrer: Address,
    pub invitee: Address,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettleEntry {
    pub user: Address,
    /// Base magnitude replacing the rule's `user_points`.
    #[serde(with = "serde_decimal")]
    pub points: BigUint,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettleInput {
    pub dapp_id: DappId,
    pub action_name: String,
    #[serde(flatten)]
    pub entry: SettleEntry,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSettleInput {
    pub dapp_id: DappId,
    pub action_name: String,
    pub entries: Vec<SettleEntry>,
}

/// Any public operation, for hosts that route calls generically.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Join(JoinInput),
    ApplyToBeAdvocate(ApplyToBeAdvocateInput),
    AcceptReferral(AcceptReferralInput),
    Settle(SettleInput),
    BatchSettle(BatchSettleInput),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Joined {
        dapp_id: DappId,
        domain: String,
        registrant: Address,
    },
    InviterApplied {
        dapp_id: DappId,
        domain: String,
        invitee: Address,
        inviter: Address,
    },
    ReferralAccepted {
        dapp_id: DappId,
        domain: String,
        referrer: Address,
        invitee: Address,
        inviter: Option<Address>,
    },
    PointsChanged {
        details: Vec<PointsChangeDetail>,
    },
}

impl EngineEvent {
    fn points_changed(changes: ChangeSet) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        Some(EngineEvent::PointsChanged {
            details: changes.into_details(),
        })
    }
}

pub struct SettlementEngine<'a, D: DappDirectory + ?Sized> {
    directory: &'a D,
    config: &'a EngineConfig,
}

impl<'a, D: DappDirectory + ?Sized> SettlementEngine<'a, D> {
    pub fn new(directory: &'a D, config: &'a EngineConfig) -> Self {
        Self { directory, config }
    }

    pub fn apply(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        operation: &Operation,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        match operation {
            Operation::Join(input) => self.join(state, call, input),
            Operation::ApplyToBeAdvocate(input) => self.apply_to_be_advocate(state, call, input),
            Operation::AcceptReferral(input) => self.accept_referral(state, call, input),
            Operation::Settle(input) => self.settle(state, call, input),
            Operation::BatchSettle(input) => self.batch_settle(state, call, input),
        }
    }

    /// Registers a user under the official domain or a claimed advocate
    /// domain and settles the `Join` rule for them.
    pub fn join(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &JoinInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.try_join(state, call, input)
            .inspect_err(|err| log_rejection("join", err))
    }

    /// Claims an advocate domain for `invitee`, nominated by `inviter`.
    pub fn apply_to_be_advocate(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &ApplyToBeAdvocateInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.try_apply_to_be_advocate(state, call, input)
            .inspect_err(|err| log_rejection("apply_to_be_advocate", err))
    }

    /// Links `invitee` under `referrer` and registers the invitee under the
    /// official domain.
    pub fn accept_referral(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &AcceptReferralInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.try_accept_referral(state, call, input)
            .inspect_err(|err| log_rejection("accept_referral", err))
    }

    pub fn settle(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &SettleInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.try_settle(state, call, input)
            .inspect_err(|err| log_rejection("settle", err))
    }

    /// Settles every entry in order. All entries are validated first; one bad
    /// entry rejects the whole batch.
    pub fn batch_settle(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &BatchSettleInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        self.try_batch_settle(state, call, input)
            .inspect_err(|err| log_rejection("batch_settle", err))
    }

    fn try_join(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &JoinInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        state.check_clock(call.now)?;
        let dapp = self.dapp_for_sender(&input.dapp_id, &call.sender)?;
        if !input.registrant.is_valid() {
            return Err(EngineError::InvalidAddress { role: "registrant" });
        }
        validate_domain(&input.domain, self.config.max_domain_length)?;
        let official = dapp.is_official(&input.domain);
        if !official && state.domains.relationship(&input.domain).is_none() {
            return Err(EngineError::UnknownDomain {
                domain: input.domain.clone(),
            });
        }
        state
            .registry
            .ensure_unregistered(&input.dapp_id, &input.registrant)?;

        state
            .registry
            .register(&input.dapp_id, &input.registrant, &input.domain)?;
        state.commit_clock(call.now);
        let settlement = Settlement {
            dapp_id: &input.dapp_id,
            dapp,
            now: call.now,
        };
        let changes = settle_for_action(state, &settlement, &input.registrant, JOIN_ACTION, None);
        // Counted after settling so the new member only weighs on accrual
        // from this instant on.
        if !official {
            state.domains.record_join(&input.dapp_id, &input.domain);
        }

        info!(
            dapp = %input.dapp_id,
            registrant = %input.registrant,
            domain = %input.domain,
            credits = changes.details().len(),
            "user joined"
        );
        let mut events: Vec<EngineEvent> = EngineEvent::points_changed(changes).into_iter().collect();
        events.push(EngineEvent::Joined {
            dapp_id: input.dapp_id.clone(),
            domain: input.domain.clone(),
            registrant: input.registrant.clone(),
        });
        Ok(events)
    }

    fn try_apply_to_be_advocate(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &ApplyToBeAdvocateInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        state.check_clock(call.now)?;
        if input.inviter.as_ref().is_some_and(|inviter| !inviter.is_valid()) {
            return Err(EngineError::InvalidAddress { role: "inviter" });
        }
        let inviter = input.inviter.clone().unwrap_or_else(|| call.sender.clone());
        if !input.invitee.is_valid() {
            return Err(EngineError::InvalidAddress { role: "invitee" });
        }
        let dapp = self.dapp(&input.dapp_id)?;
        let limit = self.directory.max_apply_count();
        if state.registry.apply_count(&inviter, &input.dapp_id) >= limit {
            return Err(EngineError::ApplyLimitReached { inviter, limit });
        }
        validate_domain(&input.domain, self.config.max_domain_length)?;
        if dapp.is_official(&input.domain) {
            return Err(EngineError::DomainClaimed {
                domain: input.domain.clone(),
            });
        }
        state.domains.check_claim(
            self.directory,
            &input.domain,
            &input.invitee,
            self.config.max_domain_length,
        )?;

        state.domains.claim_domain(
            self.directory,
            &input.domain,
            &input.invitee,
            &inviter,
            self.config.max_domain_length,
        )?;
        state.commit_clock(call.now);

        let mut changes = ChangeSet::new(input.dapp_id.clone());
        // Only claims paid under an advocate rule count towards the limit.
        if let Some(rule) = RuleResolver::new(dapp).resolve(APPLY_TO_BE_ADVOCATE_ACTION) {
            state.registry.increment_apply_count(&inviter, &input.dapp_id);
            changes.credit(
                &mut state.ledger,
                rule,
                &input.invitee,
                &input.domain,
                IncomeSourceType::Kol,
                rule.kol_points(None),
            );
            if inviter != input.invitee {
                changes.credit(
                    &mut state.ledger,
                    rule,
                    &inviter,
                    &input.domain,
                    IncomeSourceType::Inviter,
                    rule.inviter_points(None),
                );
            }
        }

        info!(
            dapp = %input.dapp_id,
            domain = %input.domain,
            invitee = %input.invitee,
            inviter = %inviter,
            "advocate domain claimed"
        );
        let mut events: Vec<EngineEvent> = EngineEvent::points_changed(changes).into_iter().collect();
        events.push(EngineEvent::InviterApplied {
            dapp_id: input.dapp_id.clone(),
            domain: input.domain.clone(),
            invitee: input.invitee.clone(),
            inviter,
        });
        Ok(events)
    }

    fn try_accept_referral(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &AcceptReferralInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        state.check_clock(call.now)?;
        let dapp = self.dapp_for_sender(&input.dapp_id, &call.sender)?;
        let plan = state.referrals.plan_referral(
            &state.registry,
            &state.domains,
            &input.dapp_id,
            &input.referrer,
            &input.invitee,
        )?;

        state
            .registry
            .register(&input.dapp_id, &plan.invitee, &dapp.official_domain)?;
        state.referrals.link(&plan);
        state.commit_clock(call.now);
        let settlement = Settlement {
            dapp_id: &input.dapp_id,
            dapp,
            now: call.now,
        };
        let changes = settle_for_action(
            state,
            &settlement,
            &plan.invitee,
            ACCEPT_REFERRAL_ACTION,
            None,
        );
        state.referrals.record_acceptance(&plan);

        info!(
            dapp = %input.dapp_id,
            referrer = %plan.referrer,
            invitee = %plan.invitee,
            credits = changes.details().len(),
            "referral accepted"
        );
        let mut events: Vec<EngineEvent> = EngineEvent::points_changed(changes).into_iter().collect();
        events.push(EngineEvent::ReferralAccepted {
            dapp_id: input.dapp_id.clone(),
            domain: dapp.official_domain.clone(),
            referrer: plan.referrer,
            invitee: plan.invitee,
            inviter: plan.inviter,
        });
        Ok(events)
    }

    fn try_settle(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &SettleInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        state.check_clock(call.now)?;
        let dapp = self.dapp_for_sender(&input.dapp_id, &call.sender)?;
        validate_action_name(&input.action_name)?;
        check_settle_entry(state, &input.dapp_id, &input.entry)?;

        state.commit_clock(call.now);
        let settlement = Settlement {
            dapp_id: &input.dapp_id,
            dapp,
            now: call.now,
        };
        let changes = settle_for_action(
            state,
            &settlement,
            &input.entry.user,
            &input.action_name,
            Some(&input.entry.points),
        );
        info!(
            dapp = %input.dapp_id,
            action = %input.action_name,
            user = %input.entry.user,
            credits = changes.details().len(),
            "points settled"
        );
        Ok(EngineEvent::points_changed(changes).into_iter().collect())
    }

    fn try_batch_settle(
        &self,
        state: &mut PointsState,
        call: &CallContext,
        input: &BatchSettleInput,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        state.check_clock(call.now)?;
        let dapp = self.dapp_for_sender(&input.dapp_id, &call.sender)?;
        validate_action_name(&input.action_name)?;
        let max = self.config.max_batch_settle;
        if input.entries.is_empty() || input.entries.len() > max {
            return Err(EngineError::InvalidSettleList {
                len: input.entries.len(),
                max,
            });
        }
        for entry in &input.entries {
            check_settle_entry(state, &input.dapp_id, entry)?;
        }

        state.commit_clock(call.now);
        let settlement = Settlement {
            dapp_id: &input.dapp_id,
            dapp,
            now: call.now,
        };
        let mut events = Vec::new();
        for entry in &input.entries {
            let changes = settle_for_action(
                state,
                &settlement,
                &entry.user,
                &input.action_name,
                Some(&entry.points),
            );
            events.extend(EngineEvent::points_changed(changes));
        }
        info!(
            dapp = %input.dapp_id,
            action = %input.action_name,
            entries = input.entries.len(),
            "batch settled"
        );
        Ok(events)
    }

    fn dapp(&self, dapp_id: &DappId) -> Result<&'a DappInfo, EngineError> {
        self.directory
            .dapp(dapp_id)
            .ok_or_else(|| EngineError::UnknownDapp {
                dapp_id: dapp_id.clone(),
            })
    }

    /// Registration and settlement are reserved for the dapp's own contract.
    fn dapp_for_sender(&self, dapp_id: &DappId, sender: &Address) -> Result<&'a DappInfo, EngineError> {
        let dapp = self.dapp(dapp_id)?;
        if dapp.contract_address != *sender {
            return Err(EngineError::NoPermission {
                dapp_id: dapp_id.clone(),
                sender: sender.clone(),
            });
        }
        Ok(dapp)
    }
}

fn validate_action_name(action_name: &str) -> Result<(), EngineError> {
    if action_name.trim().is_empty() {
        return Err(EngineError::InvalidActionName);
    }
    Ok(())
}

fn check_settle_entry(
    state: &PointsState,
    dapp_id: &DappId,
    entry: &SettleEntry,
) -> Result<(), EngineError> {
    if !entry.user.is_valid() {
        return Err(EngineError::InvalidAddress { role: "user" });
    }
    if state.registry.domain_of(dapp_id, &entry.user).is_none() {
        return Err(EngineError::NotRegistered {
            role: "user",
            dapp_id: dapp_id.clone(),
            address: entry.user.clone(),
        });
    }
    if entry.points.is_zero() {
        return Err(EngineError::InvalidPointsValue);
    }
    Ok(())
}

fn log_rejection(operation: &'static str, err: &EngineError) {
    warn!(operation, kind = ?err.kind(), error = %err, "call rejected");
}
