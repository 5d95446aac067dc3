use std::fmt;

use chrono::Utc;
use slog::warn;

use primitives::{
    adapter::Adapter,
    validator::{ApproveState, MessageTypes, NewState, RejectState},
    BalancesMap,
};

use crate::{
    core::{
        fees::get_balances_after_fees_tree,
        follower_rules::{is_healthy, is_valid_transition},
    },
    error::Error,
    get_state_root_hash,
    heartbeat::{heartbeat, HeartbeatStatus},
    producer,
    sentry_interface::{PropagationResult, SentryApi},
};

/// Why a proposed NewState was refused. The variants map 1:1 onto the
/// `reason` field of the emitted RejectState.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidNewState {
    Transition,
    ValidatorFees,
    RootHash,
    Signature,
}

impl fmt::Display for InvalidNewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            InvalidNewState::Transition => "InvalidTransition",
            InvalidNewState::ValidatorFees => "InvalidValidatorFees",
            InvalidNewState::RootHash => "InvalidRootHash",
            InvalidNewState::Signature => "InvalidSignature",
        };

        write!(f, "{}", reason)
    }
}

#[derive(Debug)]
pub enum ApproveStateResult {
    /// `None` when there was no fresh NewState to respond to.
    Sent(Option<Vec<PropagationResult>>),
    RejectedState {
        reason: InvalidNewState,
        state_root: String,
        propagation: Vec<PropagationResult>,
    },
}

#[derive(Debug)]
pub struct TickStatus {
    pub heartbeat: HeartbeatStatus,
    pub approve_state: ApproveStateResult,
}

/// The follower tick: validates the leader's latest NewState and answers
/// with a signed ApproveState, or a RejectState naming the violation.
pub async fn tick<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<TickStatus, Error> {
    // producer first, so our own view includes everything aggregated
    // before the proposal we are about to judge
    let (balances, _) = producer::tick(iface, false).await?;

    let from = iface.channel.spec.validators.leader().id.clone();
    let new_msg = match iface.get_latest_msg(&from, &["NewState"]).await? {
        Some(MessageTypes::NewState(new_state)) => Some(new_state),
        _ => None,
    };

    // a root we already answered - approved or rejected - is final from
    // our side until the leader proposes a different one
    let responded_root = match iface
        .get_our_latest_msg(&["ApproveState", "RejectState"])
        .await?
    {
        Some(MessageTypes::ApproveState(approve_state)) => Some(approve_state.state_root),
        Some(MessageTypes::RejectState(reject_state)) => Some(reject_state.state_root),
        _ => None,
    };

    let latest_is_responded_to = matches!(
        (&new_msg, &responded_root),
        (Some(new_state), Some(root)) if &new_state.state_root == root
    );

    let approve_state = match (new_msg, latest_is_responded_to) {
        (Some(new_state), false) => on_new_state(iface, &balances, new_state).await?,
        _ => ApproveStateResult::Sent(None),
    };

    Ok(TickStatus {
        heartbeat: heartbeat(iface, &balances).await?,
        approve_state,
    })
}

async fn on_new_state<A: Adapter + 'static>(
    iface: &SentryApi<A>,
    ours: &BalancesMap,
    new_state: NewState,
) -> Result<ApproveStateResult, Error> {
    let channel = &iface.channel;

    let prev_balances = {
        let last_approved = iface.get_last_approved().await?.last_approved;

        match last_approved {
            Some(last_approved) => match (last_approved.new_state, last_approved.approve_state) {
                (Some(new_state), _) => new_state.msg.into_inner().balances,
                // an ApproveState pointing at no NewState is corrupted
                // data, not something to retry
                (None, Some(_)) => return Err(Error::LastApprovedCorrupted(channel.id)),
                (None, None) => Default::default(),
            },
            None => Default::default(),
        }
    };

    let proposed_balances = &new_state.balances;

    if !is_valid_transition(channel, &prev_balances, proposed_balances) {
        return on_error(iface, new_state, InvalidNewState::Transition).await;
    }

    let expected_after_fees = match get_balances_after_fees_tree(proposed_balances, channel) {
        Ok(balances_after_fees) => balances_after_fees,
        Err(_) => return on_error(iface, new_state, InvalidNewState::ValidatorFees).await,
    };
    if expected_after_fees != new_state.balances_after_fees {
        return on_error(iface, new_state, InvalidNewState::ValidatorFees).await;
    }

    let expected_root = get_state_root_hash(channel, &new_state.balances_after_fees)?;
    if expected_root != new_state.state_root {
        return on_error(iface, new_state, InvalidNewState::RootHash).await;
    }

    let leader = &channel.spec.validators.leader().id;
    if !iface
        .adapter
        .verify(leader, &new_state.state_root, &new_state.signature)?
    {
        return on_error(iface, new_state, InvalidNewState::Signature).await;
    }

    let signature = iface.adapter.sign(&new_state.state_root)?;
    let is_healthy = is_healthy(
        ours,
        proposed_balances,
        iface.config.health_threshold_promilles.into(),
    );

    let propagation = iface
        .persist_and_propagate(&[&MessageTypes::ApproveState(ApproveState {
            state_root: new_state.state_root,
            signature,
            is_healthy,
        })])
        .await?;

    Ok(ApproveStateResult::Sent(Some(propagation)))
}

async fn on_error<A: Adapter + 'static>(
    iface: &SentryApi<A>,
    new_state: NewState,
    reason: InvalidNewState,
) -> Result<ApproveStateResult, Error> {
    warn!(
        iface.logger,
        "channel {}: rejecting NewState", iface.channel.id;
        "reason" => %reason,
        "stateRoot" => %new_state.state_root,
    );

    let propagation = iface
        .persist_and_propagate(&[&MessageTypes::RejectState(RejectState {
            reason: reason.to_string(),
            state_root: new_state.state_root.clone(),
            signature: new_state.signature.clone(),
            balances: Some(new_state.balances.clone()),
            timestamp: Some(Utc::now()),
        })])
        .await?;

    Ok(ApproveStateResult::RejectedState {
        reason,
        state_root: new_state.state_root,
        propagation,
    })
}
