use slog::info;

use primitives::{
    adapter::Adapter,
    validator::{MessageTypes, NewState},
    BalancesMap,
};

use crate::{
    core::fees::get_balances_after_fees_tree,
    error::Error,
    get_state_root_hash,
    heartbeat::{heartbeat, HeartbeatStatus},
    producer,
    sentry_interface::{PropagationResult, SentryApi},
};

#[derive(Debug)]
pub struct TickStatus {
    pub heartbeat: HeartbeatStatus,
    /// `None` when the latest NewState already proposes the current tree
    /// (or there is nothing to propose yet).
    pub new_state: Option<Vec<PropagationResult>>,
}

/// The leader tick: unilaterally advances the channel by signing and
/// proposing the producer's current balance tree.
pub async fn tick<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<TickStatus, Error> {
    let (balances, _new_accounting) = producer::tick(iface, true).await?;

    let our_latest_new_state = match iface.get_our_latest_msg(&["NewState"]).await? {
        Some(MessageTypes::NewState(new_state)) => Some(new_state),
        _ => None,
    };

    let already_proposed = match our_latest_new_state {
        Some(new_state) => new_state.balances == balances,
        None => false,
    };

    let new_state = if !balances.is_empty() && !already_proposed {
        Some(on_new_state(iface, &balances).await?)
    } else {
        None
    };

    Ok(TickStatus {
        heartbeat: heartbeat(iface, &balances).await?,
        new_state,
    })
}

async fn on_new_state<A: Adapter + 'static>(
    iface: &SentryApi<A>,
    balances: &BalancesMap,
) -> Result<Vec<PropagationResult>, Error> {
    let balances_after_fees = get_balances_after_fees_tree(balances, &iface.channel)?;
    let state_root = get_state_root_hash(&iface.channel, &balances_after_fees)?;
    let signature = iface.adapter.sign(&state_root)?;

    info!(
        iface.logger,
        "channel {}: proposing NewState", iface.channel.id;
        "stateRoot" => %state_root,
    );

    Ok(iface
        .persist_and_propagate(&[&MessageTypes::NewState(NewState {
            state_root,
            signature,
            balances: balances.clone(),
            balances_after_fees,
        })])
        .await?)
}
