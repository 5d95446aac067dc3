use num_traits::CheckedSub;

use primitives::{
    sentry::{AggregateEvents, EventAggregate},
    validator::Accounting,
    BalancesMap, BigNum, Channel, DomainError,
};

use crate::core::fees::get_balances_after_fees_tree;

/// Folds the given event aggregates into the accounting record.
///
/// Payouts are added with saturation against the channel deposit: once
/// `sum(balances) == depositAmount` any excess payout is dropped and the
/// channel is exhausted. Folding the same aggregates into the same
/// accounting twice yields the same record.
pub(crate) fn merge_aggrs(
    accounting: &Accounting,
    aggregates: &[EventAggregate],
    channel: &Channel,
) -> Result<Accounting, DomainError> {
    let deposit = channel.deposit_amount.clone();

    let last_event_aggregate = [accounting.last_event_aggregate]
        .iter()
        .chain(aggregates.iter().map(|aggr| &aggr.created))
        .max()
        .unwrap_or(&accounting.last_event_aggregate)
        .to_owned();

    let mut balances_before_fees = accounting.balances_before_fees.clone();

    for aggr in aggregates {
        balances_before_fees =
            merge_payouts_into_balances(&balances_before_fees, aggr.events.values(), &deposit)?;
    }

    let balances = get_balances_after_fees_tree(&balances_before_fees, channel)?;

    Ok(Accounting {
        last_event_aggregate,
        balances_before_fees,
        balances,
    })
}

fn merge_payouts_into_balances<'a, T: Iterator<Item = &'a AggregateEvents>>(
    balances: &BalancesMap,
    events: T,
    deposit: &BigNum,
) -> Result<BalancesMap, DomainError> {
    let mut new_balances = balances.clone();

    let total = balances.values().sum();
    let mut remaining = deposit.checked_sub(&total).ok_or_else(|| {
        DomainError::RuleViolation("remaining starts negative: total > depositAmount".to_string())
    })?;

    let all_payouts = events.flat_map(|aggr_ev| aggr_ev.event_payouts.iter());

    for (acc, payout) in all_payouts {
        let to_add = payout.min(&remaining).clone();

        let new_balance = new_balances.entry(acc.clone()).or_insert_with(|| 0.into());

        *new_balance += &to_add;

        remaining = remaining.checked_sub(&to_add).ok_or_else(|| {
            DomainError::RuleViolation("remaining must never be negative".to_string())
        })?;
    }

    Ok(new_balances)
}
