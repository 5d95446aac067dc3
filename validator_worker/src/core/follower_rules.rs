use primitives::{BalancesMap, BigNum, Channel};

/// OUTPACE transition rules between the previously approved tree and
/// the newly proposed one: the total never shrinks, never exceeds the
/// deposit, and no single balance ever decreases or disappears.
pub fn is_valid_transition(channel: &Channel, prev: &BalancesMap, next: &BalancesMap) -> bool {
    let sum_prev: BigNum = prev.values().sum();
    let sum_next: BigNum = next.values().sum();

    let prev_checks = prev.iter().all(|(acc, bal)| match next.get(acc) {
        Some(next_bal) => next_bal >= bal,
        None => false,
    });

    // unsigned big integers cannot go negative, so rule #4 is structural
    sum_next >= sum_prev && sum_next <= channel.deposit_amount && prev_checks
}

/// Compares our own accounting view against the tree the leader proposes.
///
/// The approved promilles are `sum_k(min(our[k], approved[k])) * 1000`
/// over `sum(our)`; the channel is healthy when they reach the
/// configured threshold. An empty view is trivially healthy.
pub fn is_healthy(
    our: &BalancesMap,
    approved: &BalancesMap,
    health_threshold_promilles: u64,
) -> bool {
    let sum_our: BigNum = our.values().sum();

    if sum_our == 0.into() {
        return true;
    }

    let zero = BigNum::from(0);
    let sum_of_mins: BigNum = our
        .iter()
        .map(|(acc, val)| val.min(approved.get(acc).unwrap_or(&zero)))
        .sum();

    if sum_of_mins >= sum_our {
        return true;
    }

    &sum_of_mins * &BigNum::from(1_000) / &sum_our >= health_threshold_promilles.into()
}
