use num::rational::Ratio;
use num_traits::CheckedSub;

use primitives::{BalancesMap, BigNum, Channel, DomainError, ValidatorDesc};

/// Redistributes the validators' fees out of the given balance tree.
///
/// Publisher entries are scaled down by `(deposit - totalFees) / deposit`
/// and the validators are credited their fee prorated by how much of the
/// deposit has been distributed. All divisions floor; whatever residue
/// the flooring produces is credited to the leader, so that
/// `sum(output) == sum(input)` holds exactly.
pub fn get_balances_after_fees_tree(
    balances: &BalancesMap,
    channel: &Channel,
) -> Result<BalancesMap, DomainError> {
    let deposit_amount = channel.deposit_amount.clone();

    // nothing can have been distributed on a zero deposit
    if deposit_amount == 0.into() {
        return Ok(balances.clone());
    }

    let total_distributed: BigNum = balances.iter().map(|(_, balance)| balance).sum();

    let total_validators_fee: BigNum = channel
        .spec
        .validators
        .iter()
        .map(|validator| &validator.fee)
        .sum();

    if total_validators_fee > deposit_amount {
        return Err(DomainError::RuleViolation(
            "total fees <= deposit: fee constraint violated".into(),
        ));
    }

    if total_distributed > deposit_amount {
        return Err(DomainError::RuleViolation(
            "distributed <= deposit: OUTPACE rule #4".into(),
        ));
    }

    let deposit_to_distribute = &deposit_amount - &total_validators_fee;

    let ratio = Ratio::new(deposit_to_distribute, deposit_amount.clone());
    let fee_ratio = Ratio::new(total_distributed.clone(), deposit_amount);

    let mut balances_after_fees = BalancesMap::default();
    let mut total = BigNum::from(0);

    for (key, value) in balances.iter() {
        let adjusted_balance = value * &ratio;

        total += &adjusted_balance;
        balances_after_fees.insert(key.clone(), adjusted_balance);
    }

    let follower_fee = &channel.spec.validators.follower().fee * &fee_ratio;

    // the leader fee is everything not yet accounted for, i.e. its own
    // prorated fee plus every unit the floor divisions dropped
    let leader_fee = total_distributed
        .checked_sub(&total)
        .and_then(|rest| rest.checked_sub(&follower_fee))
        .ok_or_else(|| {
            DomainError::RuleViolation("the leader fee should never be negative".to_string())
        })?;

    credit_fee(
        &mut balances_after_fees,
        channel.spec.validators.follower(),
        follower_fee,
    );
    credit_fee(
        &mut balances_after_fees,
        channel.spec.validators.leader(),
        leader_fee,
    );

    Ok(balances_after_fees)
}

fn credit_fee(balances: &mut BalancesMap, validator: &ValidatorDesc, fee: BigNum) {
    if fee > 0.into() {
        let addr = validator.fee_addr.as_ref().unwrap_or(&validator.id);
        let entry = balances.entry(addr.clone()).or_insert_with(|| 0.into());

        *entry += &fee;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use primitives::util::tests::prep_db::{
        DUMMY_CHANNEL, DUMMY_VALIDATOR_FOLLOWER, DUMMY_VALIDATOR_LEADER, IDS,
    };

    fn channel_with_fees<F: Into<BigNum> + Copy>(deposit: u64, fee: F) -> Channel {
        let leader = ValidatorDesc {
            fee: fee.into(),
            ..DUMMY_VALIDATOR_LEADER.clone()
        };
        let follower = ValidatorDesc {
            fee: fee.into(),
            ..DUMMY_VALIDATOR_FOLLOWER.clone()
        };

        let mut channel = DUMMY_CHANNEL.clone();
        channel.deposit_amount = deposit.into();
        channel.spec.validators = (leader, follower).into();

        channel
    }

    fn sum(balances: &BalancesMap) -> BigNum {
        balances.values().sum()
    }

    mod with_zero_fees_the_tree_stays_the_same {
        use super::*;
        use pretty_assertions::assert_eq;

        fn apply(balances_map: &BalancesMap) -> BalancesMap {
            get_balances_after_fees_tree(balances_map, &channel_with_fees(100_000, 0u64))
                .expect("fee calculation failed")
        }

        #[test]
        fn case_1_three_values() {
            let balances_map: BalancesMap = vec![
                (IDS["publisher"].clone(), 1001.into()),
                (IDS["publisher2"].clone(), 3124.into()),
                (IDS["tester"].clone(), 122.into()),
            ]
            .into_iter()
            .collect();

            assert_eq!(apply(&balances_map), balances_map);
        }

        #[test]
        fn case_2_one_value() {
            let balances_map: BalancesMap = vec![(IDS["publisher"].clone(), BigNum::from(1))]
                .into_iter()
                .collect();

            assert_eq!(apply(&balances_map), balances_map);
        }

        #[test]
        fn case_3_two_values() {
            let balances_map: BalancesMap = vec![
                (IDS["publisher"].clone(), 1.into()),
                (IDS["publisher2"].clone(), 99_999.into()),
            ]
            .into_iter()
            .collect();

            assert_eq!(apply(&balances_map), balances_map);
        }
    }

    mod with_fees_the_sum_is_preserved_exactly {
        use super::*;
        use pretty_assertions::assert_eq;

        fn apply(balances_map: &BalancesMap) -> BalancesMap {
            // deposit: 10 000, total fees: 100
            get_balances_after_fees_tree(balances_map, &channel_with_fees(10_000, 50u64))
                .expect("fee calculation failed")
        }

        #[test]
        fn case_1_partially_distributed() {
            let balances_map: BalancesMap = vec![
                (IDS["publisher"].clone(), 1_000.into()),
                (IDS["publisher2"].clone(), 1_200.into()),
            ]
            .into_iter()
            .collect();

            let expected: BalancesMap = vec![
                (IDS["publisher"].clone(), 990.into()),
                (IDS["publisher2"].clone(), 1_188.into()),
                (IDS["leader"].clone(), 11.into()),
                (IDS["follower"].clone(), 11.into()),
            ]
            .into_iter()
            .collect();

            let after_fees = apply(&balances_map);

            assert_eq!(sum(&balances_map), sum(&after_fees));
            assert_eq!(expected, after_fees);
        }

        #[test]
        fn case_2_with_a_validator_in_the_input_tree() {
            let balances_map: BalancesMap = vec![
                (IDS["publisher"].clone(), 100.into()),
                (IDS["publisher2"].clone(), 2_000.into()),
                (IDS["leader"].clone(), 200.into()),
            ]
            .into_iter()
            .collect();

            let expected: BalancesMap = vec![
                (IDS["publisher"].clone(), 99.into()),
                (IDS["publisher2"].clone(), 1_980.into()),
                // 198 own adjusted balance + 11 fee + 1 residue from
                // flooring the follower fee
                (IDS["leader"].clone(), 210.into()),
                (IDS["follower"].clone(), 11.into()),
            ]
            .into_iter()
            .collect();

            let after_fees = apply(&balances_map);

            assert_eq!(sum(&balances_map), sum(&after_fees));
            assert_eq!(expected, after_fees);
        }

        #[test]
        fn case_3_fully_distributed_rounding_residue_goes_to_the_leader() {
            let balances_map: BalancesMap = vec![
                (IDS["publisher"].clone(), 105.into()),
                (IDS["publisher2"].clone(), 195.into()),
                (IDS["tester"].clone(), 700.into()),
                (IDS["user"].clone(), 5_000.into()),
                (IDS["creator"].clone(), 4_000.into()),
            ]
            .into_iter()
            .collect();

            let expected: BalancesMap = vec![
                (IDS["publisher"].clone(), 103.into()),
                (IDS["publisher2"].clone(), 193.into()),
                (IDS["tester"].clone(), 693.into()),
                (IDS["user"].clone(), 4_950.into()),
                (IDS["creator"].clone(), 3_960.into()),
                // 50 prorated fee + 1 rounding residue
                (IDS["leader"].clone(), 51.into()),
                (IDS["follower"].clone(), 50.into()),
            ]
            .into_iter()
            .collect();

            let after_fees = apply(&balances_map);

            assert_eq!(sum(&balances_map), sum(&after_fees));
            assert_eq!(expected, after_fees);
        }

        #[test]
        fn case_4_inexact_division_loses_nothing() {
            // deposit 1000, fees 100 + 100: a tree of {publisher: 3}
            // floors the publisher to 2 and the leader picks up the unit
            let channel = channel_with_fees(1_000, 100u64);
            let balances_map: BalancesMap = vec![(IDS["publisher"].clone(), 3.into())]
                .into_iter()
                .collect();

            let expected: BalancesMap = vec![
                (IDS["publisher"].clone(), 2.into()),
                (IDS["leader"].clone(), 1.into()),
            ]
            .into_iter()
            .collect();

            let after_fees =
                get_balances_after_fees_tree(&balances_map, &channel).expect("should compute");

            assert_eq!(sum(&balances_map), sum(&after_fees));
            assert_eq!(expected, after_fees);
        }
    }

    #[test]
    fn errors_when_fees_are_larger_than_the_deposit() {
        let balances_map: BalancesMap = vec![
            (IDS["publisher"].clone(), 10.into()),
            (IDS["publisher2"].clone(), 10.into()),
        ]
        .into_iter()
        .collect();

        let channel = channel_with_fees(1_000, 600u64);

        let domain_error = get_balances_after_fees_tree(&balances_map, &channel)
            .expect_err("fees exceeding the deposit must be rejected");

        assert_eq!(
            DomainError::RuleViolation(
                "total fees <= deposit: fee constraint violated".to_string()
            ),
            domain_error
        );
    }

    #[test]
    fn errors_when_the_tree_exceeds_the_deposit() {
        let balances_map: BalancesMap = vec![(IDS["publisher"].clone(), 10_001.into())]
            .into_iter()
            .collect();

        let channel = channel_with_fees(10_000, 50u64);

        assert!(get_balances_after_fees_tree(&balances_map, &channel).is_err());
    }
}
