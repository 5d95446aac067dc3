use chrono::Utc;
use num::CheckedSub;

use crate::{
    channel::{Channel, ChannelError},
    config::Config,
    BigNum, SpecValidators, ValidatorId,
};

pub trait ChannelValidator {
    fn is_channel_valid(
        config: &Config,
        whoami: &ValidatorId,
        channel: &Channel,
    ) -> Result<(), ChannelError> {
        let adapter_channel_validator = match channel.spec.validators.find(whoami) {
            Some(spec_validator) => spec_validator.validator().clone(),
            None => return Err(ChannelError::AdapterNotIncluded),
        };

        if channel.valid_until < Utc::now() {
            return Err(ChannelError::PassedValidUntil);
        }

        if !all_validators_listed(&channel.spec.validators, &config.validators_whitelist) {
            return Err(ChannelError::UnlistedValidator);
        }

        if !creator_listed(channel, &config.creators_whitelist) {
            return Err(ChannelError::UnlistedCreator);
        }

        if !asset_listed(channel, &config.token_address_whitelist) {
            return Err(ChannelError::UnlistedAsset);
        }

        if channel.deposit_amount < config.minimal_deposit {
            return Err(ChannelError::MinimumDepositNotMet);
        }

        if adapter_channel_validator.fee < config.minimal_fee {
            return Err(ChannelError::MinimumValidatorFeeNotMet);
        }

        let total_fee: BigNum = channel
            .spec
            .validators
            .iter()
            .map(|validator| &validator.fee)
            .sum();

        if channel.deposit_amount.checked_sub(&total_fee).is_none() {
            return Err(ChannelError::FeeConstraintViolated);
        }

        Ok(())
    }
}

pub fn all_validators_listed(validators: &SpecValidators, whitelist: &[ValidatorId]) -> bool {
    if whitelist.is_empty() {
        true
    } else {
        let found_validators = whitelist
            .iter()
            .filter(|&allowed| {
                allowed == &validators.leader().id || allowed == &validators.follower().id
            })
            // after both validators are found there is no point in going
            // through the rest of the whitelist
            .take(2);

        found_validators.count() == 2
    }
}

pub fn creator_listed(channel: &Channel, whitelist: &[ValidatorId]) -> bool {
    // an empty whitelist means there is nothing to restrict us to
    whitelist.is_empty() || whitelist.iter().any(|allowed| allowed == &channel.creator)
}

pub fn asset_listed(channel: &Channel, whitelist: &[String]) -> bool {
    whitelist.is_empty()
        || whitelist
            .iter()
            .any(|allowed| allowed == &channel.deposit_asset)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::tests::prep_db::{DUMMY_CHANNEL, IDS};
    use chrono::{Duration, Utc};

    struct TestValidator;
    impl ChannelValidator for TestValidator {}

    fn test_config() -> Config {
        crate::config::configuration("development", None).expect("should load dev config")
    }

    #[test]
    fn disallows_channels_we_do_not_validate() {
        let channel = DUMMY_CHANNEL.clone();

        assert_eq!(
            Err(ChannelError::AdapterNotIncluded),
            TestValidator::is_channel_valid(&test_config(), &IDS["user"], &channel)
        );
    }

    #[test]
    fn disallows_channels_with_passed_valid_until() {
        let mut channel = DUMMY_CHANNEL.clone();
        channel.valid_until = Utc::now() - Duration::seconds(5);

        assert_eq!(
            Err(ChannelError::PassedValidUntil),
            TestValidator::is_channel_valid(&test_config(), &IDS["leader"], &channel)
        );
    }

    #[test]
    fn disallows_fees_exceeding_the_deposit() {
        let mut channel = DUMMY_CHANNEL.clone();
        channel.deposit_amount = 199.into();

        // the dummy validators carry a fee of 100 each
        assert_eq!(
            Err(ChannelError::FeeConstraintViolated),
            TestValidator::is_channel_valid(&test_config(), &IDS["leader"], &channel)
        );
    }

    #[test]
    fn allows_a_sane_channel_for_both_validators() {
        let channel = DUMMY_CHANNEL.clone();

        assert!(TestValidator::is_channel_valid(&test_config(), &IDS["leader"], &channel).is_ok());
        assert!(
            TestValidator::is_channel_valid(&test_config(), &IDS["follower"], &channel).is_ok()
        );
    }
}
