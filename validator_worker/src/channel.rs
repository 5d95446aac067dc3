use std::time::Duration;

use slog::{info, Logger};
use tokio::time::timeout;

use primitives::{
    adapter::Adapter,
    channel::SpecValidator,
    Channel, ChannelId, Config,
};

use crate::{
    error::{Error, TickError},
    follower::{self, ApproveStateResult},
    leader,
    sentry_interface::SentryApi,
};

/// Runs a single tick of one channel, as leader or follower depending on
/// where our identity sits in the validator pair. The tick is bounded by
/// `validator_tick_timeout`; a timed out channel is retried next cycle.
pub async fn channel_tick<A: Adapter + 'static>(
    adapter: A,
    config: &Config,
    logger: &Logger,
    channel: Channel,
) -> Result<ChannelId, Error> {
    let channel_id = channel.id;
    let whoami = adapter.whoami().clone();

    A::is_channel_valid(config, &whoami, &channel)
        .map_err(|err| Error::InvalidChannel(channel_id, err))?;

    let iface = SentryApi::init(adapter, channel.clone(), config, logger.clone())?;
    let tick_timeout = Duration::from_millis(config.validator_tick_timeout.into());

    match channel.spec.validators.find(&whoami) {
        Some(SpecValidator::Leader(_)) => {
            let status = timeout(tick_timeout, leader::tick(&iface))
                .await
                .map_err(|elapsed| Error::LeaderTick(channel_id, TickError::TimedOut(elapsed)))?
                .map_err(|err| Error::LeaderTick(channel_id, TickError::Tick(Box::new(err))))?;

            if status.new_state.is_some() {
                info!(logger, "channel {}: NewState proposed", channel_id);
            }
        }
        Some(SpecValidator::Follower(_)) => {
            let status = timeout(tick_timeout, follower::tick(&iface))
                .await
                .map_err(|elapsed| Error::FollowerTick(channel_id, TickError::TimedOut(elapsed)))?
                .map_err(|err| Error::FollowerTick(channel_id, TickError::Tick(Box::new(err))))?;

            match &status.approve_state {
                ApproveStateResult::Sent(Some(_)) => {
                    info!(logger, "channel {}: ApproveState sent", channel_id);
                }
                ApproveStateResult::Sent(None) => {}
                ApproveStateResult::RejectedState { reason, state_root, .. } => {
                    info!(
                        logger,
                        "channel {}: NewState rejected", channel_id;
                        "reason" => %reason,
                        "stateRoot" => %state_root,
                    );
                }
            }
        }
        None => return Err(Error::ChannelNotIntendedForUs(channel_id)),
    }

    Ok(channel_id)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::*;
    use adapter::DummyAdapter;
    use primitives::{
        adapter::DummyAdapterOptions,
        util::tests::{discard_logger, prep_db::{AUTH, IDS}},
    };
    use wiremock::{
        matchers::{method, path_regex},
        Mock, MockServer, ResponseTemplate,
    };

    fn dummy_adapter(identity: &primitives::ValidatorId) -> DummyAdapter {
        DummyAdapter::init(
            DummyAdapterOptions {
                dummy_identity: identity.clone(),
                dummy_auth_tokens: AUTH.clone(),
            },
            &test_config(),
        )
        .expect("should init")
    }

    #[tokio::test]
    async fn a_channel_we_do_not_validate_is_an_error() {
        let server = MockServer::start().await;
        let channel = mocked_channel_zero_fees(&server);

        let result = channel_tick(
            dummy_adapter(&IDS["user"]),
            &test_config(),
            &discard_logger(),
            channel,
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidChannel(..))));
    }

    #[tokio::test]
    async fn a_slow_sentry_times_the_tick_out() {
        let server = MockServer::start().await;
        let channel = mocked_channel_zero_fees(&server);

        // every endpoint is slower than the tick timeout
        Mock::given(method("GET"))
            .and(path_regex(".*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"validatorMessages": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut config = test_config();
        config.validator_tick_timeout = 100;

        let result = channel_tick(
            dummy_adapter(&IDS["leader"]),
            &config,
            &discard_logger(),
            channel,
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::LeaderTick(_, TickError::TimedOut(_)))
        ));
    }
}
