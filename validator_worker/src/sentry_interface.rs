use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use reqwest::Client;
use slog::{error, Logger};
use thiserror::Error;

use primitives::{
    adapter::{Adapter, AdapterError},
    sentry::{
        ChannelListResponse, EventAggregateResponse, LastApprovedResponse,
        ValidatorMessageResponse, ValidatorMessagesCreateRequest,
    },
    util::{api, ApiUrl},
    validator::MessageTypes,
    Channel, ChannelId, Config, ValidatorDesc, ValidatorId,
};

pub type PropagationResult = Result<ValidatorId, PropagationError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("propagating to {validator}: {message}")]
pub struct PropagationError {
    pub validator: ValidatorId,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("building client: {0}")]
    BuildingClient(reqwest::Error),
    #[error("making a request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("parsing a validator url: {0}")]
    ValidatorUrl(#[from] api::Error),
    #[error("building an endpoint url: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("adapter: {0}")]
    Adapter(#[from] AdapterError),
    #[error("whoami {whoami} is not a validator of channel {channel}")]
    ChannelNotIntendedForUs {
        whoami: ValidatorId,
        channel: ChannelId,
    },
}

/// A validator endpoint we talk to: its spec entry, parsed url and the
/// bearer token authenticating us against it.
#[derive(Clone)]
pub struct Validator {
    pub desc: ValidatorDesc,
    pub url: ApiUrl,
    pub token: String,
}

/// Per-channel view of the sentry REST API.
///
/// Reads go to our own sentry; writes are persisted to our own sentry
/// first and then propagated to the peer validator.
#[derive(Clone)]
pub struct SentryApi<A: Adapter> {
    pub adapter: A,
    pub client: Client,
    pub logger: Logger,
    pub channel: Channel,
    pub config: Config,
    pub whoami: Validator,
    propagate_to: Vec<Validator>,
}

impl<A: Adapter + 'static> SentryApi<A> {
    pub fn init(
        adapter: A,
        channel: Channel,
        config: &Config,
        logger: Logger,
    ) -> Result<Self, Error> {
        let whoami_id = adapter.whoami().clone();

        let own_desc = match channel.spec.validators.find(&whoami_id) {
            Some(spec_validator) => spec_validator.validator().clone(),
            None => {
                return Err(Error::ChannelNotIntendedForUs {
                    whoami: whoami_id,
                    channel: channel.id,
                })
            }
        };

        let to_validator = |desc: &ValidatorDesc| -> Result<Validator, Error> {
            Ok(Validator {
                url: desc.url.parse()?,
                token: adapter.get_auth(&desc.id)?,
                desc: desc.clone(),
            })
        };

        let whoami = to_validator(&own_desc)?;
        let propagate_to = channel
            .spec
            .validators
            .iter()
            .filter(|validator| validator.id != whoami_id)
            .map(to_validator)
            .collect::<Result<Vec<_>, _>>()?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout.into()))
            .build()
            .map_err(Error::BuildingClient)?;

        Ok(Self {
            adapter,
            client,
            logger,
            channel,
            config: config.clone(),
            whoami,
            propagate_to,
        })
    }

    /// The newest message of one of the given types from the given
    /// validator, by the sentry's insertion order.
    pub async fn get_latest_msg(
        &self,
        from: &ValidatorId,
        message_types: &[&str],
    ) -> Result<Option<MessageTypes>, Error> {
        let url = self.whoami.url.join(&format!(
            "channel/{}/validator-messages/{}/{}?limit=1",
            self.channel.id,
            from,
            message_types.join("+")
        ))?;

        let response: ValidatorMessageResponse = self.client.get(url).send().await?.json().await?;

        Ok(response
            .validator_messages
            .into_iter()
            .next()
            .map(|message| message.msg))
    }

    pub async fn get_our_latest_msg(
        &self,
        message_types: &[&str],
    ) -> Result<Option<MessageTypes>, Error> {
        let whoami = self.adapter.whoami().clone();
        self.get_latest_msg(&whoami, message_types).await
    }

    pub async fn get_last_approved(&self) -> Result<LastApprovedResponse, Error> {
        let url = self
            .whoami
            .url
            .join(&format!("channel/{}/last-approved", self.channel.id))?;

        Ok(self.client.get(url).send().await?.json().await?)
    }

    /// Event aggregates created after the given cursor, in cursor order.
    pub async fn get_event_aggregates(
        &self,
        after: DateTime<Utc>,
    ) -> Result<EventAggregateResponse, Error> {
        let url = self.whoami.url.join(&format!(
            "channel/{}/events-aggregates?after={}",
            self.channel.id,
            after.timestamp_millis()
        ))?;

        Ok(self
            .client
            .get(url)
            .bearer_auth(&self.whoami.token)
            .send()
            .await?
            .json()
            .await?)
    }

    /// Writes the messages to our own sentry. Must succeed before any
    /// propagation to the peer is attempted.
    pub async fn persist(&self, messages: &[&MessageTypes]) -> Result<(), Error> {
        let url = self
            .whoami
            .url
            .join(&format!("channel/{}/validator-messages", self.channel.id))?;

        let body = ValidatorMessagesCreateRequest {
            messages: messages.iter().map(|&message| message.clone()).collect(),
        };

        self.client
            .post(url)
            .bearer_auth(&self.whoami.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Posts the messages to every peer validator. Per-peer failures are
    /// logged and returned, never raised - the local persist stands.
    pub async fn propagate(&self, messages: &[&MessageTypes]) -> Vec<PropagationResult> {
        join_all(
            self.propagate_to
                .iter()
                .map(|validator| self.propagate_to_validator(validator, messages)),
        )
        .await
    }

    pub async fn persist_and_propagate(
        &self,
        messages: &[&MessageTypes],
    ) -> Result<Vec<PropagationResult>, Error> {
        self.persist(messages).await?;

        Ok(self.propagate(messages).await)
    }

    async fn propagate_to_validator(
        &self,
        validator: &Validator,
        messages: &[&MessageTypes],
    ) -> PropagationResult {
        let attempt = async {
            let url = validator
                .url
                .join(&format!("channel/{}/validator-messages", self.channel.id))?;

            let body = ValidatorMessagesCreateRequest {
                messages: messages.iter().map(|&message| message.clone()).collect(),
            };

            self.client
                .post(url)
                .bearer_auth(&validator.token)
                .timeout(Duration::from_millis(self.config.propagation_timeout.into()))
                .json(&body)
                .send()
                .await?
                .error_for_status()?;

            Ok::<(), Error>(())
        };

        match attempt.await {
            Ok(()) => Ok(validator.desc.id.clone()),
            Err(err) => {
                error!(
                    self.logger,
                    "propagating a validator message failed";
                    "channelId" => %self.channel.id,
                    "validator" => %validator.desc.id,
                    "error" => %err,
                );

                Err(PropagationError {
                    validator: validator.desc.id.clone(),
                    message: err.to_string(),
                })
            }
        }
    }
}

/// Lists every channel on the sentry which has `whoami` as one of its
/// validators, walking all pages.
pub async fn all_channels(
    sentry_url: &ApiUrl,
    whoami: &ValidatorId,
    config: &Config,
) -> Result<Vec<Channel>, Error> {
    let client = Client::builder()
        .timeout(Duration::from_millis(config.list_timeout.into()))
        .build()
        .map_err(Error::BuildingClient)?;

    let first_page = fetch_page(&client, sentry_url, 1, whoami).await?;

    if first_page.pagination.total_pages < 2 {
        return Ok(first_page.channels);
    }

    let other_pages = try_join_all(
        (2..=first_page.pagination.total_pages)
            .map(|page| fetch_page(&client, sentry_url, page, whoami)),
    )
    .await?;

    Ok(first_page
        .channels
        .into_iter()
        .chain(
            other_pages
                .into_iter()
                .flat_map(|response| response.channels),
        )
        .collect())
}

async fn fetch_page(
    client: &Client,
    sentry_url: &ApiUrl,
    page: u64,
    validator: &ValidatorId,
) -> Result<ChannelListResponse, Error> {
    let url = sentry_url.join(&format!("channel/list?page={}&validator={}", page, validator))?;

    Ok(client.get(url).send().await?.json().await?)
}
