use chrono::Utc;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use adapter::DummyAdapter;
use primitives::{
    adapter::{Adapter, DummyAdapterOptions},
    sentry::{
        EventAggregate, EventAggregateResponse, LastApproved, LastApprovedResponse,
        SuccessResponse, ValidatorMessage, ValidatorMessageResponse,
        ValidatorMessagesCreateRequest,
    },
    util::tests::{discard_logger, prep_db::{AUTH, DUMMY_CHANNEL}},
    validator::MessageTypes,
    Channel, Config, ValidatorId,
};

use crate::SentryApi;

pub fn test_config() -> Config {
    primitives::config::DEVELOPMENT_CONFIG.clone()
}

/// The dummy channel re-pointed at the mock server: the leader sentry
/// lives under `/leader`, the follower one under `/follower`.
pub fn mocked_channel(server: &MockServer) -> Channel {
    let mut channel = DUMMY_CHANNEL.clone();

    let mut leader = channel.spec.validators.leader().clone();
    leader.url = format!("{}/leader", server.uri());

    let mut follower = channel.spec.validators.follower().clone();
    follower.url = format!("{}/follower", server.uri());

    channel.spec.validators = (leader, follower).into();

    channel
}

/// Same as [`mocked_channel`], with validator fees zeroed out so balance
/// trees pass through `get_balances_after_fees_tree` unchanged.
pub fn mocked_channel_zero_fees(server: &MockServer) -> Channel {
    let mut channel = mocked_channel(server);

    let mut leader = channel.spec.validators.leader().clone();
    leader.fee = 0.into();

    let mut follower = channel.spec.validators.follower().clone();
    follower.fee = 0.into();

    channel.spec.validators = (leader, follower).into();

    channel
}

pub fn setup_iface(
    identity: &ValidatorId,
    channel: Channel,
    config: &Config,
) -> SentryApi<DummyAdapter> {
    let adapter = DummyAdapter::init(
        DummyAdapterOptions {
            dummy_identity: identity.clone(),
            dummy_auth_tokens: AUTH.clone(),
        },
        config,
    )
    .expect("should init the dummy adapter");

    SentryApi::init(adapter, channel, config, discard_logger()).expect("should init SentryApi")
}

/// Mounts the latest-message endpoint for `{from}/{types}` under the
/// given sentry prefix, returning the messages newest first.
pub async fn mock_latest_messages(
    server: &MockServer,
    prefix: &str,
    channel: &Channel,
    from: &ValidatorId,
    types: &str,
    messages: Vec<MessageTypes>,
) {
    let validator_messages: Vec<ValidatorMessage> = messages
        .into_iter()
        .map(|msg| ValidatorMessage {
            from: from.clone(),
            received: Utc::now(),
            msg,
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!(
            "/{}/channel/{}/validator-messages/{}/{}",
            prefix, channel.id, from, types
        )))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ValidatorMessageResponse { validator_messages }),
        )
        .mount(server)
        .await;
}

pub async fn mock_event_aggregates(
    server: &MockServer,
    prefix: &str,
    channel: &Channel,
    events: Vec<EventAggregate>,
) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/{}/channel/{}/events-aggregates",
            prefix, channel.id
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(EventAggregateResponse {
            channel: channel.clone(),
            events,
        }))
        .mount(server)
        .await;
}

pub async fn mock_last_approved(
    server: &MockServer,
    prefix: &str,
    channel: &Channel,
    last_approved: Option<LastApproved>,
) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/channel/{}/last-approved", prefix, channel.id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(LastApprovedResponse { last_approved }),
        )
        .mount(server)
        .await;
}

/// Accepts `POST /validator-messages` on the given sentry prefix.
pub async fn mock_accept_messages(server: &MockServer, prefix: &str, channel: &Channel) {
    Mock::given(method("POST"))
        .and(path(format!(
            "/{}/channel/{}/validator-messages",
            prefix, channel.id
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(SuccessResponse { success: true }))
        .mount(server)
        .await;
}

/// Every message POSTed so far to the given sentry prefix, in order.
pub async fn posted_messages(
    server: &MockServer,
    prefix: &str,
    channel: &Channel,
) -> Vec<MessageTypes> {
    let expected_path = format!("/{}/channel/{}/validator-messages", prefix, channel.id);

    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| {
            request.method == wiremock::http::Method::POST
                && request.url.path() == expected_path
        })
        .flat_map(|request| {
            serde_json::from_slice::<ValidatorMessagesCreateRequest>(&request.body)
                .expect("posted body should be a messages request")
                .messages
        })
        .collect()
}
