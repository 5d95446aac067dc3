use byteorder::{BigEndian, ByteOrder};
use chrono::{Duration, Utc};

use adapter::get_signable_state_root;
use merkle_tree::MerkleTree;
use primitives::{
    adapter::Adapter,
    validator::{Heartbeat, MessageTypes},
    BalancesMap, BigNum, Channel,
};

use crate::{
    error::Error,
    sentry_interface::{PropagationResult, SentryApi},
};

pub type HeartbeatStatus = Option<Vec<PropagationResult>>;

/// Emits a Heartbeat if the last one is older than `heartbeat_time` and
/// the channel still has something left to distribute. Heartbeats are
/// how liveness is observed from the outside.
pub async fn heartbeat<A: Adapter + 'static>(
    iface: &SentryApi<A>,
    balances: &BalancesMap,
) -> Result<HeartbeatStatus, Error> {
    let heartbeat_msg = match iface.get_our_latest_msg(&["Heartbeat"]).await? {
        Some(MessageTypes::Heartbeat(heartbeat)) => Some(heartbeat),
        _ => None,
    };

    let should_send = match heartbeat_msg {
        Some(heartbeat) => {
            let silence = Utc::now() - heartbeat.timestamp;
            silence > Duration::milliseconds(iface.config.heartbeat_time.into())
                && !is_channel_exhausted(&iface.channel, balances)
        }
        None => true,
    };

    if should_send {
        Ok(Some(send_heartbeat(iface).await?))
    } else {
        Ok(None)
    }
}

async fn send_heartbeat<A: Adapter + 'static>(
    iface: &SentryApi<A>,
) -> Result<Vec<PropagationResult>, Error> {
    let mut timestamp_buf = [0_u8; 32];
    let milliseconds: u64 = u64::try_from(Utc::now().timestamp_millis())
        .expect("The timestamp should be able to be converted to u64");
    BigEndian::write_uint(&mut timestamp_buf[26..], milliseconds, 6);

    let merkle_tree = MerkleTree::new(&[timestamp_buf]);

    let state_root = hex::encode(get_signable_state_root(
        iface.channel.id.as_ref(),
        &merkle_tree.root(),
    ));

    let signature = iface.adapter.sign(&state_root)?;

    iface
        .persist_and_propagate(&[&MessageTypes::Heartbeat(Heartbeat {
            signature,
            state_root,
            timestamp: Utc::now(),
        })])
        .await
        .map_err(Error::from)
}

fn is_channel_exhausted(channel: &Channel, balances: &BalancesMap) -> bool {
    balances.values().sum::<BigNum>() == channel.deposit_amount
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::*;
    use primitives::util::tests::prep_db::IDS;
    use wiremock::MockServer;

    #[tokio::test]
    async fn sends_a_heartbeat_when_none_was_ever_sent() {
        let server = MockServer::start().await;
        let config = test_config();
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        mock_latest_messages(&server, "leader", &channel, &IDS["leader"], "Heartbeat", vec![])
            .await;
        mock_accept_messages(&server, "leader", &channel).await;
        mock_accept_messages(&server, "follower", &channel).await;

        let status = heartbeat(&iface, &BalancesMap::default())
            .await
            .expect("heartbeat should pass");

        assert!(status.is_some(), "a heartbeat was sent");

        let heartbeat_msg = posted_messages(&server, "leader", &channel)
            .await
            .into_iter()
            .find_map(|msg| match msg {
                MessageTypes::Heartbeat(heartbeat) => Some(heartbeat),
                _ => None,
            })
            .expect("a heartbeat should be persisted");

        assert_eq!(64, heartbeat_msg.state_root.len());
        assert_eq!(
            format!(
                "Dummy adapter signature for {} by awesomeLeader",
                heartbeat_msg.state_root
            ),
            heartbeat_msg.signature
        );
    }

    #[tokio::test]
    async fn keeps_quiet_while_the_last_heartbeat_is_fresh() {
        let server = MockServer::start().await;
        let config = test_config();
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        let fresh = Heartbeat {
            signature: "sig".to_string(),
            state_root: "root".to_string(),
            timestamp: Utc::now(),
        };
        mock_latest_messages(
            &server,
            "leader",
            &channel,
            &IDS["leader"],
            "Heartbeat",
            vec![MessageTypes::Heartbeat(fresh)],
        )
        .await;

        let status = heartbeat(&iface, &BalancesMap::default())
            .await
            .expect("heartbeat should pass");

        assert!(status.is_none(), "no heartbeat needed yet");
        assert!(posted_messages(&server, "leader", &channel).await.is_empty());
    }

    #[tokio::test]
    async fn an_exhausted_channel_stops_heartbeating() {
        let server = MockServer::start().await;
        let config = test_config();
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        // the deposit of the dummy channel is fully distributed
        let exhausted: BalancesMap = vec![(IDS["publisher"].clone(), 1_000.into())]
            .into_iter()
            .collect();

        let stale = Heartbeat {
            signature: "sig".to_string(),
            state_root: "root".to_string(),
            timestamp: Utc::now() - Duration::days(1),
        };
        mock_latest_messages(
            &server,
            "leader",
            &channel,
            &IDS["leader"],
            "Heartbeat",
            vec![MessageTypes::Heartbeat(stale)],
        )
        .await;

        let status = heartbeat(&iface, &exhausted)
            .await
            .expect("heartbeat should pass");

        assert!(status.is_none(), "exhausted channels are silent");
    }
}
