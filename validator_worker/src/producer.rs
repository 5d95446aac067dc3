use chrono::{DateTime, Utc};
use slog::info;

use primitives::{
    adapter::Adapter,
    validator::{Accounting, MessageTypes},
    BalancesMap,
};

use crate::{core::events::merge_aggrs, error::Error, sentry_interface::SentryApi};

/// Folds the unconsumed event aggregates into the accounting record and
/// persists the new record to our own sentry.
///
/// Returns the current pre-fee balance tree and, when something changed,
/// the freshly persisted [`Accounting`]. With `force` set (the
/// leader-driven re-aggregation) the fold runs even on an empty
/// aggregate batch; an unchanged record is still reported as
/// "nothing new" and not persisted again.
pub async fn tick<A: Adapter + 'static>(
    iface: &SentryApi<A>,
    force: bool,
) -> Result<(BalancesMap, Option<Accounting>), Error> {
    let accounting = match iface.get_our_latest_msg(&["Accounting"]).await? {
        Some(MessageTypes::Accounting(accounting)) => accounting,
        _ => Accounting {
            last_event_aggregate: DateTime::<Utc>::UNIX_EPOCH,
            balances_before_fees: Default::default(),
            balances: Default::default(),
        },
    };

    let aggregates = iface
        .get_event_aggregates(accounting.last_event_aggregate)
        .await?;

    if aggregates.events.is_empty() && !force {
        return Ok((accounting.balances_before_fees, None));
    }

    let new_accounting = merge_aggrs(&accounting, &aggregates.events, &iface.channel)?;

    let unchanged = new_accounting.balances_before_fees == accounting.balances_before_fees
        && new_accounting.last_event_aggregate == accounting.last_event_aggregate;
    if unchanged {
        return Ok((new_accounting.balances_before_fees, None));
    }

    if new_accounting.balances.is_empty() {
        info!(
            iface.logger,
            "channel {}: empty Accounting balances, skipping persist", iface.channel.id
        );

        return Ok((new_accounting.balances_before_fees, None));
    }

    iface
        .persist(&[&MessageTypes::Accounting(new_accounting.clone())])
        .await?;

    info!(
        iface.logger,
        "channel {}: processed {} event aggregates",
        iface.channel.id,
        aggregates.events.len()
    );

    Ok((new_accounting.balances_before_fees.clone(), Some(new_accounting)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::*;
    use chrono::Utc;
    use primitives::{
        sentry::{AggregateEvents, EventAggregate},
        util::tests::prep_db::IDS,
        BigNum,
    };
    use wiremock::MockServer;

    fn impression_aggregate(channel_id: primitives::ChannelId, payout: u64) -> EventAggregate {
        EventAggregate {
            channel_id,
            created: Utc::now(),
            events: vec![(
                "IMPRESSION".to_string(),
                AggregateEvents {
                    event_counts: Some(
                        vec![(IDS["publisher"].clone(), 1.into())].into_iter().collect(),
                    ),
                    event_payouts: vec![(IDS["publisher"].clone(), payout.into())]
                        .into_iter()
                        .collect(),
                },
            )]
            .into_iter()
            .collect(),
        }
    }

    #[tokio::test]
    async fn folds_aggregates_and_persists_the_new_accounting() {
        let server = MockServer::start().await;
        let config = test_config();
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        mock_latest_messages(&server, "leader", &channel, &IDS["leader"], "Accounting", vec![])
            .await;
        mock_event_aggregates(
            &server,
            "leader",
            &channel,
            vec![impression_aggregate(channel.id, 10)],
        )
        .await;
        mock_accept_messages(&server, "leader", &channel).await;

        let (balances, new_accounting) = tick(&iface, false).await.expect("tick should pass");

        assert_eq!(Some(&BigNum::from(10)), balances.get(&IDS["publisher"]));
        let new_accounting = new_accounting.expect("should produce a new accounting");
        assert_eq!(balances, new_accounting.balances_before_fees);

        // exactly one Accounting was persisted to our own sentry
        let persisted = posted_messages(&server, "leader", &channel).await;
        assert_eq!(1, persisted.len());
        assert!(matches!(persisted[0], MessageTypes::Accounting(_)));
    }

    #[tokio::test]
    async fn no_new_aggregates_returns_the_current_tree() {
        let server = MockServer::start().await;
        let config = test_config();
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        let accounting = Accounting {
            last_event_aggregate: Utc::now(),
            balances_before_fees: vec![(IDS["publisher"].clone(), 3.into())]
                .into_iter()
                .collect(),
            balances: vec![(IDS["publisher"].clone(), 3.into())].into_iter().collect(),
        };

        mock_latest_messages(
            &server,
            "leader",
            &channel,
            &IDS["leader"],
            "Accounting",
            vec![MessageTypes::Accounting(accounting.clone())],
        )
        .await;
        mock_event_aggregates(&server, "leader", &channel, vec![]).await;

        let (balances, new_accounting) = tick(&iface, false).await.expect("tick should pass");

        assert_eq!(accounting.balances_before_fees, balances);
        assert!(new_accounting.is_none());
        assert!(posted_messages(&server, "leader", &channel).await.is_empty());
    }

    #[tokio::test]
    async fn forced_tick_with_nothing_new_does_not_persist_a_duplicate() {
        let server = MockServer::start().await;
        let config = test_config();
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        let accounting = Accounting {
            last_event_aggregate: Utc::now(),
            balances_before_fees: vec![(IDS["publisher"].clone(), 3.into())]
                .into_iter()
                .collect(),
            balances: vec![(IDS["publisher"].clone(), 3.into())].into_iter().collect(),
        };

        mock_latest_messages(
            &server,
            "leader",
            &channel,
            &IDS["leader"],
            "Accounting",
            vec![MessageTypes::Accounting(accounting)],
        )
        .await;
        mock_event_aggregates(&server, "leader", &channel, vec![]).await;

        let (_, new_accounting) = tick(&iface, true).await.expect("tick should pass");

        assert!(new_accounting.is_none());
        assert!(posted_messages(&server, "leader", &channel).await.is_empty());
    }

    #[tokio::test]
    async fn payouts_saturate_at_the_deposit() {
        let server = MockServer::start().await;
        let config = test_config();
        // deposit of the dummy channel is 1000
        let channel = mocked_channel_zero_fees(&server);
        let iface = setup_iface(&IDS["leader"], channel.clone(), &config);

        mock_latest_messages(&server, "leader", &channel, &IDS["leader"], "Accounting", vec![])
            .await;
        mock_event_aggregates(
            &server,
            "leader",
            &channel,
            vec![impression_aggregate(channel.id, 1_100)],
        )
        .await;
        mock_accept_messages(&server, "leader", &channel).await;

        let (balances, _) = tick(&iface, false).await.expect("tick should pass");

        assert_eq!(
            channel.deposit_amount,
            balances.values().sum::<BigNum>(),
            "the tree saturates at the deposit and never exceeds it"
        );
    }
}
