#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

pub mod channel;
pub mod error;
pub mod follower;
pub mod heartbeat;
pub mod leader;
pub mod producer;
pub mod sentry_interface;
pub mod worker;

pub mod core {
    pub mod events;
    pub mod fees;
    pub mod follower_rules;
}

#[cfg(test)]
pub mod test_util;

pub use self::sentry_interface::{all_channels, SentryApi};
pub use self::worker::Worker;

use adapter::{get_balance_leaf, get_signable_state_root};
use merkle_tree::MerkleTree;
use primitives::{BalancesMap, Channel, DomainError};

/// Computes the hex state root binding the channel id to the given
/// (post-fee) balance tree. Must produce byte-identical output on the
/// leader and the follower, otherwise no signature will ever validate.
pub fn get_state_root_hash(
    channel: &Channel,
    balances: &BalancesMap,
) -> Result<String, DomainError> {
    let leaves = balances
        .iter()
        .map(|(acc, amount)| get_balance_leaf(acc, amount))
        .collect::<Result<Vec<_>, _>>()?;

    let tree = MerkleTree::new(&leaves);

    Ok(hex::encode(get_signable_state_root(
        channel.id.as_ref(),
        &tree.root(),
    )))
}
