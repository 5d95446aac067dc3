use std::fmt;

use thiserror::Error;

use primitives::{adapter::AdapterError, channel::ChannelError, ChannelId, DomainError};

#[derive(Debug)]
pub enum TickError {
    TimedOut(tokio::time::error::Elapsed),
    Tick(Box<Error>),
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickError::TimedOut(err) => write!(f, "Tick TimedOut: ({})", err),
            TickError::Tick(err) => write!(f, "Tick: {}", err),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("SentryApi: {0}")]
    SentryApi(#[from] crate::sentry_interface::Error),
    #[error("Adapter: {0}")]
    Adapter(#[from] AdapterError),
    #[error("Domain: {0}")]
    Domain(#[from] DomainError),
    #[error("Channel {0} is not valid: {1}")]
    InvalidChannel(ChannelId, ChannelError),
    #[error("Whoami is neither the leader nor the follower of channel {0}")]
    ChannelNotIntendedForUs(ChannelId),
    /// The sentry reports a last approved ApproveState without the NewState
    /// it refers to. That is corrupted data, not a retryable condition.
    #[error("Channel {0}: the last approved ApproveState has no matching NewState")]
    LastApprovedCorrupted(ChannelId),
    #[error("LeaderTick {0}: {1}")]
    LeaderTick(ChannelId, TickError),
    #[error("FollowerTick {0}: {1}")]
    FollowerTick(ChannelId, TickError),
}
