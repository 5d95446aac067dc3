use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::BigNum;

pub use messages::*;

/// Identity of an account known to the payment channel: a validator,
/// a publisher earning from events, or the channel creator.
///
/// The concrete format depends on the adapter in use - an Ethereum
/// checksummed address for the ethereum adapter, any non-empty string
/// for the dummy one.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ValidatorId(String);

impl ValidatorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorId({})", self.0)
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ValidatorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ValidatorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for ValidatorId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for ValidatorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorDesc {
    pub id: ValidatorId,
    /// The fixed fee the validator collects, prorated by how much of the
    /// deposit has been distributed.
    pub fee: BigNum,
    /// The address which receives the fee; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_addr: Option<ValidatorId>,
    /// The url of the validator's sentry API.
    pub url: String,
}

/// The five validator message types exchanged through the sentry.
pub mod messages {
    use std::{any::type_name, convert::TryFrom, fmt, marker::PhantomData};

    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::BalancesMap;

    #[derive(Error, Debug)]
    pub struct MessageTypeError<T: Type> {
        expected: PhantomData<T>,
        actual: String,
    }

    impl<T: Type> MessageTypeError<T> {
        pub fn for_actual<A: fmt::Debug>(actual: &A) -> Self {
            Self {
                expected: PhantomData,
                actual: format!("{:?}", actual),
            }
        }
    }

    impl<T: Type> fmt::Display for MessageTypeError<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "Expected {} message type but the actual is {}",
                type_name::<T>(),
                self.actual
            )
        }
    }

    /// Marker for a concrete message variant which can be extracted from
    /// (and packed back into) the tagged [`MessageTypes`] union.
    pub trait Type:
        fmt::Debug
        + Into<MessageTypes>
        + TryFrom<MessageTypes, Error = MessageTypeError<Self>>
        + Clone
        + PartialEq
        + Eq
    {
    }

    /// The producer's bookkeeping record: the running pre-fee balance tree,
    /// its post-fee image and the consumption cursor over event aggregates.
    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct Accounting {
        #[serde(rename = "lastEvAggr")]
        pub last_event_aggregate: DateTime<Utc>,
        pub balances_before_fees: BalancesMap,
        pub balances: BalancesMap,
    }

    /// The leader's signed proposal of the next balance tree.
    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct NewState {
        pub state_root: String,
        pub signature: String,
        pub balances: BalancesMap,
        pub balances_after_fees: BalancesMap,
    }

    /// The follower's signed acknowledgement of a valid `NewState`.
    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct ApproveState {
        pub state_root: String,
        pub signature: String,
        pub is_healthy: bool,
    }

    /// The follower's signed refusal of a `NewState`, citing a reason.
    #[derive(Default, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct RejectState {
        pub reason: String,
        pub state_root: String,
        pub signature: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub balances: Option<BalancesMap>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub timestamp: Option<DateTime<Utc>>,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
    #[serde(rename_all = "camelCase")]
    pub struct Heartbeat {
        pub signature: String,
        pub state_root: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
    #[serde(tag = "type")]
    pub enum MessageTypes {
        ApproveState(ApproveState),
        NewState(NewState),
        RejectState(RejectState),
        Heartbeat(Heartbeat),
        Accounting(Accounting),
    }

    impl Type for Accounting {}
    impl TryFrom<MessageTypes> for Accounting {
        type Error = MessageTypeError<Self>;

        fn try_from(value: MessageTypes) -> Result<Self, Self::Error> {
            match value {
                MessageTypes::Accounting(accounting) => Ok(accounting),
                other => Err(MessageTypeError::for_actual(&other)),
            }
        }
    }
    impl From<Accounting> for MessageTypes {
        fn from(accounting: Accounting) -> Self {
            MessageTypes::Accounting(accounting)
        }
    }

    impl Type for ApproveState {}
    impl TryFrom<MessageTypes> for ApproveState {
        type Error = MessageTypeError<Self>;

        fn try_from(value: MessageTypes) -> Result<Self, Self::Error> {
            match value {
                MessageTypes::ApproveState(approve_state) => Ok(approve_state),
                other => Err(MessageTypeError::for_actual(&other)),
            }
        }
    }
    impl From<ApproveState> for MessageTypes {
        fn from(approve_state: ApproveState) -> Self {
            MessageTypes::ApproveState(approve_state)
        }
    }

    impl Type for NewState {}
    impl TryFrom<MessageTypes> for NewState {
        type Error = MessageTypeError<Self>;

        fn try_from(value: MessageTypes) -> Result<Self, Self::Error> {
            match value {
                MessageTypes::NewState(new_state) => Ok(new_state),
                other => Err(MessageTypeError::for_actual(&other)),
            }
        }
    }
    impl From<NewState> for MessageTypes {
        fn from(new_state: NewState) -> Self {
            MessageTypes::NewState(new_state)
        }
    }

    impl Type for RejectState {}
    impl TryFrom<MessageTypes> for RejectState {
        type Error = MessageTypeError<Self>;

        fn try_from(value: MessageTypes) -> Result<Self, Self::Error> {
            match value {
                MessageTypes::RejectState(reject_state) => Ok(reject_state),
                other => Err(MessageTypeError::for_actual(&other)),
            }
        }
    }
    impl From<RejectState> for MessageTypes {
        fn from(reject_state: RejectState) -> Self {
            MessageTypes::RejectState(reject_state)
        }
    }

    impl Type for Heartbeat {}
    impl TryFrom<MessageTypes> for Heartbeat {
        type Error = MessageTypeError<Self>;

        fn try_from(value: MessageTypes) -> Result<Self, Self::Error> {
            match value {
                MessageTypes::Heartbeat(heartbeat) => Ok(heartbeat),
                other => Err(MessageTypeError::for_actual(&other)),
            }
        }
    }
    impl From<Heartbeat> for MessageTypes {
        fn from(heartbeat: Heartbeat) -> Self {
            MessageTypes::Heartbeat(heartbeat)
        }
    }
}
