use std::{fmt, ops::Deref, str::FromStr};

use chrono::{serde::ts_seconds, DateTime, Utc};
use hex::{FromHex, FromHexError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{BigNum, ValidatorDesc, ValidatorId};

#[derive(Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Hash)]
#[serde(transparent)]
pub struct ChannelId(
    #[serde(
        deserialize_with = "channel_id_from_str",
        serialize_with = "channel_id_to_str"
    )]
    [u8; 32],
);

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

fn channel_id_from_str<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
where
    D: Deserializer<'de>,
{
    let channel_id = String::deserialize(deserializer)?;
    let hex_str = channel_id.strip_prefix("0x").unwrap_or(&channel_id);

    <[u8; 32] as FromHex>::from_hex(hex_str).map_err(serde::de::Error::custom)
}

fn channel_id_to_str<S>(id: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(id)))
}

impl Deref for ChannelId {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ChannelId {
    fn from(array: [u8; 32]) -> Self {
        Self(array)
    }
}

impl AsRef<[u8]> for ChannelId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromHex for ChannelId {
    type Error = FromHexError;

    fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, Self::Error> {
        let array = hex::FromHex::from_hex(hex)?;

        Ok(Self(array))
    }
}

impl FromStr for ChannelId {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        Self::from_hex(hex_str)
    }
}

/// A payment channel. Immutable once created on-chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub creator: ValidatorId,
    pub deposit_asset: String,
    pub deposit_amount: BigNum,
    #[serde(with = "ts_seconds")]
    pub valid_until: DateTime<Utc>,
    pub spec: ChannelSpec,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub validators: SpecValidators,
    /// A random number making the channel id unique for otherwise
    /// identical specs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<BigNum>,
}

/// The channel's (leader, follower) validator pair.
///
/// The protocol assumes exactly two validators, so this is a pair type
/// rather than a list: index 0 is the leader, index 1 the follower.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpecValidators(ValidatorDesc, ValidatorDesc);

#[derive(Debug)]
pub enum SpecValidator<'a> {
    Leader(&'a ValidatorDesc),
    Follower(&'a ValidatorDesc),
}

impl<'a> SpecValidator<'a> {
    pub fn validator(&self) -> &'a ValidatorDesc {
        match self {
            SpecValidator::Leader(validator) => validator,
            SpecValidator::Follower(validator) => validator,
        }
    }
}

impl SpecValidators {
    pub fn new(leader: ValidatorDesc, follower: ValidatorDesc) -> Self {
        Self(leader, follower)
    }

    pub fn leader(&self) -> &ValidatorDesc {
        &self.0
    }

    pub fn follower(&self) -> &ValidatorDesc {
        &self.1
    }

    pub fn find(&self, validator_id: &ValidatorId) -> Option<SpecValidator<'_>> {
        if &self.leader().id == validator_id {
            Some(SpecValidator::Leader(self.leader()))
        } else if &self.follower().id == validator_id {
            Some(SpecValidator::Follower(self.follower()))
        } else {
            None
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }
}

impl From<(ValidatorDesc, ValidatorDesc)> for SpecValidators {
    fn from((leader, follower): (ValidatorDesc, ValidatorDesc)) -> Self {
        Self(leader, follower)
    }
}

impl<'a> IntoIterator for &'a SpecValidators {
    type Item = &'a ValidatorDesc;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Fixed size iterator of 2, as we need an iterator in a couple of occasions
pub struct Iter<'a> {
    validators: &'a SpecValidators,
    index: u8,
}

impl<'a> Iter<'a> {
    fn new(validators: &'a SpecValidators) -> Self {
        Self {
            validators,
            index: 0,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ValidatorDesc;

    fn next(&mut self) -> Option<Self::Item> {
        match self.index {
            0 => {
                self.index += 1;

                Some(self.validators.leader())
            }
            1 => {
                self.index += 1;

                Some(self.validators.follower())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("{0}")]
    InvalidArgument(String),
    /// Our identity is not listed in `channel.spec.validators`,
    /// so this channel should never have been handed to us.
    #[error("channel is not validated by us")]
    AdapterNotIncluded,
    #[error("channel.validUntil has passed")]
    PassedValidUntil,
    #[error("validators are not in the whitelist")]
    UnlistedValidator,
    #[error("channel.creator is not whitelisted")]
    UnlistedCreator,
    #[error("channel.depositAsset is not whitelisted")]
    UnlistedAsset,
    #[error("channel.depositAmount is less than MINIMAL_DEPOSIT")]
    MinimumDepositNotMet,
    #[error("channel validator fee is less than MINIMAL_FEE")]
    MinimumValidatorFeeNotMet,
    #[error("total fees <= deposit: fee constraint violated")]
    FeeConstraintViolated,
}
