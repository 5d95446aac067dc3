#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use thiserror::Error;

pub mod adapter;
pub mod balances_map;
pub mod big_num;
pub mod channel;
pub mod channel_validator;
pub mod config;
pub mod sentry;
pub mod validator;

pub mod util {
    pub use api::ApiUrl;

    pub mod api;
    pub mod logging;

    pub mod tests {
        use slog::{o, Discard, Drain, Logger};

        pub mod prep_db;

        pub fn discard_logger() -> Logger {
            let drain = Discard.fuse();

            Logger::root(drain, o!())
        }
    }
}

pub use self::balances_map::BalancesMap;
pub use self::big_num::BigNum;
pub use self::channel::{Channel, ChannelId, ChannelSpec, SpecValidator, SpecValidators};
pub use self::config::Config;
pub use self::validator::{ValidatorDesc, ValidatorId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    RuleViolation(String),
}
