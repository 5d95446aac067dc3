use std::{collections::HashMap, fmt::Debug};

use thiserror::Error;

use crate::{channel_validator::ChannelValidator, Config, ValidatorId};

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Keystore error: {0}")]
    Keystore(String),
    #[error("Signature error: {0}")]
    Signature(String),
    #[error("Wallet is locked, unlock it before signing")]
    LockedWallet,
}

#[derive(Debug, Clone)]
pub struct KeystoreOptions {
    pub keystore_file: String,
    pub keystore_pwd: String,
}

#[derive(Debug, Clone)]
pub struct DummyAdapterOptions {
    pub dummy_identity: ValidatorId,
    pub dummy_auth_tokens: HashMap<ValidatorId, String>,
}

/// The signing capability the worker relies on.
///
/// An adapter owns exactly one identity and its signing key; everything the
/// tick logic needs from cryptography goes through this trait.
pub trait Adapter: ChannelValidator + Clone + Debug + Send + Sync + 'static {
    type Options;

    /// Creates the adapter. Fatal on failure - the worker exits.
    fn init(opts: Self::Options, config: &Config) -> AdapterResult<Self>
    where
        Self: Sized;

    /// Makes the signing key usable. Fatal on failure - the worker exits.
    fn unlock(&mut self) -> AdapterResult<()>;

    fn whoami(&self) -> &ValidatorId;

    /// Signs the hex-encoded state root.
    fn sign(&self, state_root: &str) -> AdapterResult<String>;

    /// Checks that `signature` over `state_root` was produced by `signer`.
    fn verify(
        &self,
        signer: &ValidatorId,
        state_root: &str,
        signature: &str,
    ) -> AdapterResult<bool>;

    /// The bearer token used to authenticate against the given
    /// validator's sentry.
    fn get_auth(&self, validator: &ValidatorId) -> AdapterResult<String>;
}
