use alloy_primitives::{keccak256, Address, Signature, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

use primitives::{
    adapter::{Adapter, AdapterError, AdapterResult, KeystoreOptions},
    channel_validator::ChannelValidator,
    Config, ValidatorId,
};

/// Adapter backed by an Ethereum keystore file.
///
/// Identity is the EIP-55 checksummed address of the keystore account;
/// signatures are 65-byte recoverable secp256k1 signatures over the
/// `\x19Ethereum Signed Message` digest of the hex state root.
#[derive(Debug, Clone)]
pub struct EthereumAdapter {
    identity: ValidatorId,
    keystore_file: String,
    keystore_pwd: String,
    wallet: Option<PrivateKeySigner>,
}

impl ChannelValidator for EthereumAdapter {}

impl Adapter for EthereumAdapter {
    type Options = KeystoreOptions;

    fn init(opts: Self::Options, _config: &Config) -> AdapterResult<Self> {
        let keystore_contents = std::fs::read_to_string(&opts.keystore_file)
            .map_err(|err| AdapterError::Keystore(format!("reading keystore file: {}", err)))?;

        let keystore_json: serde_json::Value = serde_json::from_str(&keystore_contents)
            .map_err(|err| AdapterError::Keystore(format!("keystore file is not JSON: {}", err)))?;

        // the address is present in clear text, so `whoami` works
        // before the wallet is unlocked
        let address = keystore_json["address"]
            .as_str()
            .ok_or_else(|| {
                AdapterError::Keystore("address missing in keystore JSON".to_string())
            })?
            .parse::<Address>()
            .map_err(|err| AdapterError::Keystore(format!("keystore address: {}", err)))?;

        Ok(Self {
            identity: ValidatorId::from(address.to_checksum(None)),
            keystore_file: opts.keystore_file,
            keystore_pwd: opts.keystore_pwd,
            wallet: None,
        })
    }

    fn unlock(&mut self) -> AdapterResult<()> {
        let wallet = PrivateKeySigner::decrypt_keystore(&self.keystore_file, &self.keystore_pwd)
            .map_err(|err| AdapterError::Keystore(format!("decrypting keystore: {}", err)))?;

        self.identity = ValidatorId::from(wallet.address().to_checksum(None));
        self.wallet = Some(wallet);

        Ok(())
    }

    fn whoami(&self) -> &ValidatorId {
        &self.identity
    }

    fn sign(&self, state_root: &str) -> AdapterResult<String> {
        let wallet = self.wallet.as_ref().ok_or(AdapterError::LockedWallet)?;

        let signature = wallet
            .sign_hash_sync(&hash_message(state_root))
            .map_err(|err| AdapterError::Signature(err.to_string()))?;

        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    fn verify(
        &self,
        signer: &ValidatorId,
        state_root: &str,
        signature: &str,
    ) -> AdapterResult<bool> {
        let signer_address = match signer.as_str().parse::<Address>() {
            Ok(address) => address,
            // the claimed signer is not even an address
            Err(_) => return Ok(false),
        };

        let raw = match hex::decode(signature.strip_prefix("0x").unwrap_or(signature)) {
            Ok(raw) => raw,
            Err(_) => return Ok(false),
        };

        let signature = match Signature::from_raw(&raw) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        match signature.recover_address_from_prehash(&hash_message(state_root)) {
            Ok(recovered) => Ok(recovered == signer_address),
            Err(_) => Ok(false),
        }
    }

    fn get_auth(&self, validator: &ValidatorId) -> AdapterResult<String> {
        let wallet = self.wallet.as_ref().ok_or(AdapterError::LockedWallet)?;

        let digest = keccak256(format!("{}:{}", self.identity, validator).as_bytes());
        let signature = wallet
            .sign_hash_sync(&digest)
            .map_err(|err| AdapterError::Signature(err.to_string()))?;

        Ok(format!(
            "{}.0x{}",
            self.identity,
            hex::encode(signature.as_bytes())
        ))
    }
}

/// The standard `personal_sign` digest of the hex-encoded state root.
fn hash_message(message: &str) -> B256 {
    let prefixed = format!("\x19Ethereum Signed Message:\n{}{}", message.len(), message);

    keccak256(prefixed.as_bytes())
}
