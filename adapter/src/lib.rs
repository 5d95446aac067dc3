#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use primitives::{BigNum, DomainError, ValidatorId};
use tiny_keccak::{Hasher, Keccak};

pub use self::dummy::DummyAdapter;
pub use self::ethereum::EthereumAdapter;

pub mod dummy;
pub mod ethereum;

pub enum AdapterTypes {
    DummyAdapter(Box<DummyAdapter>),
    EthereumAdapter(Box<EthereumAdapter>),
}

/// The 32-byte commitment the validators actually sign: the channel id
/// followed by the Merkle root of the balance leaves, hashed together.
pub fn get_signable_state_root(channel_id: &[u8], balance_root: &[u8; 32]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(channel_id);
    keccak.update(balance_root);

    let mut res = [0u8; 32];
    keccak.finalize(&mut res);

    res
}

/// Leaf of the balance tree: the account bytes followed by the amount as
/// a 32-byte big-endian unsigned integer. The fixed-width suffix keeps
/// the encoding unambiguous for variable-length account identifiers.
pub fn get_balance_leaf(acc: &ValidatorId, amnt: &BigNum) -> Result<[u8; 32], DomainError> {
    let amount_bytes = amnt.to_bytes_be();
    if amount_bytes.len() > 32 {
        return Err(DomainError::RuleViolation(
            "balance does not fit in a uint256".to_string(),
        ));
    }

    let mut keccak = Keccak::v256();
    keccak.update(acc.as_bytes());
    keccak.update(&[0u8; 32][..32 - amount_bytes.len()]);
    keccak.update(&amount_bytes);

    let mut res = [0u8; 32];
    keccak.finalize(&mut res);

    Ok(res)
}
