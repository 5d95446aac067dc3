#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

use sha3::{Digest, Keccak256};

pub type MerkleItem = [u8; 32];

/// Keccak256 Merkle tree over 32-byte leaves.
///
/// Leaves are deduplicated and sorted before the tree is built and each
/// parent hashes its children in ascending order, so the root is a pure
/// function of the leaf *set* - independent of insertion order. Both
/// validators must therefore arrive at a byte-identical root for the
/// same balance tree.
pub struct MerkleTree {
    root: MerkleItem,
}

impl MerkleTree {
    pub fn new(leaves: &[MerkleItem]) -> Self {
        let mut layer: Vec<MerkleItem> = leaves.to_vec();
        layer.sort_unstable();
        layer.dedup();

        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => combine(left, right),
                    // odd node is promoted to the next layer untouched
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields 1 or 2 items"),
                })
                .collect();
        }

        Self {
            root: layer.first().copied().unwrap_or([0; 32]),
        }
    }

    pub fn root(&self) -> MerkleItem {
        self.root
    }
}

fn combine(left: &MerkleItem, right: &MerkleItem) -> MerkleItem {
    let (low, high) = if left <= right {
        (left, right)
    } else {
        (right, left)
    };

    let mut hasher = Keccak256::new();
    hasher.update(low);
    hasher.update(high);

    hasher.finalize().into()
}
