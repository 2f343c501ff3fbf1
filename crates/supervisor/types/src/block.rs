//! Block identity types.

use alloy_eips::BlockNumHash;
use alloy_primitives::B256;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Reference to a block with enough context to check its lineage.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Constructor, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[display(
    "BlockInfo {{ hash: {hash}, number: {number}, parent_hash: {parent_hash}, timestamp: {timestamp} }}"
)]
pub struct BlockInfo {
    /// The block hash
    pub hash: B256,
    /// The block number
    #[serde(with = "alloy_serde::quantity")]
    pub number: u64,
    /// The parent block hash
    pub parent_hash: B256,
    /// The block timestamp
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
}

impl BlockInfo {
    /// Returns the [`BlockNumHash`] of this block.
    pub const fn id(&self) -> BlockNumHash {
        BlockNumHash { number: self.number, hash: self.hash }
    }

    /// Returns the [`BlockNumHash`] of the parent block.
    ///
    /// The genesis block is its own parent number.
    pub const fn parent_id(&self) -> BlockNumHash {
        BlockNumHash { number: self.number.saturating_sub(1), hash: self.parent_hash }
    }
}

/// Represents a sealed block with its hash, number, and timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[display("BlockSeal {{ hash: {hash}, number: {number}, timestamp: {timestamp} }}")]
pub struct BlockSeal {
    /// The block's hash
    pub hash: B256,
    /// The block number
    #[serde(with = "alloy_serde::quantity")]
    pub number: u64,
    /// The block's timestamp
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
}

impl BlockSeal {
    /// Creates a new [`BlockSeal`] with the given hash, number, and timestamp.
    pub const fn new(hash: B256, number: u64, timestamp: u64) -> Self {
        Self { hash, number, timestamp }
    }

    /// Returns the [`BlockNumHash`] of the sealed block.
    pub const fn id(&self) -> BlockNumHash {
        BlockNumHash { number: self.number, hash: self.hash }
    }
}

impl From<BlockInfo> for BlockSeal {
    fn from(block: BlockInfo) -> Self {
        Self { hash: block.hash, number: block.number, timestamp: block.timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_block_info_ids() {
        let block = BlockInfo::new(B256::from([1u8; 32]), 42, B256::from([2u8; 32]), 1000);

        assert_eq!(block.id(), BlockNumHash::new(42, B256::from([1u8; 32])));
        assert_eq!(block.parent_id(), BlockNumHash::new(41, B256::from([2u8; 32])));
    }

    #[test]
    fn test_genesis_parent_id_does_not_underflow() {
        let genesis = BlockInfo::new(B256::from([1u8; 32]), 0, B256::ZERO, 0);
        assert_eq!(genesis.parent_id().number, 0);
    }

    #[test]
    fn test_seal_from_block_info() {
        let block = BlockInfo::new(B256::from([7u8; 32]), 9, B256::from([6u8; 32]), 1234);
        let seal = BlockSeal::from(block);

        assert_eq!(seal, BlockSeal::new(B256::from([7u8; 32]), 9, 1234));
        assert_eq!(seal.id(), block.id());
    }

    #[test]
    fn test_block_info_serialize_camel_case() {
        let block = BlockInfo::new(B256::from([1u8; 32]), 16, B256::from([2u8; 32]), 255);

        let v: Value = serde_json::to_value(block).unwrap();

        assert_eq!(v["number"], json!("0x10"));
        assert_eq!(v["timestamp"], json!("0xff"));
        assert!(v.get("parentHash").is_some());
    }

    #[test]
    fn test_block_seal_deserialize() {
        let json_obj = json!({
            "hash": "0x0303030303030303030303030303030303030303030303030303030303030303",
            "number": "0x5",
            "timestamp": "0x64"
        });

        let seal: BlockSeal = serde_json::from_value(json_obj).unwrap();

        assert_eq!(seal, BlockSeal::new(B256::from([3u8; 32]), 5, 100));
    }
}
