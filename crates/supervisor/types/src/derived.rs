//! Derivation pairs linking an L2 block to the L1 block it was derived from.

use crate::{BlockInfo, BlockSeal};
use alloy_eips::BlockNumHash;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// A pair of [`BlockNumHash`]s representing a derivation relationship between two blocks.
///
/// - `source`: The [`BlockNumHash`] of the source (L1) block.
/// - `derived`: The [`BlockNumHash`] of the derived (L2) block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Constructor, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedIdPair {
    /// The [`BlockNumHash`] of the source (L1) block.
    pub source: BlockNumHash,
    /// The [`BlockNumHash`] of the derived (L2) block.
    pub derived: BlockNumHash,
}

/// A pair of [`BlockInfo`]s representing a derivation relationship between two blocks.
///
/// The source block always identifies an L1 block at or before the true origin of the
/// derived block.
#[derive(
    Debug, Clone, Copy, Default, Display, PartialEq, Eq, Constructor, Serialize, Deserialize,
)]
#[display("source: {source}, derived: {derived}")]
#[serde(rename_all = "camelCase")]
pub struct DerivedRefPair {
    /// The [`BlockInfo`] of the source (L1) block.
    pub source: BlockInfo,
    /// The [`BlockInfo`] of the derived (L2) block.
    pub derived: BlockInfo,
}

/// A pair of [`BlockSeal`]s, used when the supervisor promotes a derived block.
#[derive(
    Debug, Clone, Copy, Default, Display, PartialEq, Eq, Constructor, Serialize, Deserialize,
)]
#[display("source: {source}, derived: {derived}")]
#[serde(rename_all = "camelCase")]
pub struct DerivedSealPair {
    /// The [`BlockSeal`] of the source (L1) block.
    pub source: BlockSeal,
    /// The [`BlockSeal`] of the derived (L2) block.
    pub derived: BlockSeal,
}

impl DerivedSealPair {
    /// Returns the identities of both blocks.
    pub const fn ids(&self) -> DerivedIdPair {
        DerivedIdPair { source: self.source.id(), derived: self.derived.id() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn test_seal_pair_ids() {
        let pair = DerivedSealPair::new(
            BlockSeal::new(B256::from([3u8; 32]), 50, 1),
            BlockSeal::new(B256::from([4u8; 32]), 5, 2),
        );

        let ids = pair.ids();
        assert_eq!(ids.source, BlockNumHash::new(50, B256::from([3u8; 32])));
        assert_eq!(ids.derived, BlockNumHash::new(5, B256::from([4u8; 32])));
    }

    #[test]
    fn test_ref_pair_deserialize() {
        let json = r#"{
            "source": {
                "hash": "0x0101010101010101010101010101010101010101010101010101010101010101",
                "number": "0x64",
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "timestamp": "0x1"
            },
            "derived": {
                "hash": "0x0202020202020202020202020202020202020202020202020202020202020202",
                "number": "0x7",
                "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "timestamp": "0x2"
            }
        }"#;

        let pair: DerivedRefPair = serde_json::from_str(json).unwrap();
        assert_eq!(pair.source.number, 100);
        assert_eq!(pair.derived.hash, B256::from([2u8; 32]));
    }
}
