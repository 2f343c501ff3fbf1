//! Contains the block replacement type.

use crate::BlockInfo;
use alloy_primitives::B256;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// The node's answer to an invalidation: a deposit-only block that takes the place of
/// the invalidated one.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Constructor, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[display("replacement: {replacement}, invalidated: {invalidated}")]
pub struct BlockReplacement {
    /// The block that replaces the invalidated block
    pub replacement: BlockInfo,
    /// Hash of the block being invalidated and replaced
    pub invalidated: B256,
}
