use alloy_primitives::ChainId;
use kona_syncnode_types::{BlockInfo, BlockReplacement, DerivedRefPair};

/// Represents chain events that a [`ManagedNode`](crate::syncnode::ManagedNode) emits on
/// behalf of its node.
///
/// Each event is tagged with the chain it originates from so that consumers subscribed to
/// several chains can route it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ChainEvent {
    /// The node processed a new unsafe block, advancing its local-unsafe head.
    LocalUnsafeReceived {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The [`BlockInfo`] of the new local-unsafe block.
        block: BlockInfo,
    },

    /// The node derived a new local-safe block.
    LocalDerived {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The [`DerivedRefPair`] containing the derived block and its source block.
        derived: DerivedRefPair,
    },

    /// The node replaced an invalidated block.
    ReplaceBlock {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The [`BlockReplacement`] containing the replacement block and the invalidated block
        /// hash.
        replacement: BlockReplacement,
    },
}

impl ChainEvent {
    /// Returns the chain the event originates from.
    pub const fn chain_id(&self) -> ChainId {
        match self {
            Self::LocalUnsafeReceived { chain_id, .. } |
            Self::LocalDerived { chain_id, .. } |
            Self::ReplaceBlock { chain_id, .. } => *chain_id,
        }
    }
}
