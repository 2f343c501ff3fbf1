use crate::syncnode::OracleError;
use alloy_primitives::ChainId;
use kona_syncnode_types::{BlockInfo, BlockSeal, DerivedRefPair, DerivedSealPair};

/// Events delivered to a [`ManagedNode`](crate::syncnode::ManagedNode) by the rest of the
/// supervisor.
///
/// A node only reacts to events tagged with its own chain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SuperchainEvent {
    /// A local-safe block failed cross validation and must be replaced.
    InvalidateLocalSafe {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The rejected candidate and its source block.
        candidate: DerivedRefPair,
    },

    /// The cross-unsafe head advanced.
    CrossUnsafeUpdate {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The new cross-unsafe block.
        seal: BlockSeal,
    },

    /// The cross-safe head advanced.
    CrossSafeUpdate {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The new cross-safe block and the L1 block it was derived from.
        pair: DerivedSealPair,
    },

    /// The finalized L2 head advanced.
    FinalizedL2Update {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// The new finalized block.
        seal: BlockSeal,
    },

    /// The node's local-safe view disagrees with the supervisor's.
    LocalSafeOutOfSync {
        /// The chain the block belongs to.
        chain_id: ChainId,
        /// Classification of the inconsistency.
        error: OracleError,
        /// The L1 block at which the inconsistency was observed.
        l1_ref: BlockInfo,
    },

    /// The supervisor rewound its view of the chain.
    ChainRewound {
        /// The chain that was rewound.
        chain_id: ChainId,
    },
}

impl SuperchainEvent {
    /// Returns the chain the event is addressed to.
    pub const fn chain_id(&self) -> ChainId {
        match self {
            Self::InvalidateLocalSafe { chain_id, .. } |
            Self::CrossUnsafeUpdate { chain_id, .. } |
            Self::CrossSafeUpdate { chain_id, .. } |
            Self::FinalizedL2Update { chain_id, .. } |
            Self::LocalSafeOutOfSync { chain_id, .. } |
            Self::ChainRewound { chain_id } => *chain_id,
        }
    }
}
