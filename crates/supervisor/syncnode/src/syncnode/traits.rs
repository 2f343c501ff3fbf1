use super::{ManagedNodeError, OracleError};
use alloy_eips::BlockNumHash;
use alloy_primitives::ChainId;
use async_trait::async_trait;
use kona_syncnode_types::{BlockInfo, BlockReplacement, DerivedIdPair, DerivedRefPair};
use std::fmt::Debug;

/// Represents a handler for events pushed by a managed node.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    /// Handles the L1 exhaust event from the node.
    async fn handle_exhaust_l1(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError>;

    /// Handles the reset event from the node.
    async fn handle_reset(&self, reset_id: &str) -> Result<(), ManagedNodeError>;

    /// Handles the unsafe block event from the node.
    async fn handle_unsafe_block(&self, block: &BlockInfo) -> Result<(), ManagedNodeError>;

    /// Handles the derivation update event from the node.
    async fn handle_derivation_update(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError>;

    /// Handles the block replacement event from the node.
    async fn handle_replace_block(
        &self,
        replacement: &BlockReplacement,
    ) -> Result<(), ManagedNodeError>;
}

/// [`SafetyOracle`] exposes the supervisor's canonical safety view of every chain.
///
/// Reads that target data the supervisor does not have yet fail with
/// [`OracleError::NotFound`] or [`OracleError::FutureData`].
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait SafetyOracle: Send + Sync + Debug {
    /// Returns the latest local-safe block and its source.
    async fn local_safe(&self, chain_id: ChainId) -> Result<DerivedIdPair, OracleError>;

    /// Returns the latest local-unsafe block.
    async fn local_unsafe(&self, chain_id: ChainId) -> Result<BlockNumHash, OracleError>;

    /// Returns the latest cross-safe block and its source.
    async fn cross_safe(&self, chain_id: ChainId) -> Result<DerivedIdPair, OracleError>;

    /// Returns the latest safe block derived from the given L1 block.
    ///
    /// # Arguments
    /// * `chain_id` - The chain to read.
    /// * `source` - The L1 block. A zero hash looks the block up by number only.
    async fn safe_derived_at(
        &self,
        chain_id: ChainId,
        source: BlockNumHash,
    ) -> Result<BlockNumHash, OracleError>;

    /// Returns the latest finalized block.
    async fn finalized(&self, chain_id: ChainId) -> Result<BlockNumHash, OracleError>;

    /// Returns the canonical L1 block with the given number.
    async fn l1_block_ref_by_number(&self, number: u64) -> Result<BlockInfo, OracleError>;
}

/// Invoked after a local-derived block has been announced, to acknowledge it synchronously
/// with the supervisor's storage.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait DerivationHook: Send + Sync + Debug {
    /// Called with every derivation update reported by the node.
    async fn on_local_derived(
        &self,
        chain_id: ChainId,
        derived: &DerivedRefPair,
    ) -> Result<(), OracleError>;
}
