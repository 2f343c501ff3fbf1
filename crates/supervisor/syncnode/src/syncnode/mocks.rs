//! Mocks of the managed node collaborators, shared by the tests of this module.

use super::{
    ClientError, DerivationHook, EventStream, ManagedNodeClient, ManagedNodeError, OracleError,
    SafetyOracle, SubscriptionHandler,
};
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use async_trait::async_trait;
use jsonrpsee::types::ErrorObjectOwned;
use kona_syncnode_types::{
    BlockInfo, BlockReplacement, BlockSeal, DerivedIdPair, DerivedRefPair, SubscriptionEvent,
};
use mockall::mock;

mock! {
    #[derive(Debug)]
    pub Client {}

    #[async_trait]
    impl ManagedNodeClient for Client {
        async fn subscribe_events(&self) -> Result<EventStream, ClientError>;
        async fn pull_event(&self) -> Result<SubscriptionEvent, ClientError>;
        async fn update_cross_unsafe(&self, cross_unsafe_id: BlockNumHash) -> Result<(), ClientError>;
        async fn update_cross_safe(&self, derived_id: BlockNumHash, source_id: BlockNumHash) -> Result<(), ClientError>;
        async fn update_finalized(&self, finalized_id: BlockNumHash) -> Result<(), ClientError>;
        async fn reset(&self, unsafe_id: BlockNumHash, safe_id: BlockNumHash, finalized_id: BlockNumHash) -> Result<(), ClientError>;
        async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ClientError>;
        async fn provide_l1(&self, block_info: BlockInfo) -> Result<(), ClientError>;
    }
}

mock! {
    #[derive(Debug)]
    pub Oracle {}

    #[async_trait]
    impl SafetyOracle for Oracle {
        async fn local_safe(&self, chain_id: ChainId) -> Result<DerivedIdPair, OracleError>;
        async fn local_unsafe(&self, chain_id: ChainId) -> Result<BlockNumHash, OracleError>;
        async fn cross_safe(&self, chain_id: ChainId) -> Result<DerivedIdPair, OracleError>;
        async fn safe_derived_at(&self, chain_id: ChainId, source: BlockNumHash) -> Result<BlockNumHash, OracleError>;
        async fn finalized(&self, chain_id: ChainId) -> Result<BlockNumHash, OracleError>;
        async fn l1_block_ref_by_number(&self, number: u64) -> Result<BlockInfo, OracleError>;
    }
}

mock! {
    #[derive(Debug)]
    pub Hook {}

    #[async_trait]
    impl DerivationHook for Hook {
        async fn on_local_derived(&self, chain_id: ChainId, derived: &DerivedRefPair) -> Result<(), OracleError>;
    }
}

mock! {
    pub Handler {}

    #[async_trait]
    impl SubscriptionHandler for Handler {
        async fn handle_exhaust_l1(&self, derived_ref_pair: &DerivedRefPair) -> Result<(), ManagedNodeError>;
        async fn handle_reset(&self, reset_id: &str) -> Result<(), ManagedNodeError>;
        async fn handle_unsafe_block(&self, block: &BlockInfo) -> Result<(), ManagedNodeError>;
        async fn handle_derivation_update(&self, derived_ref_pair: &DerivedRefPair) -> Result<(), ManagedNodeError>;
        async fn handle_replace_block(&self, replacement: &BlockReplacement) -> Result<(), ManagedNodeError>;
    }
}

/// Deterministic hash for a block number.
pub(super) fn hash(number: u64) -> B256 {
    B256::left_padding_from(&number.to_be_bytes())
}

/// Block ID with a deterministic hash.
pub(super) fn id(number: u64) -> BlockNumHash {
    BlockNumHash::new(number, hash(number))
}

/// Block ref with deterministic hashes.
pub(super) fn block(number: u64) -> BlockInfo {
    BlockInfo::new(hash(number), number, hash(number.saturating_sub(1)), number * 2)
}

/// Remote error with the given code.
pub(super) fn rpc_error(code: i32) -> ClientError {
    ClientError::Client(jsonrpsee::core::ClientError::Call(ErrorObjectOwned::owned(
        code,
        "rejected",
        None::<()>,
    )))
}
