//! [`ManagedModeApi`] contains the endpoints the supervisor calls on a managed node.

use alloy_eips::BlockNumHash;
use jsonrpsee::proc_macros::rpc;
use kona_syncnode_types::{BlockInfo, BlockSeal, ManagedEvent, SubscriptionEvent};
use serde::{Deserialize, Serialize};

/// Represents the topics for subscriptions in the Managed Mode API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionTopic {
    /// The topic for events from the managed node.
    Events,
}

/// Control and sync endpoints of a managed node.
///
/// See <https://specs.optimism.io/interop/managed-mode.html>
#[rpc(client, namespace = "interop")]
pub trait ManagedModeApi {
    /// Subscribe to the events from the managed node. Notifications arrive through
    /// `interop_subscription` as [`SubscriptionEvent`]s.
    #[subscription(name = "subscribe" => "subscription", item = SubscriptionEvent, unsubscribe = "unsubscribe")]
    async fn subscribe_events(
        &self,
        topic: SubscriptionTopic,
    ) -> jsonrpsee::core::SubscriptionResult;

    /// Pull the next pending event. Returns `null` when no event is pending.
    #[method(name = "pullEvent")]
    async fn pull_event(&self) -> jsonrpsee::core::RpcResult<Option<ManagedEvent>>;

    /// Update the cross unsafe block head
    #[method(name = "updateCrossUnsafe")]
    async fn update_cross_unsafe(&self, id: BlockNumHash) -> jsonrpsee::core::RpcResult<()>;

    /// Update the cross safe block head
    #[method(name = "updateCrossSafe")]
    async fn update_cross_safe(
        &self,
        derived: BlockNumHash,
        source: BlockNumHash,
    ) -> jsonrpsee::core::RpcResult<()>;

    /// Update the finalized block head
    #[method(name = "updateFinalized")]
    async fn update_finalized(&self, id: BlockNumHash) -> jsonrpsee::core::RpcResult<()>;

    /// Invalidate a block
    #[method(name = "invalidateBlock")]
    async fn invalidate_block(&self, seal: BlockSeal) -> jsonrpsee::core::RpcResult<()>;

    /// Send the next L1 block
    #[method(name = "provideL1")]
    async fn provide_l1(&self, next_l1: BlockInfo) -> jsonrpsee::core::RpcResult<()>;

    /// Reset the managed node to the specified block heads
    #[method(name = "reset")]
    async fn reset(
        &self,
        local_unsafe: BlockNumHash,
        local_safe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> jsonrpsee::core::RpcResult<()>;
}
