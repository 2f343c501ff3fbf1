//! [`ManagedNode`] keeps a single managed node in sync with the supervisor.

use super::{
    ClientError, DeadlineError, DerivationHook, ManagedNodeClient, ManagedNodeError, OracleError,
    SafetyOracle, SubscriptionHandler, dispatcher::dispatch_managed_event, resetter::Resetter,
    utils::with_deadline,
};
use crate::{
    SyncNodeConfig,
    event::{ChainEvent, SuperchainEvent},
};
use alloy_primitives::ChainId;
use async_trait::async_trait;
use kona_syncnode_types::{
    BlockInfo, BlockReplacement, BlockSeal, DerivedRefPair, DerivedSealPair, ManagedEvent,
};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{select, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

/// Reset reason reported by a node whose execution engine must be reset by an operator.
const ENGINE_RESET_REQUIRED: &str = "cannot continue derivation until Engine has been reset";

/// [`ManagedNode`] reacts to events of one managed node and forwards the supervisor's
/// decisions back to it.
///
/// Node events arrive through [`ManagedNode::on_node_event`] or
/// [`ManagedNode::pull_events`], supervisor events through [`ManagedNode::on_event`]. Callers
/// must not handle two events of the same node concurrently.
#[derive(Debug)]
pub struct ManagedNode<C, O> {
    chain_id: ChainId,
    /// The attached managed node client
    client: Arc<C>,
    /// The supervisor's view of all chains
    oracle: Arc<O>,
    /// Resetter for handling node resets
    resetter: Resetter<C, O>,
    /// Channel for sending events to the rest of the supervisor
    chain_event_sender: mpsc::Sender<ChainEvent>,
    derivation_hook: Option<Arc<dyn DerivationHook>>,
    node_timeout: Duration,
    oracle_timeout: Duration,
    cancel_token: CancellationToken,
}

impl<C, O> ManagedNode<C, O>
where
    C: ManagedNodeClient + 'static,
    O: SafetyOracle + 'static,
{
    /// Creates a new [`ManagedNode`] for the given chain.
    ///
    /// Every call made on behalf of the node is abandoned once `cancel_token` is cancelled.
    pub fn new(
        chain_id: ChainId,
        client: Arc<C>,
        oracle: Arc<O>,
        chain_event_sender: mpsc::Sender<ChainEvent>,
        config: &SyncNodeConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        let resetter =
            Resetter::new(chain_id, client.clone(), oracle.clone(), config, cancel_token.clone());

        Self {
            chain_id,
            client,
            oracle,
            resetter,
            chain_event_sender,
            derivation_hook: None,
            node_timeout: config.node_timeout,
            oracle_timeout: config.oracle_timeout,
            cancel_token,
        }
    }

    /// Sets the [`DerivationHook`] invoked after every derivation update.
    pub fn with_derivation_hook(mut self, hook: Arc<dyn DerivationHook>) -> Self {
        self.derivation_hook = Some(hook);
        self
    }

    /// Returns the [`ChainId`] of the managed node.
    pub const fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Returns the client of the managed node.
    pub const fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Returns the token that bounds the lifetime of the managed node.
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Handles an event pushed or pulled from the managed node.
    pub async fn on_node_event(&self, event: Option<&ManagedEvent>) {
        dispatch_managed_event(self, self.chain_id, event).await;
    }

    /// Pulls and handles events from the managed node until none is pending.
    ///
    /// Returns whether any event was handled. Cancellation and failed pulls end the loop with
    /// [`ManagedNodeError::PullEvents`].
    pub async fn pull_events(&self) -> Result<bool, ManagedNodeError> {
        let mut pulled_any = false;
        loop {
            match self.call(self.client.pull_event()).await {
                Ok(event) => {
                    pulled_any = true;
                    self.on_node_event(event.data.as_ref()).await;
                }
                Err(ClientError::EndOfStream) => return Ok(pulled_any),
                Err(err) => {
                    debug!(target: "supervisor::syncnode", chain_id = %self.chain_id, %err, "Stopped pulling events");
                    return Err(ManagedNodeError::PullEvents { pulled_any, source: err });
                }
            }
        }
    }

    /// Handles an event from the rest of the supervisor.
    ///
    /// Returns `false` without doing anything if the event is addressed to another chain.
    pub async fn on_event(&self, event: &SuperchainEvent) -> bool {
        if event.chain_id() != self.chain_id {
            return false;
        }

        let result = match event {
            SuperchainEvent::InvalidateLocalSafe { candidate, .. } => {
                self.on_invalidate_local_safe(candidate).await
            }
            SuperchainEvent::CrossUnsafeUpdate { seal, .. } => {
                self.on_cross_unsafe_update(seal).await
            }
            SuperchainEvent::CrossSafeUpdate { pair, .. } => self.on_cross_safe_update(pair).await,
            SuperchainEvent::FinalizedL2Update { seal, .. } => self.on_finalized_l2(seal).await,
            SuperchainEvent::LocalSafeOutOfSync { error, l1_ref, .. } => {
                self.resetter.reset_signal(error, l1_ref).await
            }
            SuperchainEvent::ChainRewound { .. } => self.resetter.reset_to_cross_safe().await,
        };

        if let Err(err) = result {
            debug!(target: "supervisor::syncnode", chain_id = %self.chain_id, %err, "Supervisor event not applied");
        }
        true
    }

    /// Forwards the new cross-unsafe head to the managed node.
    pub async fn on_cross_unsafe_update(&self, seal: &BlockSeal) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        trace!(target: "supervisor::syncnode", %chain_id, %seal, "Updating cross unsafe block");

        self.call(self.client.update_cross_unsafe(seal.id())).await.inspect_err(|err| {
            warn!(target: "supervisor::syncnode", %chain_id, %err, %seal, "Node failed to update cross unsafe")
        })?;
        Ok(())
    }

    /// Forwards the new cross-safe head and its source to the managed node.
    pub async fn on_cross_safe_update(
        &self,
        pair: &DerivedSealPair,
    ) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        trace!(target: "supervisor::syncnode", %chain_id, %pair, "Updating cross safe block");

        let ids = pair.ids();
        self.call(self.client.update_cross_safe(ids.derived, ids.source))
            .await
            .inspect_err(|err| {
                warn!(target: "supervisor::syncnode", %chain_id, %err, %pair, "Node failed to update cross safe")
            })?;
        Ok(())
    }

    /// Forwards the new finalized head to the managed node.
    pub async fn on_finalized_l2(&self, seal: &BlockSeal) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        trace!(target: "supervisor::syncnode", %chain_id, %seal, "Updating finalized block");

        self.call(self.client.update_finalized(seal.id())).await.inspect_err(|err| {
            warn!(target: "supervisor::syncnode", %chain_id, %err, %seal, "Node failed to update finalized")
        })?;
        Ok(())
    }

    /// Asks the managed node to replace the derived block of `candidate`.
    ///
    /// The node answers later with a block replacement event.
    pub async fn on_invalidate_local_safe(
        &self,
        candidate: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        debug!(target: "supervisor::syncnode", %chain_id, %candidate, "Invalidating local safe block");

        self.call(self.client.invalidate_block(BlockSeal::from(candidate.derived)))
            .await
            .inspect_err(|err| {
                warn!(target: "supervisor::syncnode", %chain_id, %err, %candidate, "Node failed to invalidate block")
            })?;
        Ok(())
    }

    /// Sends `event` to the rest of the supervisor, waiting for capacity until cancelled.
    async fn emit(&self, event: ChainEvent) -> Result<(), ManagedNodeError> {
        let chain_id = event.chain_id();
        select! {
            biased;
            _ = self.cancel_token.cancelled() => {
                debug!(target: "supervisor::syncnode", %chain_id, "Chain event dropped on shutdown");
                Err(DeadlineError::Cancelled.into())
            }
            sent = self.chain_event_sender.send(event) => sent.map_err(|err| {
                warn!(target: "supervisor::syncnode", %chain_id, %err, "Failed to send chain event");
                ManagedNodeError::ChannelSendFailed(err.to_string())
            }),
        }
    }

    async fn call<T, Fut>(&self, call: Fut) -> Result<T, ClientError>
    where
        Fut: Future<Output = Result<T, ClientError>>,
    {
        with_deadline(&self.cancel_token, self.node_timeout, call).await
    }
}

#[async_trait]
impl<C, O> SubscriptionHandler for ManagedNode<C, O>
where
    C: ManagedNodeClient + 'static,
    O: SafetyOracle + 'static,
{
    async fn handle_exhaust_l1(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        trace!(
            target: "supervisor::syncnode",
            %chain_id,
            %derived_ref_pair,
            "Handling L1 exhaust event"
        );

        let next_block_number = derived_ref_pair.source.number + 1;
        let next_block = match with_deadline(
            &self.cancel_token,
            self.oracle_timeout,
            self.oracle.l1_block_ref_by_number(next_block_number),
        )
        .await
        {
            Ok(block) => block,
            Err(OracleError::NotFound) => {
                debug!(target: "supervisor::syncnode", %chain_id, next_block_number, "Next L1 block not available yet");
                return Ok(());
            }
            Err(err) => {
                error!(target: "supervisor::syncnode", %chain_id, %err, next_block_number, "Failed to fetch next L1 block");
                return Err(err.into());
            }
        };

        if next_block.parent_hash != derived_ref_pair.source.hash {
            // the node recovers through a reset if the L1 chain reorged
            debug!(
                target: "supervisor::syncnode",
                %chain_id,
                %next_block,
                current_source = %derived_ref_pair.source,
                "Parent hash mismatch. Possible reorg detected"
            );
        }

        self.call(self.client.provide_l1(next_block)).await.inspect_err(|err| {
            error!(
                target: "supervisor::syncnode",
                %chain_id,
                %next_block,
                %err,
                "Failed to provide L1 block"
            );
        })?;
        Ok(())
    }

    async fn handle_reset(&self, reset_id: &str) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        if reset_id.contains(ENGINE_RESET_REQUIRED) {
            warn!(target: "supervisor::syncnode", %chain_id, reset_id, "Node requires an engine reset");
            return Ok(());
        }

        debug!(target: "supervisor::syncnode", %chain_id, reset_id, "Handling reset event");
        self.resetter.reset_signal(&OracleError::FutureData, &BlockInfo::default()).await
    }

    async fn handle_unsafe_block(&self, unsafe_block: &BlockInfo) -> Result<(), ManagedNodeError> {
        trace!(target: "supervisor::syncnode", chain_id = %self.chain_id, %unsafe_block, "Unsafe block event received");

        self.emit(ChainEvent::LocalUnsafeReceived { chain_id: self.chain_id, block: *unsafe_block })
            .await
    }

    async fn handle_derivation_update(
        &self,
        derived_ref_pair: &DerivedRefPair,
    ) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        trace!(
            target: "supervisor::syncnode",
            %chain_id,
            %derived_ref_pair,
            derived_parent = ?derived_ref_pair.derived.parent_id(),
            "Derivation update event received"
        );

        self.emit(ChainEvent::LocalDerived { chain_id, derived: *derived_ref_pair }).await?;

        if let Some(hook) = &self.derivation_hook {
            let acknowledged = with_deadline(
                &self.cancel_token,
                self.oracle_timeout,
                hook.on_local_derived(chain_id, derived_ref_pair),
            )
            .await;
            if let Err(err) = acknowledged {
                warn!(
                    target: "supervisor::syncnode",
                    %chain_id,
                    %err,
                    %derived_ref_pair,
                    "Failed to acknowledge derivation update"
                );
            }
        }
        Ok(())
    }

    async fn handle_replace_block(
        &self,
        replacement: &BlockReplacement,
    ) -> Result<(), ManagedNodeError> {
        trace!(target: "supervisor::syncnode", chain_id = %self.chain_id, %replacement, "Block replacement received");

        self.emit(ChainEvent::ReplaceBlock { chain_id: self.chain_id, replacement: *replacement })
            .await
    }
}
