use super::{
    ClientError, ManagedNodeClient, ManagedNodeError, OracleError, ResolveConflictError,
    SafetyOracle, metrics::Metrics, utils::with_deadline,
};
use crate::SyncNodeConfig;
use alloy_eips::BlockNumHash;
use alloy_primitives::{B256, ChainId};
use kona_syncnode_types::BlockInfo;
use std::{future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives the managed node back to a state consistent with the supervisor's view.
#[derive(Debug)]
pub(super) struct Resetter<C, O> {
    chain_id: ChainId,
    client: Arc<C>,
    oracle: Arc<O>,
    node_timeout: Duration,
    oracle_timeout: Duration,
    max_walk_back_attempts: usize,
    cancel_token: CancellationToken,
}

impl<C, O> Resetter<C, O>
where
    C: ManagedNodeClient + 'static,
    O: SafetyOracle + 'static,
{
    /// Creates a new [`Resetter`] for the given chain.
    pub(super) fn new(
        chain_id: ChainId,
        client: Arc<C>,
        oracle: Arc<O>,
        config: &SyncNodeConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Metrics::init_resetter(chain_id);
        Self {
            chain_id,
            client,
            oracle,
            node_timeout: config.node_timeout,
            oracle_timeout: config.oracle_timeout,
            max_walk_back_attempts: config.max_walk_back_attempts,
            cancel_token,
        }
    }

    /// Reacts to an inconsistency between the node's chain and the supervisor's view.
    ///
    /// `trigger` selects the recovery: a conflict searches for a common ancestor, future
    /// and out-of-order data rewind the node to the local-safe head. Any other error is
    /// ignored.
    pub(super) async fn reset_signal(
        &self,
        trigger: &OracleError,
        l1_ref: &BlockInfo,
    ) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        let local_unsafe = self.read(self.oracle.local_unsafe(chain_id)).await.inspect_err(
            |err| warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve local-unsafe"),
        )?;
        let finalized = self.read(self.oracle.finalized(chain_id)).await.inspect_err(
            |err| warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve finalized"),
        )?;

        match trigger {
            OracleError::Conflict => {
                self.resolve_conflict(l1_ref, local_unsafe, finalized).await.inspect_err(|err| {
                    warn!(
                        target: "supervisor::syncnode_resetter",
                        %chain_id,
                        %err,
                        ?local_unsafe,
                        finalized = ?finalized,
                        "Failed to resolve conflict"
                    )
                })?;
            }
            OracleError::FutureData => {
                // a missing local-safe head still rewinds the node, to the zero block
                let local_safe = self
                    .read(self.oracle.local_safe(chain_id))
                    .await
                    .inspect_err(|err| {
                        warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve local-safe")
                    })
                    .unwrap_or_default();

                debug!(
                    target: "supervisor::syncnode_resetter",
                    %chain_id,
                    ?local_unsafe,
                    safe = ?local_safe.derived,
                    finalized = ?finalized,
                    "Node detected future block, resetting"
                );
                self.send_reset(Metrics::RESET_TRIGGER_FUTURE, local_unsafe, local_safe.derived, finalized)
                    .await?;
            }
            OracleError::OutOfOrder => {
                let local_safe = self.read(self.oracle.local_safe(chain_id)).await.inspect_err(
                    |err| warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve local-safe"),
                )?;

                warn!(
                    target: "supervisor::syncnode_resetter",
                    %chain_id,
                    ?local_unsafe,
                    finalized = ?finalized,
                    "Node detected out of order block"
                );
                self.send_reset(
                    Metrics::RESET_TRIGGER_OUT_OF_ORDER,
                    local_unsafe,
                    local_safe.derived,
                    finalized,
                )
                .await?;
            }
            other => {
                debug!(target: "supervisor::syncnode_resetter", %chain_id, trigger = %other, "Ignoring reset signal");
            }
        }
        Ok(())
    }

    /// Resets the node to the supervisor's cross-safe head.
    ///
    /// A chain without a finalized block yet is reset with block zero as finalized.
    pub(super) async fn reset_to_cross_safe(&self) -> Result<(), ManagedNodeError> {
        let chain_id = self.chain_id;
        let local_unsafe = self.read(self.oracle.local_unsafe(chain_id)).await.inspect_err(
            |err| warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve local-unsafe"),
        )?;
        let cross_safe = self.read(self.oracle.cross_safe(chain_id)).await.inspect_err(
            |err| warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve cross-safe"),
        )?;
        let finalized = match self.read(self.oracle.finalized(chain_id)).await {
            Ok(finalized) => finalized,
            Err(OracleError::FutureData) => BlockNumHash::new(0, B256::ZERO),
            Err(err) => {
                warn!(target: "supervisor::syncnode_resetter", %chain_id, %err, "Failed to retrieve finalized");
                return Err(err.into());
            }
        };

        info!(
            target: "supervisor::syncnode_resetter",
            %chain_id,
            ?local_unsafe,
            cross_safe = ?cross_safe.derived,
            finalized = ?finalized,
            "Resetting managed node to cross-safe"
        );
        self.send_reset(Metrics::RESET_TRIGGER_REWOUND, local_unsafe, cross_safe.derived, finalized)
            .await?;
        Ok(())
    }

    /// Searches for the newest block both the node and the supervisor agree on and resets
    /// the node to it.
    ///
    /// The first candidate is the safe block derived from `l1_ref`. While the node rejects
    /// a candidate as unknown or conflicting, the search moves one block number down,
    /// never reaching `finalized`.
    pub(super) async fn resolve_conflict(
        &self,
        l1_ref: &BlockInfo,
        local_unsafe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> Result<(), ResolveConflictError> {
        let (safe, depth) = self.walk_back(l1_ref, local_unsafe, finalized).await?;

        Metrics::record_walk_back_depth(self.chain_id, depth);
        info!(
            target: "supervisor::syncnode_resetter",
            chain_id = %self.chain_id,
            ?safe,
            depth,
            "Found common ancestor"
        );
        Ok(())
    }

    /// Returns the safe block the node accepted and how many blocks below the first
    /// candidate it lies.
    async fn walk_back(
        &self,
        l1_ref: &BlockInfo,
        local_unsafe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> Result<(BlockNumHash, u64), ResolveConflictError> {
        let chain_id = self.chain_id;
        let safe = self.safe_derived_at(l1_ref.id()).await?;

        match self.try_reset(local_unsafe, safe, finalized).await {
            Ok(()) => return Ok((safe, 0)),
            Err(err) if err.reset_error_code().is_some() => {
                debug!(
                    target: "supervisor::syncnode_resetter",
                    %chain_id,
                    %err,
                    safe = safe.number,
                    "Node rejected safe block, walking back"
                );
            }
            Err(err) => return Err(ResolveConflictError::ResetFailed { block: safe.number, source: err }),
        }

        let mut current = safe.number;
        for attempt in 1..=self.max_walk_back_attempts {
            current = current.saturating_sub(1);
            if current <= finalized.number {
                return Err(ResolveConflictError::ReachedFinalized(finalized.number));
            }

            let candidate = self.safe_derived_at(BlockNumHash::new(current, B256::ZERO)).await?;
            match self.try_reset(local_unsafe, candidate, finalized).await {
                Ok(()) => return Ok((candidate, attempt as u64)),
                Err(err) if err.reset_error_code().is_some() => continue,
                Err(err) => return Err(ResolveConflictError::ResetFailed { block: current, source: err }),
            }
        }

        Err(ResolveConflictError::WalkBackExhausted(self.max_walk_back_attempts))
    }

    async fn safe_derived_at(&self, source: BlockNumHash) -> Result<BlockNumHash, ResolveConflictError> {
        self.read(self.oracle.safe_derived_at(self.chain_id, source))
            .await
            .map_err(|err| ResolveConflictError::SafeBlockLookup { block: source, source: err })
    }

    async fn try_reset(
        &self,
        local_unsafe: BlockNumHash,
        safe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> Result<(), ClientError> {
        debug!(
            target: "supervisor::syncnode_resetter",
            chain_id = %self.chain_id,
            ?local_unsafe,
            safe = ?safe,
            finalized = ?finalized,
            "Attempting reset"
        );
        let result = with_deadline(
            &self.cancel_token,
            self.node_timeout,
            self.client.reset(local_unsafe, safe, finalized),
        )
        .await;
        Metrics::record_reset(self.chain_id, Metrics::RESET_TRIGGER_CONFLICT, result.is_ok());
        result
    }

    async fn send_reset(
        &self,
        trigger: &'static str,
        local_unsafe: BlockNumHash,
        safe: BlockNumHash,
        finalized: BlockNumHash,
    ) -> Result<(), ClientError> {
        let result = with_deadline(
            &self.cancel_token,
            self.node_timeout,
            self.client.reset(local_unsafe, safe, finalized),
        )
        .await
        .inspect_err(|err| {
            warn!(target: "supervisor::syncnode_resetter", chain_id = %self.chain_id, %err, "Node failed to reset")
        });
        Metrics::record_reset(self.chain_id, trigger, result.is_ok());
        result
    }

    async fn read<T, Fut>(&self, read: Fut) -> Result<T, OracleError>
    where
        Fut: Future<Output = Result<T, OracleError>>,
    {
        with_deadline(&self.cancel_token, self.oracle_timeout, read).await
    }
}
