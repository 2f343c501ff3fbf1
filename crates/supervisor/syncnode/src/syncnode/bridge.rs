//! Feeds events of a managed node into a local queue.

use super::{
    ClientError, DeadlineError, EventStream, ManagedNodeClient, SubscriptionError,
    utils::{sleep_or_cancelled, with_deadline},
};
use crate::SyncNodeConfig;
use alloy_primitives::ChainId;
use futures::StreamExt;
use kona_syncnode_types::SubscriptionEvent;
use std::{sync::Arc, time::Duration};
use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// [`EventBridge`] moves events from a managed node into a bounded queue.
///
/// Events are streamed through a subscription when the node supports it and pulled at a fixed
/// interval otherwise.
#[derive(Debug)]
pub struct EventBridge<C> {
    chain_id: ChainId,
    client: Arc<C>,
    node_timeout: Duration,
    poll_interval: Duration,
    resubscribe_backoff: Duration,
    cancel_token: CancellationToken,
}

impl<C> EventBridge<C>
where
    C: ManagedNodeClient + 'static,
{
    /// Creates a new [`EventBridge`]. Feeds stop once `cancel_token` is cancelled.
    pub fn new(
        chain_id: ChainId,
        client: Arc<C>,
        config: &SyncNodeConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            chain_id,
            client,
            node_timeout: config.node_timeout,
            poll_interval: config.poll_interval,
            resubscribe_backoff: config.resubscribe_backoff,
            cancel_token,
        }
    }

    /// Starts feeding node events into `queue`.
    ///
    /// The feed waits for free capacity in `queue` and ends with
    /// [`SubscriptionError::QueueClosed`] once the receiver is dropped.
    pub fn subscribe(&self, queue: mpsc::Sender<SubscriptionEvent>) -> EventSubscription {
        let cancel_token = self.cancel_token.child_token();
        let (errors_tx, errors_rx) = oneshot::channel();

        let feed = Feed {
            chain_id: self.chain_id,
            client: self.client.clone(),
            queue,
            node_timeout: self.node_timeout,
            poll_interval: self.poll_interval,
            resubscribe_backoff: self.resubscribe_backoff,
            cancel_token: cancel_token.clone(),
        };

        let handle = tokio::spawn(async move {
            if let Err(err) = feed.run().await {
                // nobody may be watching
                let _ = errors_tx.send(err);
            }
        });

        EventSubscription { errors: Some(errors_rx), cancel_token, handle }
    }
}

/// Handle of a running event feed.
#[derive(Debug)]
pub struct EventSubscription {
    errors: Option<oneshot::Receiver<SubscriptionError>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventSubscription {
    /// Takes the channel receiving the error that ended the feed.
    ///
    /// Returns `None` if it was taken before.
    pub const fn take_errors(&mut self) -> Option<oneshot::Receiver<SubscriptionError>> {
        self.errors.take()
    }

    /// Stops the feed and waits for it to finish.
    pub async fn unsubscribe(self) {
        self.cancel_token.cancel();
        if let Err(err) = self.handle.await {
            error!(target: "supervisor::syncnode_bridge", %err, "Event feed task failed");
        }
    }
}

struct Feed<C> {
    chain_id: ChainId,
    client: Arc<C>,
    queue: mpsc::Sender<SubscriptionEvent>,
    node_timeout: Duration,
    poll_interval: Duration,
    resubscribe_backoff: Duration,
    cancel_token: CancellationToken,
}

impl<C: ManagedNodeClient> Feed<C> {
    async fn run(&self) -> Result<(), SubscriptionError> {
        let chain_id = self.chain_id;
        info!(target: "supervisor::syncnode_bridge", %chain_id, "Starting event feed");

        loop {
            let subscribed = with_deadline(
                &self.cancel_token,
                self.node_timeout,
                self.client.subscribe_events(),
            )
            .await;

            match subscribed {
                Ok(stream) => {
                    debug!(target: "supervisor::syncnode_bridge", %chain_id, "Subscribed to node events");
                    if !self.stream(stream).await? {
                        return Ok(());
                    }
                }
                Err(ClientError::NotificationsUnsupported) => {
                    warn!(
                        target: "supervisor::syncnode_bridge",
                        %chain_id,
                        "No RPC notification support detected, falling back to polling"
                    );
                    return self.poll().await;
                }
                Err(ClientError::Deadline(DeadlineError::Cancelled)) => return Ok(()),
                Err(err) => {
                    error!(
                        target: "supervisor::syncnode_bridge",
                        %chain_id,
                        %err,
                        backoff = ?self.resubscribe_backoff,
                        "Failed to subscribe to node events"
                    );
                    if !sleep_or_cancelled(&self.cancel_token, self.resubscribe_backoff).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Forwards the stream until it fails. Returns `false` once cancelled.
    async fn stream(&self, mut stream: EventStream) -> Result<bool, SubscriptionError> {
        let chain_id = self.chain_id;
        loop {
            let item = select! {
                biased;
                _ = self.cancel_token.cancelled() => return Ok(false),
                item = stream.next() => item,
            };

            match item {
                Some(Ok(event)) => {
                    if !self.deliver(event).await? {
                        return Ok(false);
                    }
                }
                Some(Err(err)) => {
                    warn!(target: "supervisor::syncnode_bridge", %chain_id, %err, "RPC subscription failed, restarting now");
                    return Ok(true);
                }
                None => {
                    warn!(target: "supervisor::syncnode_bridge", %chain_id, "Subscription closed by server, restarting now");
                    return Ok(true);
                }
            }
        }
    }

    /// Drains pending events every poll interval.
    async fn poll(&self) -> Result<(), SubscriptionError> {
        let chain_id = self.chain_id;
        while sleep_or_cancelled(&self.cancel_token, self.poll_interval).await {
            loop {
                let pulled =
                    with_deadline(&self.cancel_token, self.node_timeout, self.client.pull_event())
                        .await;

                match pulled {
                    Ok(event) => {
                        if !self.deliver(event).await? {
                            return Ok(());
                        }
                    }
                    Err(ClientError::EndOfStream) => break,
                    Err(ClientError::Deadline(DeadlineError::Cancelled)) => return Ok(()),
                    Err(err) => {
                        warn!(target: "supervisor::syncnode_bridge", %chain_id, %err, "Failed to pull event");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Queues `event`. Returns `false` if cancelled while waiting for capacity.
    async fn deliver(&self, event: SubscriptionEvent) -> Result<bool, SubscriptionError> {
        select! {
            biased;
            _ = self.cancel_token.cancelled() => Ok(false),
            sent = self.queue.send(event) => sent.map(|_| true).map_err(|_| SubscriptionError::QueueClosed),
        }
    }
}
