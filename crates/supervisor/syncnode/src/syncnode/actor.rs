use super::{
    EventBridge, EventSubscription, ManagedNode, ManagedNodeClient, SafetyOracle,
    SubscriptionError,
};
use crate::{SyncNodeConfig, event::SuperchainEvent};
use alloy_primitives::ChainId;
use kona_syncnode_types::SubscriptionEvent;
use std::{future::pending, sync::Arc};
use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runs a [`ManagedNode`]: feeds it the events of its node and of the rest of the supervisor.
///
/// All events are handled by a single task, one at a time.
#[derive(Debug)]
pub struct ManagedNodeActor<C, O> {
    node: Arc<ManagedNode<C, O>>,
    node_events: Option<mpsc::Receiver<SubscriptionEvent>>,
    subscriptions: Vec<EventSubscription>,
    watchers: Vec<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl<C, O> ManagedNodeActor<C, O>
where
    C: ManagedNodeClient + 'static,
    O: SafetyOracle + 'static,
{
    /// Creates a new [`ManagedNodeActor`], subscribing to node events unless disabled in
    /// `config`.
    ///
    /// The actor shares the cancellation token of `node`. Must be called within a tokio
    /// runtime.
    pub fn new(node: Arc<ManagedNode<C, O>>, config: &SyncNodeConfig) -> Self {
        let chain_id = node.chain_id();
        let cancel_token = node.cancel_token().clone();

        let mut actor = Self {
            node,
            node_events: None,
            subscriptions: Vec::new(),
            watchers: Vec::new(),
            dispatcher: None,
            cancel_token,
        };

        if config.subscribe {
            let (queue_tx, queue_rx) = mpsc::channel(config.event_queue_capacity.max(1));
            let bridge = EventBridge::new(
                chain_id,
                actor.node.client().clone(),
                config,
                actor.cancel_token.clone(),
            );

            let mut subscription = bridge.subscribe(queue_tx);
            if let Some(errors) = subscription.take_errors() {
                actor.watchers.push(spawn_watcher(chain_id, errors, actor.cancel_token.clone()));
            }
            actor.subscriptions.push(subscription);
            actor.node_events = Some(queue_rx);
        } else {
            info!(target: "supervisor::syncnode_actor", %chain_id, "Node event subscription disabled");
        }

        actor
    }

    /// Starts handling events of the node and, if given, events received on `bus_rx`.
    ///
    /// Does nothing if already started.
    pub fn start(&mut self, bus_rx: Option<mpsc::Receiver<SuperchainEvent>>) {
        if self.dispatcher.is_some() {
            debug!(target: "supervisor::syncnode_actor", chain_id = %self.node.chain_id(), "Managed node already started");
            return;
        }

        self.dispatcher = Some(tokio::spawn(run_dispatch_loop(
            self.node.clone(),
            self.node_events.take(),
            bus_rx,
            self.cancel_token.clone(),
        )));
    }

    /// Stops all tasks of the actor and releases its subscriptions.
    ///
    /// No event is handled once this returns.
    pub async fn close(mut self) {
        let chain_id = self.node.chain_id();
        self.cancel_token.cancel();

        if let Some(dispatcher) = self.dispatcher.take()
            && let Err(err) = dispatcher.await
        {
            error!(target: "supervisor::syncnode_actor", %chain_id, %err, "Dispatch task failed");
        }
        for watcher in self.watchers.drain(..) {
            if let Err(err) = watcher.await {
                error!(target: "supervisor::syncnode_actor", %chain_id, %err, "Subscription watcher failed");
            }
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe().await;
        }

        info!(target: "supervisor::syncnode_actor", %chain_id, "Managed node closed");
    }
}

async fn run_dispatch_loop<C, O>(
    node: Arc<ManagedNode<C, O>>,
    mut node_events: Option<mpsc::Receiver<SubscriptionEvent>>,
    mut bus_rx: Option<mpsc::Receiver<SuperchainEvent>>,
    cancel_token: CancellationToken,
) where
    C: ManagedNodeClient + 'static,
    O: SafetyOracle + 'static,
{
    let chain_id = node.chain_id();
    info!(target: "supervisor::syncnode_actor", %chain_id, "Starting dispatch task for managed node");

    loop {
        select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!(target: "supervisor::syncnode_actor", %chain_id, "Cancellation requested, shutting down dispatch task");
                return;
            }
            event = recv_or_pending(&mut node_events) => match event {
                Some(event) => node.on_node_event(event.data.as_ref()).await,
                None => {
                    debug!(target: "supervisor::syncnode_actor", %chain_id, "Node event queue closed");
                    node_events = None;
                }
            },
            event = recv_or_pending(&mut bus_rx) => match event {
                Some(event) => {
                    node.on_event(&event).await;
                }
                None => {
                    debug!(target: "supervisor::syncnode_actor", %chain_id, "Supervisor event channel closed");
                    bus_rx = None;
                }
            },
        }
    }
}

/// Receives from `rx`, staying pending forever without a receiver.
async fn recv_or_pending<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

fn spawn_watcher(
    chain_id: ChainId,
    errors: oneshot::Receiver<SubscriptionError>,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancel_token.cancelled() => {}
            result = errors => {
                if let Ok(err) = result {
                    error!(target: "supervisor::syncnode_actor", %chain_id, %err, "Subscription error");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::ChainEvent,
        syncnode::{
            ClientError, EventStream,
            mocks::{MockClient, MockOracle, block},
        },
    };
    use futures::{StreamExt, stream};
    use kona_syncnode_types::{BlockSeal, ManagedEvent};
    use mockall::predicate::eq;

    const CHAIN_ID: ChainId = 10;

    fn node(
        client: MockClient,
    ) -> (Arc<ManagedNode<MockClient, MockOracle>>, mpsc::Receiver<ChainEvent>) {
        node_with_capacity(client, 16)
    }

    fn node_with_capacity(
        client: MockClient,
        capacity: usize,
    ) -> (Arc<ManagedNode<MockClient, MockOracle>>, mpsc::Receiver<ChainEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let node = ManagedNode::new(
            CHAIN_ID,
            Arc::new(client),
            Arc::new(MockOracle::new()),
            tx,
            &SyncNodeConfig::default(),
            CancellationToken::new(),
        );
        (Arc::new(node), rx)
    }

    fn unsafe_event(number: u64) -> SubscriptionEvent {
        ManagedEvent { unsafe_block: Some(block(number)), ..Default::default() }.into()
    }

    fn open_stream(events: Vec<SubscriptionEvent>) -> EventStream {
        stream::iter(events.into_iter().map(Ok)).chain(stream::pending()).boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_events_are_dispatched() {
        let mut client = MockClient::new();
        client
            .expect_subscribe_events()
            .returning(|| Ok(open_stream(vec![unsafe_event(20), unsafe_event(21)])));

        let (node, mut chain_events) = node(client);
        let mut actor = ManagedNodeActor::new(node, &SyncNodeConfig::default());
        actor.start(None);

        assert_eq!(
            chain_events.recv().await,
            Some(ChainEvent::LocalUnsafeReceived { chain_id: CHAIN_ID, block: block(20) })
        );
        assert_eq!(
            chain_events.recv().await,
            Some(ChainEvent::LocalUnsafeReceived { chain_id: CHAIN_ID, block: block(21) })
        );

        actor.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_polled_events_are_dispatched() {
        let mut client = MockClient::new();
        client.expect_subscribe_events().returning(|| Err(ClientError::NotificationsUnsupported));
        let mut pulled = 0;
        client.expect_pull_event().returning(move || {
            pulled += 1;
            if pulled == 1 { Ok(unsafe_event(20)) } else { Err(ClientError::EndOfStream) }
        });

        let (node, mut chain_events) = node(client);
        let mut actor = ManagedNodeActor::new(node, &SyncNodeConfig::default());
        actor.start(None);

        assert_eq!(
            chain_events.recv().await,
            Some(ChainEvent::LocalUnsafeReceived { chain_id: CHAIN_ID, block: block(20) })
        );

        actor.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_bus_events_for_this_chain_are_handled() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let mut client = MockClient::new();
        client.expect_subscribe_events().times(0);
        client
            .expect_update_cross_unsafe()
            .with(eq(block(50).id()))
            .times(1)
            .returning(move |_| {
                let _ = done_tx.send(());
                Ok(())
            });

        let (node, _chain_events) = node(client);
        let config = SyncNodeConfig { subscribe: false, ..Default::default() };
        let mut actor = ManagedNodeActor::new(node.clone(), &config);

        let (bus_tx, bus_rx) = mpsc::channel(4);
        actor.start(Some(bus_rx));

        let seal = BlockSeal::from(block(50));
        bus_tx.send(SuperchainEvent::CrossUnsafeUpdate { chain_id: 11, seal }).await.unwrap();
        bus_tx.send(SuperchainEvent::CrossUnsafeUpdate { chain_id: CHAIN_ID, seal }).await.unwrap();

        assert_eq!(done_rx.recv().await, Some(()));
        actor.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_every_task() {
        let mut client = MockClient::new();
        client.expect_subscribe_events().returning(|| Err(ClientError::NotificationsUnsupported));
        client.expect_pull_event().returning(|| Err(ClientError::EndOfStream));

        let (node, _chain_events) = node(client);
        let mut actor = ManagedNodeActor::new(node.clone(), &SyncNodeConfig::default());

        let (bus_tx, bus_rx) = mpsc::channel(4);
        actor.start(Some(bus_rx));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        actor.close().await;

        assert!(node.cancel_token().is_cancelled());
        assert_eq!(Arc::strong_count(&node), 1);
        // held by the node and its resetter only
        assert_eq!(Arc::strong_count(node.client()), 2);
        assert!(bus_tx.send(SuperchainEvent::ChainRewound { chain_id: CHAIN_ID }).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_with_undrained_chain_events() {
        let mut client = MockClient::new();
        client.expect_subscribe_events().returning(|| {
            Ok(open_stream(vec![unsafe_event(20), unsafe_event(21), unsafe_event(22)]))
        });

        let (node, _chain_events) = node_with_capacity(client, 1);
        let mut actor = ManagedNodeActor::new(node.clone(), &SyncNodeConfig::default());
        actor.start(None);
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let closed = tokio::time::timeout(std::time::Duration::from_secs(60), actor.close()).await;
        assert!(closed.is_ok());
        assert_eq!(Arc::strong_count(&node), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_without_start() {
        let mut client = MockClient::new();
        client.expect_subscribe_events().returning(|| Ok(open_stream(Vec::new())));

        let (node, _chain_events) = node(client);
        let actor = ManagedNodeActor::new(node.clone(), &SyncNodeConfig::default());

        actor.close().await;
        assert_eq!(Arc::strong_count(&node), 1);
    }
}
