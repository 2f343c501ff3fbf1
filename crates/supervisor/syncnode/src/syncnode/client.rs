use super::{
    AuthenticationError, ClientError,
    jsonrpsee::{ManagedModeApiClient, SubscriptionTopic},
    metrics::Metrics,
};
use alloy_eips::BlockNumHash;
use alloy_rpc_types_engine::{Claims, JwtSecret};
use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use jsonrpsee::{
    types::ErrorCode,
    ws_client::{HeaderMap, HeaderValue, WsClient, WsClientBuilder},
};
use kona_syncnode_types::{BlockInfo, BlockSeal, SubscriptionEvent};
use std::{fmt::Debug, future::Future, sync::Arc, time::Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Stream of events pushed by a managed node.
pub type EventStream = BoxStream<'static, Result<SubscriptionEvent, ClientError>>;

/// Trait for a managed node client that provides various methods to interact with the node.
#[async_trait]
pub trait ManagedNodeClient: Send + Sync + Debug {
    /// Subscribes to [`SubscriptionEvent`]s from the managed node.
    ///
    /// Fails with [`ClientError::NotificationsUnsupported`] if the node cannot push events.
    async fn subscribe_events(&self) -> Result<EventStream, ClientError>;

    /// Pulls the next pending event from the managed node.
    ///
    /// Fails with [`ClientError::EndOfStream`] if no event is pending.
    async fn pull_event(&self) -> Result<SubscriptionEvent, ClientError>;

    /// Updates the cross-unsafe block ID in the managed node.
    async fn update_cross_unsafe(&self, cross_unsafe_id: BlockNumHash) -> Result<(), ClientError>;

    /// Updates the cross-safe block ID in the managed node.
    async fn update_cross_safe(
        &self,
        derived_id: BlockNumHash,
        source_id: BlockNumHash,
    ) -> Result<(), ClientError>;

    /// Updates the finalized block ID in the managed node.
    async fn update_finalized(&self, finalized_id: BlockNumHash) -> Result<(), ClientError>;

    /// Resets the node state to the provided block IDs.
    ///
    /// A node that does not accept the safe block answers with one of the
    /// [`ResetErrorCode`](super::ResetErrorCode)s.
    async fn reset(
        &self,
        unsafe_id: BlockNumHash,
        safe_id: BlockNumHash,
        finalized_id: BlockNumHash,
    ) -> Result<(), ClientError>;

    /// Invalidates a block in the managed node.
    async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ClientError>;

    /// Provides the next L1 [`BlockInfo`] to the managed node.
    async fn provide_l1(&self, block_info: BlockInfo) -> Result<(), ClientError>;
}

/// [`ClientConfig`] sets the configuration for the managed node client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The URL + port of the managed node
    pub url: String,
    /// jwt secret for the managed node interop rpc
    pub jwt_secret: JwtSecret,
}

/// WebSocket client for a managed node.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    /// The attached web socket client
    ws_client: Mutex<Option<Arc<WsClient>>>,
}

impl Client {
    /// Creates a new [`Client`] with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Metrics::init_client(&config.url);
        Self { config, ws_client: Mutex::new(None) }
    }

    /// Creates authentication headers using JWT secret.
    fn create_auth_headers(&self) -> Result<HeaderMap, ClientError> {
        let claims = Claims::with_current_timestamp();
        let token = self.config.jwt_secret.encode(&claims).map_err(|err| {
            error!(target: "supervisor::managed_node", %err, "Failed to encode JWT claims");
            AuthenticationError::InvalidJwt
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
                error!(target: "supervisor::managed_node", %err, "Invalid authorization header");
                AuthenticationError::InvalidHeader
            })?,
        );

        Ok(headers)
    }

    /// Returns the WebSocket client, connecting again if the previous connection dropped.
    async fn ws_client(&self) -> Result<Arc<WsClient>, ClientError> {
        let mut guard = self.ws_client.lock().await;
        if let Some(client) = guard.as_ref().filter(|client| client.is_connected()) {
            return Ok(client.clone());
        }

        let headers = self.create_auth_headers()?;
        info!(target: "supervisor::managed_node", ws_url = self.config.url, "Creating a new web socket client");
        let client = WsClientBuilder::default().set_headers(headers).build(&self.config.url).await?;

        let client = Arc::new(client);
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn observe<T, Fut>(&self, method: &'static str, call: Fut) -> Result<T, ClientError>
    where
        Fut: Future<Output = Result<T, jsonrpsee::core::ClientError>>,
    {
        let started = Instant::now();
        let result = call.await;
        Metrics::record_rpc_request(method, &self.config.url, started.elapsed(), result.is_ok());
        Ok(result?)
    }
}

#[async_trait]
impl ManagedNodeClient for Client {
    async fn subscribe_events(&self) -> Result<EventStream, ClientError> {
        let client = self.ws_client().await?;
        let subscription = self
            .observe(
                Metrics::RPC_METHOD_SUBSCRIBE_EVENTS,
                client.subscribe_events(SubscriptionTopic::Events),
            )
            .await
            .map_err(|err| match err {
                ClientError::Client(jsonrpsee::core::ClientError::Call(ref obj))
                    if obj.code() == ErrorCode::MethodNotFound.code() =>
                {
                    warn!(target: "supervisor::managed_node", %err, "Managed node does not support event subscriptions");
                    ClientError::NotificationsUnsupported
                }
                ClientError::Client(jsonrpsee::core::ClientError::HttpNotImplemented) => {
                    ClientError::NotificationsUnsupported
                }
                err => err,
            })?;

        Ok(subscription.map(|event| event.map_err(ClientError::from)).boxed())
    }

    async fn pull_event(&self) -> Result<SubscriptionEvent, ClientError> {
        let client = self.ws_client().await?;
        self.observe(Metrics::RPC_METHOD_PULL_EVENT, client.pull_event())
            .await?
            .map(SubscriptionEvent::from)
            .ok_or(ClientError::EndOfStream)
    }

    async fn update_cross_unsafe(&self, cross_unsafe_id: BlockNumHash) -> Result<(), ClientError> {
        let client = self.ws_client().await?;
        self.observe(
            Metrics::RPC_METHOD_UPDATE_CROSS_UNSAFE,
            client.update_cross_unsafe(cross_unsafe_id),
        )
        .await
    }

    async fn update_cross_safe(
        &self,
        derived_id: BlockNumHash,
        source_id: BlockNumHash,
    ) -> Result<(), ClientError> {
        let client = self.ws_client().await?;
        self.observe(
            Metrics::RPC_METHOD_UPDATE_CROSS_SAFE,
            client.update_cross_safe(derived_id, source_id),
        )
        .await
    }

    async fn update_finalized(&self, finalized_id: BlockNumHash) -> Result<(), ClientError> {
        let client = self.ws_client().await?;
        self.observe(Metrics::RPC_METHOD_UPDATE_FINALIZED, client.update_finalized(finalized_id))
            .await
    }

    async fn reset(
        &self,
        unsafe_id: BlockNumHash,
        safe_id: BlockNumHash,
        finalized_id: BlockNumHash,
    ) -> Result<(), ClientError> {
        let client = self.ws_client().await?;
        self.observe(Metrics::RPC_METHOD_RESET, client.reset(unsafe_id, safe_id, finalized_id))
            .await
    }

    async fn invalidate_block(&self, seal: BlockSeal) -> Result<(), ClientError> {
        let client = self.ws_client().await?;
        self.observe(Metrics::RPC_METHOD_INVALIDATE_BLOCK, client.invalidate_block(seal)).await
    }

    async fn provide_l1(&self, block_info: BlockInfo) -> Result<(), ClientError> {
        let client = self.ws_client().await?;
        self.observe(Metrics::RPC_METHOD_PROVIDE_L1, client.provide_l1(block_info)).await
    }
}
