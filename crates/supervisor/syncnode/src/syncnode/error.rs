use alloy_eips::BlockNumHash;
use thiserror::Error;

/// Represents various errors that can occur during node management.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManagedNodeError {
    /// Represents an error that occurred while calling the managed node.
    #[error(transparent)]
    ClientError(#[from] ClientError),

    /// Represents an error that occurred while reading the supervisor's safety view.
    #[error(transparent)]
    OracleError(#[from] OracleError),

    /// Represents an error that occurred while sending an event to the channel.
    #[error("failed to send event to channel: {0}")]
    ChannelSendFailed(String),

    /// The conflict with the managed node could not be resolved.
    #[error(transparent)]
    ResolveConflict(#[from] ResolveConflictError),

    /// The managed node was shut down while an event was being handled.
    #[error(transparent)]
    Deadline(#[from] DeadlineError),

    /// Pulling events from the managed node stopped on an error.
    #[error("failed to pull events (pulled any: {pulled_any}): {source}")]
    PullEvents {
        /// Whether at least one event was handled before the failure.
        pulled_any: bool,
        /// The error returned by the managed node.
        source: ClientError,
    },
}

/// A bounded call did not complete.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeadlineError {
    /// The managed node was shut down while the call was in flight.
    #[error("call cancelled")]
    Cancelled,

    /// The call did not complete within its timeout.
    #[error("call timed out")]
    TimedOut,
}

/// Errors returned by the supervisor's safety view.
///
/// Besides reporting failed reads, the variants classify why the managed node's chain is
/// inconsistent with the canonical one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// The requested entry does not exist yet.
    #[error("entry not found")]
    NotFound,

    /// The request is ahead of the known data.
    #[error("future data")]
    FutureData,

    /// The data conflicts with what is known.
    #[error("conflicting data")]
    Conflict,

    /// The data does not extend what is known.
    #[error("data out of order")]
    OutOfOrder,

    /// The read did not complete.
    #[error(transparent)]
    Deadline(#[from] DeadlineError),

    /// Any other failure of the underlying storage.
    #[error("oracle error: {0}")]
    Other(String),
}

/// Error establishing authenticated connection to managed node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Missing valid JWT secret for authentication header.
    #[error("jwt secret not found or invalid")]
    InvalidJwt,
    /// Invalid header format.
    #[error("invalid authorization header")]
    InvalidHeader,
}

/// Represents errors that can occur while interacting with the managed node client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Represents an error returned by the RPC client, including remote errors.
    #[error(transparent)]
    Client(#[from] jsonrpsee::core::ClientError),

    /// Represents an error that occurred while authenticating to the managed node.
    #[error("failed to authenticate: {0}")]
    Authentication(#[from] AuthenticationError),

    /// An event received from the managed node could not be decoded.
    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),

    /// The managed node does not support event subscriptions.
    #[error("notifications not supported")]
    NotificationsUnsupported,

    /// The managed node has no pending event.
    #[error("end of event stream")]
    EndOfStream,

    /// The call did not complete.
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
}

impl ClientError {
    /// Returns the classified reset error code carried by a remote error, if any.
    pub fn reset_error_code(&self) -> Option<ResetErrorCode> {
        match self {
            Self::Client(jsonrpsee::core::ClientError::Call(err)) => {
                ResetErrorCode::try_from(err.code()).ok()
            }
            _ => None,
        }
    }
}

impl PartialEq for ClientError {
    fn eq(&self, other: &Self) -> bool {
        use ClientError::*;
        match (self, other) {
            (Client(a), Client(b)) => a.to_string() == b.to_string(),
            (Authentication(a), Authentication(b)) => a == b,
            (Decode(a), Decode(b)) => a.to_string() == b.to_string(),
            (NotificationsUnsupported, NotificationsUnsupported) => true,
            (EndOfStream, EndOfStream) => true,
            (Deadline(a), Deadline(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ClientError {}

/// Remote error codes a managed node returns when rejecting a reset target.
///
/// A reset rejected with one of these codes may succeed at an older block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::TryFrom)]
#[repr(i32)]
#[try_from(repr)]
pub enum ResetErrorCode {
    /// The node does not know the proposed block.
    BlockNotFound = -39001,
    /// The proposed block conflicts with the node's chain.
    ConflictingBlock = -39002,
}

/// Failure of the walk-back search for a block both the supervisor and the managed node
/// agree on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveConflictError {
    /// The safe block to propose could not be read.
    #[error("failed to retrieve safe block derived at {block:?}: {source}")]
    SafeBlockLookup {
        /// The block the lookup was keyed on.
        block: BlockNumHash,
        /// The failed read.
        source: OracleError,
    },

    /// The managed node rejected a reset for a reason unrelated to the proposed block.
    #[error("error during reset at block {block}: {source}")]
    ResetFailed {
        /// The proposed safe block number.
        block: u64,
        /// The error returned by the managed node.
        source: ClientError,
    },

    /// The walk-back hit the finalized block.
    #[error("reached finalized block {0} without finding common ancestor")]
    ReachedFinalized(u64),

    /// The walk-back gave up.
    #[error("exceeded maximum walk-back attempts ({0})")]
    WalkBackExhausted(usize),
}

/// Terminal error of an event subscription.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The consumer of the event queue is gone.
    #[error("event queue closed")]
    QueueClosed,
}
