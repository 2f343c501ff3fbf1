//! Supervisor syncnode module
//! This module keeps a managed node in sync with the supervisor's view of its chain.

mod actor;
pub use actor::ManagedNodeActor;

mod bridge;
pub use bridge::{EventBridge, EventSubscription};

mod dispatcher;
pub use dispatcher::dispatch_managed_event;

mod node;
pub use node::ManagedNode;

mod error;
pub use error::{
    AuthenticationError, ClientError, DeadlineError, ManagedNodeError, OracleError,
    ResetErrorCode, ResolveConflictError, SubscriptionError,
};

mod traits;
pub use traits::{DerivationHook, SafetyOracle, SubscriptionHandler};

mod client;
pub use client::{Client, ClientConfig, EventStream, ManagedNodeClient};

mod jsonrpsee;
pub use self::jsonrpsee::{ManagedModeApiClient, SubscriptionTopic};

pub(super) mod metrics;
mod resetter;
mod utils;

#[cfg(test)]
mod mocks;
