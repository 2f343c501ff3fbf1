use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single [`ManagedNode`](crate::syncnode::ManagedNode).
///
/// Durations are encoded as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncNodeConfig {
    /// Upper bound for a single call to the managed node.
    #[serde(with = "duration_ms")]
    pub node_timeout: Duration,

    /// Upper bound for a single read of the supervisor's safety view.
    #[serde(with = "duration_ms")]
    pub oracle_timeout: Duration,

    /// Maximum number of blocks walked back while looking for a common ancestor.
    pub max_walk_back_attempts: usize,

    /// Capacity of the queue between the event feed and the dispatch loop.
    pub event_queue_capacity: usize,

    /// Interval between pulls when the node does not support subscriptions.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,

    /// Delay before retrying a failed subscription.
    #[serde(with = "duration_ms")]
    pub resubscribe_backoff: Duration,

    /// Whether to subscribe to node events. When disabled, events are only consumed
    /// through [`ManagedNode::pull_events`](crate::syncnode::ManagedNode::pull_events).
    pub subscribe: bool,
}

impl Default for SyncNodeConfig {
    fn default() -> Self {
        Self {
            node_timeout: Duration::from_secs(10),
            oracle_timeout: Duration::from_secs(30),
            max_walk_back_attempts: 300,
            event_queue_capacity: 10,
            poll_interval: Duration::from_millis(100),
            resubscribe_backoff: Duration::from_secs(10),
            subscribe: true,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SyncNodeConfig::default();

        assert_eq!(config.node_timeout, Duration::from_secs(10));
        assert_eq!(config.oracle_timeout, Duration::from_secs(30));
        assert_eq!(config.max_walk_back_attempts, 300);
        assert_eq!(config.event_queue_capacity, 10);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.resubscribe_backoff, Duration::from_secs(10));
        assert!(config.subscribe);
    }

    #[test]
    fn test_deserialize_overrides_and_defaults() {
        let json = r#"{ "nodeTimeout": 2500, "maxWalkBackAttempts": 5, "subscribe": false }"#;

        let config: SyncNodeConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.node_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_walk_back_attempts, 5);
        assert!(!config.subscribe);
        assert_eq!(config.oracle_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_serialize_durations_as_millis() {
        let value = serde_json::to_value(SyncNodeConfig::default()).unwrap();

        assert_eq!(value["pollInterval"], 100);
        assert_eq!(value["resubscribeBackoff"], 10_000);
    }
}
