//! Contains the managed node event.

use crate::{BlockInfo, BlockReplacement, DerivedRefPair};
use serde::{Deserialize, Serialize};

/// Event sent by the node to the supervisor to share updates.
///
/// Every field is independent. A single event may carry several updates at once, and an
/// event with no field set carries nothing.
///
/// See: <https://specs.optimism.io/interop/managed-mode.html#node---supervisor>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagedEvent {
    /// The node has determined that it needs a reset. Carries the reason reported by the
    /// node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<String>,

    /// New L2 unsafe block was processed, updating local-unsafe head.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsafe_block: Option<BlockInfo>,

    /// Signals that an L2 block is considered local-safe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_update: Option<DerivedRefPair>,

    /// Emitted when no more L1 Blocks are available.
    /// Ready to take new L1 blocks from supervisor.
    #[serde(rename = "exhaustL1", skip_serializing_if = "Option::is_none")]
    pub exhaust_l1: Option<DerivedRefPair>,

    /// Emitted when a block gets replaced for any reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_block: Option<BlockReplacement>,
}

impl ManagedEvent {
    /// Returns `true` if no update is carried by the event.
    pub const fn is_empty(&self) -> bool {
        self.reset.is_none() &&
            self.unsafe_block.is_none() &&
            self.derivation_update.is_none() &&
            self.exhaust_l1.is_none() &&
            self.replace_block.is_none()
    }
}

impl core::fmt::Display for ManagedEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref reset) = self.reset {
            parts.push(format!("reset: {reset}"));
        }
        if let Some(ref block) = self.unsafe_block {
            parts.push(format!("unsafe_block: {block}"));
        }
        if let Some(ref pair) = self.derivation_update {
            parts.push(format!("derivation_update: {pair}"));
        }
        if let Some(ref pair) = self.exhaust_l1 {
            parts.push(format!("exhaust_l1: {pair}"));
        }
        if let Some(ref replacement) = self.replace_block {
            parts.push(format!("replace_block: {replacement}"));
        }

        if parts.is_empty() { write!(f, "none") } else { write!(f, "{}", parts.join(", ")) }
    }
}

/// Represents the events structure sent by the node to the supervisor.
///
/// `data` is `None` when the node delivered a nil event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    /// Represents the event data sent by the node
    pub data: Option<ManagedEvent>,
}

impl From<ManagedEvent> for SubscriptionEvent {
    fn from(event: ManagedEvent) -> Self {
        Self { data: Some(event) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn test_empty_event() {
        let event = ManagedEvent::default();

        assert!(event.is_empty());
        assert_eq!(event.to_string(), "none");
    }

    #[test]
    fn test_display_lists_every_populated_field() {
        let block = BlockInfo::new(B256::from([1u8; 32]), 1, B256::ZERO, 0);
        let event = ManagedEvent {
            reset: Some("engine stalled".to_string()),
            unsafe_block: Some(block),
            ..Default::default()
        };

        assert!(!event.is_empty());
        let rendered = event.to_string();
        assert!(rendered.starts_with("reset: engine stalled, unsafe_block: "));
    }

    #[test]
    fn test_deserialize_partial_event() {
        let json = r#"{
            "data": {
                "reset": "derivation failed",
                "exhaustL1": {
                    "source": {
                        "hash": "0x0101010101010101010101010101010101010101010101010101010101010101",
                        "number": "0x64",
                        "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                        "timestamp": "0x1"
                    },
                    "derived": {
                        "hash": "0x0202020202020202020202020202020202020202020202020202020202020202",
                        "number": "0x7",
                        "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                        "timestamp": "0x2"
                    }
                }
            }
        }"#;

        let envelope: SubscriptionEvent = serde_json::from_str(json).unwrap();
        let event = envelope.data.unwrap();

        assert_eq!(event.reset.as_deref(), Some("derivation failed"));
        assert_eq!(event.exhaust_l1.unwrap().source.number, 100);
        assert!(event.unsafe_block.is_none());
        assert!(event.derivation_update.is_none());
        assert!(event.replace_block.is_none());
    }

    #[test]
    fn test_deserialize_nil_event() {
        let envelope: SubscriptionEvent = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let event = ManagedEvent { reset: Some("x".to_string()), ..Default::default() };

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"reset":"x"}"#);
    }
}
