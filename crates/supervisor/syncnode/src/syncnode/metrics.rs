//! Metrics for the managed node client and resetter.

use alloy_primitives::ChainId;
use std::time::Duration;

/// Container for metrics.
#[derive(Debug, Clone)]
pub(super) struct Metrics;

impl Metrics {
    // --- Metric Names ---
    /// Identifier for the counter of successful RPC requests. Labels: `method`, `node`.
    pub(crate) const MANAGED_NODE_RPC_REQUESTS_SUCCESS_TOTAL: &'static str =
        "managed_node_rpc_requests_success_total";
    /// Identifier for the counter of failed RPC requests. Labels: `method`, `node`.
    pub(crate) const MANAGED_NODE_RPC_REQUESTS_ERROR_TOTAL: &'static str =
        "managed_node_rpc_requests_error_total";
    /// Identifier for the histogram of RPC request durations. Labels: `method`, `node`.
    pub(crate) const MANAGED_NODE_RPC_REQUEST_DURATION_SECONDS: &'static str =
        "managed_node_rpc_request_duration_seconds";
    /// Identifier for the counter of resets sent to the node.
    /// Labels: `chain_id`, `trigger`, `result`.
    pub(crate) const MANAGED_NODE_RESETS_TOTAL: &'static str = "managed_node_resets_total";
    /// Identifier for the histogram of blocks walked back before a conflict was resolved.
    /// Labels: `chain_id`.
    pub(crate) const MANAGED_NODE_WALK_BACK_DEPTH: &'static str = "managed_node_walk_back_depth";

    pub(crate) const RPC_METHOD_SUBSCRIBE_EVENTS: &'static str = "subscribe_events";
    pub(crate) const RPC_METHOD_PULL_EVENT: &'static str = "pull_event";
    pub(crate) const RPC_METHOD_RESET: &'static str = "reset";
    pub(crate) const RPC_METHOD_INVALIDATE_BLOCK: &'static str = "invalidate_block";
    pub(crate) const RPC_METHOD_PROVIDE_L1: &'static str = "provide_l1";
    pub(crate) const RPC_METHOD_UPDATE_FINALIZED: &'static str = "update_finalized";
    pub(crate) const RPC_METHOD_UPDATE_CROSS_UNSAFE: &'static str = "update_cross_unsafe";
    pub(crate) const RPC_METHOD_UPDATE_CROSS_SAFE: &'static str = "update_cross_safe";

    pub(crate) const RESET_TRIGGER_CONFLICT: &'static str = "conflict";
    pub(crate) const RESET_TRIGGER_FUTURE: &'static str = "future";
    pub(crate) const RESET_TRIGGER_OUT_OF_ORDER: &'static str = "out_of_order";
    pub(crate) const RESET_TRIGGER_REWOUND: &'static str = "rewound";

    const RESET_TRIGGERS: [&'static str; 4] = [
        Self::RESET_TRIGGER_CONFLICT,
        Self::RESET_TRIGGER_FUTURE,
        Self::RESET_TRIGGER_OUT_OF_ORDER,
        Self::RESET_TRIGGER_REWOUND,
    ];

    const RPC_METHODS: [&'static str; 8] = [
        Self::RPC_METHOD_SUBSCRIBE_EVENTS,
        Self::RPC_METHOD_PULL_EVENT,
        Self::RPC_METHOD_RESET,
        Self::RPC_METHOD_INVALIDATE_BLOCK,
        Self::RPC_METHOD_PROVIDE_L1,
        Self::RPC_METHOD_UPDATE_FINALIZED,
        Self::RPC_METHOD_UPDATE_CROSS_UNSAFE,
        Self::RPC_METHOD_UPDATE_CROSS_SAFE,
    ];

    /// Initializes the RPC client metrics for the given node.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics with their labels to 0 so they can be queried immediately.
    pub(crate) fn init_client(node: &str) {
        Self::describe();
        for method in Self::RPC_METHODS {
            Self::zero_rpc_method(method, node);
        }
    }

    /// Initializes the reset metrics for the given chain.
    pub(crate) fn init_resetter(chain_id: ChainId) {
        Self::describe();
        for trigger in Self::RESET_TRIGGERS {
            for result in ["success", "error"] {
                metrics::counter!(
                    Self::MANAGED_NODE_RESETS_TOTAL,
                    "chain_id" => chain_id.to_string(),
                    "trigger" => trigger,
                    "result" => result
                )
                .increment(0);
            }
        }
    }

    fn describe() {
        metrics::describe_counter!(
            Self::MANAGED_NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Total number of successful RPC requests sent to the managed node"
        );
        metrics::describe_counter!(
            Self::MANAGED_NODE_RPC_REQUESTS_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed RPC requests sent to the managed node"
        );
        metrics::describe_histogram!(
            Self::MANAGED_NODE_RPC_REQUEST_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of RPC requests sent to the managed node"
        );
        metrics::describe_counter!(
            Self::MANAGED_NODE_RESETS_TOTAL,
            metrics::Unit::Count,
            "Total number of resets sent to the managed node"
        );
        metrics::describe_histogram!(
            Self::MANAGED_NODE_WALK_BACK_DEPTH,
            metrics::Unit::Count,
            "Number of blocks walked back before a conflict was resolved"
        );
    }

    fn zero_rpc_method(method: &'static str, node: &str) {
        metrics::counter!(
            Self::MANAGED_NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            "method" => method,
            "node" => node.to_string()
        )
        .increment(0);
        metrics::counter!(
            Self::MANAGED_NODE_RPC_REQUESTS_ERROR_TOTAL,
            "method" => method,
            "node" => node.to_string()
        )
        .increment(0);
    }

    /// Records the outcome and duration of an RPC request.
    pub(crate) fn record_rpc_request(
        method: &'static str,
        node: &str,
        elapsed: Duration,
        success: bool,
    ) {
        let name = if success {
            Self::MANAGED_NODE_RPC_REQUESTS_SUCCESS_TOTAL
        } else {
            Self::MANAGED_NODE_RPC_REQUESTS_ERROR_TOTAL
        };
        metrics::counter!(name, "method" => method, "node" => node.to_string()).increment(1);
        metrics::histogram!(
            Self::MANAGED_NODE_RPC_REQUEST_DURATION_SECONDS,
            "method" => method,
            "node" => node.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    /// Records a reset sent to the node.
    pub(crate) fn record_reset(chain_id: ChainId, trigger: &'static str, success: bool) {
        metrics::counter!(
            Self::MANAGED_NODE_RESETS_TOTAL,
            "chain_id" => chain_id.to_string(),
            "trigger" => trigger,
            "result" => if success { "success" } else { "error" }
        )
        .increment(1);
    }

    /// Records how many blocks were walked back to resolve a conflict.
    pub(crate) fn record_walk_back_depth(chain_id: ChainId, depth: u64) {
        metrics::histogram!(
            Self::MANAGED_NODE_WALK_BACK_DEPTH,
            "chain_id" => chain_id.to_string()
        )
        .record(depth as f64);
    }
}
