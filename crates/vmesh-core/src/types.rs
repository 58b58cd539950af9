//! Core type definitions for the vectormesh proxy tier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a query node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(i64);

impl NodeId {
    /// Create a new NodeId from its numeric form
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the numeric form of the NodeId
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<NodeId> for i64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Workload cost aggregation reported by a query node alongside each
/// search/query response.
///
/// Any field may be zero, meaning "unknown": freshly started nodes and nodes
/// behind older proxies report partial aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostAggregation {
    /// End-to-end time last observed on the node, in milliseconds
    pub response_time_ms: f64,

    /// On-CPU processing time, in milliseconds
    pub service_time_ms: f64,

    /// Work already queued on the node when the aggregation was produced
    pub total_nq: i64,
}

impl CostAggregation {
    /// Create a new cost aggregation
    pub fn new(response_time_ms: f64, service_time_ms: f64, total_nq: i64) -> Self {
        Self {
            response_time_ms,
            service_time_ms,
            total_nq,
        }
    }

    /// Whether both latency figures are present and usable for scoring
    pub fn has_latency(&self) -> bool {
        self.response_time_ms != 0.0 && self.service_time_ms != 0.0
    }
}

/// Component state codes reported by a query node's state RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateCode {
    /// Node is starting up and not yet serving
    Initializing,
    /// Node is serving traffic
    Healthy,
    /// Node detected an internal fault
    Abnormal,
    /// Node is a standby replica
    StandBy,
    /// Node is shutting down
    Stopping,
}

impl StateCode {
    /// Whether this state admits the node for traffic
    pub fn is_healthy(&self) -> bool {
        matches!(self, StateCode::Healthy)
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateCode::Initializing => write!(f, "initializing"),
            StateCode::Healthy => write!(f, "healthy"),
            StateCode::Abnormal => write!(f, "abnormal"),
            StateCode::StandBy => write!(f, "standby"),
            StateCode::Stopping => write!(f, "stopping"),
        }
    }
}

/// Reply of a query node's component-state RPC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentStates {
    /// The node that produced the reply
    pub node_id: NodeId,

    /// Current state of the node
    pub state_code: StateCode,
}

impl ComponentStates {
    /// Create a new component-states reply
    pub fn new(node_id: NodeId, state_code: StateCode) -> Self {
        Self {
            node_id,
            state_code,
        }
    }

    /// Whether the reply reports a node admitted for traffic
    pub fn is_healthy(&self) -> bool {
        self.state_code.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_conversions() {
        let id = NodeId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(NodeId::from(42), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_cost_aggregation_latency_presence() {
        assert!(!CostAggregation::default().has_latency());
        assert!(!CostAggregation::new(10.0, 0.0, 5).has_latency());
        assert!(!CostAggregation::new(0.0, 10.0, 5).has_latency());
        assert!(CostAggregation::new(20.0, 5.0, 0).has_latency());
    }

    #[test]
    fn test_state_code_admission() {
        assert!(StateCode::Healthy.is_healthy());
        assert!(!StateCode::Initializing.is_healthy());
        assert!(!StateCode::Abnormal.is_healthy());
        assert!(!StateCode::StandBy.is_healthy());
        assert!(!StateCode::Stopping.is_healthy());
    }

    #[test]
    fn test_component_states_reply() {
        let reply = ComponentStates::new(NodeId::new(7), StateCode::Healthy);
        assert!(reply.is_healthy());

        let reply = ComponentStates::new(NodeId::new(7), StateCode::Stopping);
        assert!(!reply.is_healthy());
    }
}
