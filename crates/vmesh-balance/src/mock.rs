//! Mock shard client manager for testing
//!
//! Scripts per-node probe behavior so tests (here and in embedding crates)
//! can drive the health prober without a transport layer.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vmesh_core::{
    ComponentStates, Error, NodeId, QueryNodeClient, Result, ShardClientManager, StateCode,
};

/// Scripted behavior of a mock query node
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// `get_client` fails as if the connection were refused
    FailConnect,
    /// The component-state RPC fails
    FailRpc,
    /// The component-state RPC replies with the given state code
    Respond(StateCode),
    /// The component-state RPC sleeps before replying healthy
    Delay(Duration),
}

/// Mock shard client manager with per-node scripted behavior.
///
/// Nodes without an explicit script behave as healthy.
pub struct MockShardClientManager {
    behaviors: Arc<DashMap<NodeId, MockBehavior>>,
    probes: Arc<DashMap<NodeId, AtomicU64>>,
}

impl MockShardClientManager {
    /// Create a new mock manager where every node reports healthy
    pub fn new() -> Self {
        Self {
            behaviors: Arc::new(DashMap::new()),
            probes: Arc::new(DashMap::new()),
        }
    }

    /// Script the behavior of a node, replacing any previous script
    pub fn set_behavior(&self, node: NodeId, behavior: MockBehavior) {
        self.behaviors.insert(node, behavior);
    }

    /// Number of `get_client` calls observed for a node
    pub fn probe_count(&self, node: NodeId) -> u64 {
        self.probes
            .get(&node)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn behavior(&self, node: NodeId) -> MockBehavior {
        self.behaviors
            .get(&node)
            .map(|b| *b.value())
            .unwrap_or(MockBehavior::Respond(StateCode::Healthy))
    }
}

impl Default for MockShardClientManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShardClientManager for MockShardClientManager {
    async fn get_client(&self, node: NodeId) -> Result<Arc<dyn QueryNodeClient>> {
        self.probes
            .entry(node)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);

        match self.behavior(node) {
            MockBehavior::FailConnect => Err(Error::transport(format!(
                "connection to query node {node} refused"
            ))),
            behavior => Ok(Arc::new(MockQueryNodeClient { node, behavior })),
        }
    }
}

/// Client handle produced by [`MockShardClientManager`]
pub struct MockQueryNodeClient {
    node: NodeId,
    behavior: MockBehavior,
}

#[async_trait]
impl QueryNodeClient for MockQueryNodeClient {
    async fn get_component_states(&self) -> Result<ComponentStates> {
        match self.behavior {
            MockBehavior::FailRpc => Err(Error::transport(format!(
                "component state rpc to query node {} failed",
                self.node
            ))),
            MockBehavior::Respond(code) => Ok(ComponentStates::new(self.node, code)),
            MockBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(ComponentStates::new(self.node, StateCode::Healthy))
            }
            // get_client already succeeded for this behavior
            MockBehavior::FailConnect => Ok(ComponentStates::new(self.node, StateCode::Healthy)),
        }
    }
}
