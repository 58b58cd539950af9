//! Trait seams for reaching query nodes
//!
//! The balancer never performs search RPCs itself (it is look-aside: the
//! caller dispatches), but it does consume the shard client manager to issue
//! health probes. These traits are the consumed contract; the concrete
//! implementations live with the proxy's transport layer.

use crate::{ComponentStates, NodeId, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Client handle to a single query node
#[async_trait]
pub trait QueryNodeClient: Send + Sync {
    /// Fetch the node's current component state
    async fn get_component_states(&self) -> Result<ComponentStates>;
}

/// Manager handing out client handles for query nodes
#[async_trait]
pub trait ShardClientManager: Send + Sync {
    /// Obtain a client for the given node, creating or reusing a connection
    async fn get_client(&self, node: NodeId) -> Result<Arc<dyn QueryNodeClient>>;
}
