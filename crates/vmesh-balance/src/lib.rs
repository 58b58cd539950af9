//! # vmesh-balance
//!
//! Look-aside load balancing for the vectormesh proxy tier.
//!
//! The proxy dispatches every search/query request to one query node picked
//! from a caller-supplied candidate set. This crate provides the selection
//! engine and its feedback loop:
//!
//! - A workload score per candidate, combining the node's last reported cost
//!   aggregation with the cost of requests already dispatched but not yet
//!   answered
//! - An in-flight ledger bridging the gap between dispatch and the next
//!   telemetry refresh
//! - A background prober that health-checks nodes whose telemetry has gone
//!   silent and fences them off until they recover
//!
//! The balancer is look-aside: the caller performs the RPC, the balancer only
//! names the target.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vmesh_balance::{mock::MockShardClientManager, LookAsideBalancer};
//! use vmesh_core::{BalanceConfig, CostAggregation, NodeId};
//!
//! let balancer = LookAsideBalancer::new(
//!     Arc::new(MockShardClientManager::new()),
//!     BalanceConfig::default(),
//! );
//!
//! balancer.update_cost_metrics(NodeId::new(1), CostAggregation::new(20.0, 5.0, 0));
//! balancer.update_cost_metrics(NodeId::new(2), CostAggregation::new(50.0, 10.0, 0));
//!
//! let target = balancer.select_node(&[NodeId::new(1), NodeId::new(2)], 8).unwrap();
//! assert_eq!(target, NodeId::new(1));
//! ```

pub mod balancer;
pub mod mock;

mod health;
mod rategate;

pub use balancer::LookAsideBalancer;

/// Result type for balancer operations
pub type Result<T> = vmesh_core::Result<T>;
