//! # vmesh-core
//!
//! Core types, traits, and utilities shared by the vectormesh proxy tier.
//!
//! This crate provides the foundational pieces consumed by the balancer and
//! the surrounding proxy components:
//!
//! - Node identifiers and the cost-aggregation telemetry reported by query nodes
//! - The client-manager trait seam used to reach query nodes for health probes
//! - Configuration schema for the balancer
//! - Error handling types and utilities

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::BalanceConfig;
pub use error::{Error, Result};
pub use traits::{QueryNodeClient, ShardClientManager};
pub use types::{ComponentStates, CostAggregation, NodeId, StateCode};
