//! # vmesh-metrics
//!
//! Prometheus metric families for the vectormesh proxy tier.
//!
//! This crate defines the metric families the proxy components update and a
//! thin registration helper. Exposition (scrape endpoints, push gateways) is
//! owned by the embedding process, which registers these families into its
//! own `prometheus::Registry`.

pub mod common;

pub use common::BalanceMetrics;
