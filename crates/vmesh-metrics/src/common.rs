//! Metric families updated by the proxy's load balancer

use prometheus::{CounterVec, GaugeVec};

/// Metrics for the proxy's look-aside balancer
#[derive(Debug, Clone)]
pub struct BalanceMetrics {
    /// Most recent workload score computed for a candidate node
    pub workload_score: GaugeVec,

    /// Node reachability as seen by the health prober (1 = reachable, 0 = unreachable)
    pub node_reachable: GaugeVec,

    /// Health probe outcomes
    pub health_probes: CounterVec,
}

impl BalanceMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            workload_score: GaugeVec::new(
                prometheus::Opts::new(
                    "vmesh_proxy_workload_score",
                    "Most recent workload score computed for a candidate query node",
                ),
                &["node_id"],
            )?,
            node_reachable: GaugeVec::new(
                prometheus::Opts::new(
                    "vmesh_proxy_node_reachable",
                    "Query node reachability (1=reachable, 0=unreachable)",
                ),
                &["node_id"],
            )?,
            health_probes: CounterVec::new(
                prometheus::Opts::new(
                    "vmesh_proxy_health_probes_total",
                    "Total health probes issued to query nodes, by outcome",
                ),
                &["node_id", "outcome"],
            )?,
        })
    }

    /// Register all metrics with the given registry
    pub fn register(&self, registry: &prometheus::Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.workload_score.clone()))?;
        registry.register(Box::new(self.node_reachable.clone()))?;
        registry.register(Box::new(self.health_probes.clone()))?;
        Ok(())
    }
}

impl Default for BalanceMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create BalanceMetrics")
    }
}
