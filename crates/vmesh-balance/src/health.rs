//! Background reachability prober for query nodes
//!
//! A node actively serving traffic refreshes its own telemetry timestamp on
//! every response, so only silent nodes need an active probe. Each tick the
//! prober snapshots the nodes whose telemetry has gone stale, probes them
//! concurrently under a fan-out bound, and waits for the whole batch before
//! the next tick so probes cannot pile up on a wide fleet.

use dashmap::{DashMap, DashSet};
use futures::future;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, warn};
use vmesh_core::time::unix_ms_now;
use vmesh_core::{BalanceConfig, Error, NodeId, ShardClientManager, StateCode};
use vmesh_metrics::BalanceMetrics;

/// Result of one health probe
enum ProbeOutcome {
    Healthy,
    ConnectFailed(Error),
    RpcFailed(Error),
    NotServing(StateCode),
    TimedOut,
}

impl ProbeOutcome {
    fn as_label(&self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::ConnectFailed(_) => "connect_error",
            ProbeOutcome::RpcFailed(_) => "rpc_error",
            ProbeOutcome::NotServing(_) => "not_serving",
            ProbeOutcome::TimedOut => "timeout",
        }
    }
}

/// Periodic health checker owning shared views of the balancer's state
#[derive(Clone)]
pub(crate) struct Prober {
    client_mgr: Arc<dyn ShardClientManager>,
    config: BalanceConfig,
    metrics_updated_at: Arc<DashMap<NodeId, i64>>,
    unreachable: Arc<DashSet<NodeId>>,
    metrics: Arc<BalanceMetrics>,
    shutdown: watch::Receiver<bool>,
}

impl Prober {
    pub(crate) fn new(
        client_mgr: Arc<dyn ShardClientManager>,
        config: BalanceConfig,
        metrics_updated_at: Arc<DashMap<NodeId, i64>>,
        unreachable: Arc<DashSet<NodeId>>,
        metrics: Arc<BalanceMetrics>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client_mgr,
            config,
            metrics_updated_at,
            unreachable,
            metrics,
            shutdown,
        }
    }

    pub(crate) async fn run(self) {
        let mut ticker = interval(self.config.check_node_health_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let limiter = Arc::new(Semaphore::new(self.config.probe_concurrency));
        let mut shutdown = self.shutdown.clone();

        info!("starting query node health check loop");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("query node health check loop exiting");
                    return;
                }
                _ = ticker.tick() => {
                    self.check_stale_nodes(&limiter).await;
                }
            }
        }
    }

    /// Probe every node whose telemetry is older than one tick, then wait
    /// for the whole batch.
    async fn check_stale_nodes(&self, limiter: &Arc<Semaphore>) {
        let now_ms = unix_ms_now();
        let threshold_ms = self.config.check_node_health_interval.as_millis() as i64;

        let stale: Vec<NodeId> = self
            .metrics_updated_at
            .iter()
            .filter(|entry| now_ms - *entry.value() > threshold_ms)
            .map(|entry| *entry.key())
            .collect();
        if stale.is_empty() {
            return;
        }

        let probes: Vec<_> = stale
            .into_iter()
            .map(|node| {
                let prober = self.clone();
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    if let Ok(_permit) = limiter.acquire_owned().await {
                        let outcome = prober.probe(node).await;
                        prober.apply(node, outcome);
                    }
                })
            })
            .collect();
        future::join_all(probes).await;
    }

    /// Healthy iff a client can be obtained, the state RPC succeeds, and the
    /// reply is `Healthy`, all within the probe deadline.
    async fn probe(&self, node: NodeId) -> ProbeOutcome {
        let attempt = async {
            match self.client_mgr.get_client(node).await {
                Err(e) => ProbeOutcome::ConnectFailed(e),
                Ok(client) => match client.get_component_states().await {
                    Err(e) => ProbeOutcome::RpcFailed(e),
                    Ok(states) if states.is_healthy() => ProbeOutcome::Healthy,
                    Ok(states) => ProbeOutcome::NotServing(states.state_code),
                },
            }
        };

        match timeout(self.config.health_check_timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::TimedOut,
        }
    }

    fn apply(&self, node: NodeId, outcome: ProbeOutcome) {
        let label = node.to_string();
        self.metrics
            .health_probes
            .with_label_values(&[&label, outcome.as_label()])
            .inc();

        match outcome {
            ProbeOutcome::Healthy => {
                // re-arm the staleness trigger alongside the recovery
                self.metrics_updated_at.insert(node, unix_ms_now());
                if self.unreachable.remove(&node).is_some() {
                    info!(node = node.as_i64(), "query node recovered, marking reachable");
                }
                self.metrics
                    .node_reachable
                    .with_label_values(&[&label])
                    .set(1.0);
            }
            ProbeOutcome::ConnectFailed(e) => {
                self.mark_unreachable(node, &label, format!("failed to obtain client: {e}"));
            }
            ProbeOutcome::RpcFailed(e) => {
                self.mark_unreachable(node, &label, format!("component state probe failed: {e}"));
            }
            ProbeOutcome::NotServing(code) => {
                self.mark_unreachable(node, &label, format!("component state is {code}"));
            }
            ProbeOutcome::TimedOut => {
                self.mark_unreachable(node, &label, "component state probe timed out".to_string());
            }
        }
    }

    fn mark_unreachable(&self, node: NodeId, label: &str, reason: String) {
        // warn once per streak, not once per probe
        if self.unreachable.insert(node) {
            warn!(node = node.as_i64(), reason = %reason, "marking query node unreachable");
        }
        self.metrics
            .node_reachable
            .with_label_values(&[label])
            .set(0.0);
    }
}

#[cfg(test)]
mod tests {
    use crate::balancer::LookAsideBalancer;
    use crate::mock::{MockBehavior, MockShardClientManager};
    use std::sync::Arc;
    use std::time::Duration;
    use vmesh_core::time::unix_ms_now;
    use vmesh_core::{BalanceConfig, CostAggregation, Error, NodeId, StateCode};

    fn fast_config() -> BalanceConfig {
        BalanceConfig::new()
            .with_check_node_health_interval(Duration::from_millis(50))
            .with_cost_metrics_expire(Duration::from_millis(100))
            .with_health_check_timeout(Duration::from_millis(200))
    }

    fn stale_node(balancer: &LookAsideBalancer, node: NodeId) {
        balancer.update_cost_metrics(node, CostAggregation::new(10.0, 5.0, 0));
        balancer.set_telemetry_timestamp(node, unix_ms_now() - 10_000);
    }

    #[tokio::test]
    async fn test_silent_node_with_dead_transport_becomes_unreachable() {
        let mock = Arc::new(MockShardClientManager::new());
        let balancer = LookAsideBalancer::new(mock.clone(), fast_config());
        let node = NodeId::new(11);

        stale_node(&balancer, node);
        mock.set_behavior(node, MockBehavior::FailConnect);

        balancer.start();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(balancer.is_unreachable(node));
        assert!(mock.probe_count(node) >= 1);

        let err = balancer.select_node(&[node], 1).unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));

        balancer.close().await;
    }

    #[tokio::test]
    async fn test_recovered_node_is_readmitted_with_fresh_timestamp() {
        let mock = Arc::new(MockShardClientManager::new());
        let balancer = LookAsideBalancer::new(mock.clone(), fast_config());
        let node = NodeId::new(11);

        stale_node(&balancer, node);
        mock.set_behavior(node, MockBehavior::FailRpc);

        balancer.start();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(balancer.is_unreachable(node));

        let before_recovery = unix_ms_now();
        mock.set_behavior(node, MockBehavior::Respond(StateCode::Healthy));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!balancer.is_unreachable(node));
        assert!(balancer.telemetry_timestamp(node).unwrap() >= before_recovery);
        assert_eq!(balancer.select_node(&[node], 1).unwrap(), node);

        balancer.close().await;
    }

    #[tokio::test]
    async fn test_not_serving_state_is_unhealthy() {
        let mock = Arc::new(MockShardClientManager::new());
        let balancer = LookAsideBalancer::new(mock.clone(), fast_config());
        let node = NodeId::new(3);

        stale_node(&balancer, node);
        mock.set_behavior(node, MockBehavior::Respond(StateCode::Abnormal));

        balancer.start();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(balancer.is_unreachable(node));
        balancer.close().await;
    }

    #[tokio::test]
    async fn test_probe_deadline_marks_node_unreachable() {
        let mock = Arc::new(MockShardClientManager::new());
        let config = fast_config().with_health_check_timeout(Duration::from_millis(20));
        let balancer = LookAsideBalancer::new(mock.clone(), config);
        let node = NodeId::new(6);

        stale_node(&balancer, node);
        mock.set_behavior(node, MockBehavior::Delay(Duration::from_millis(500)));

        balancer.start();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(balancer.is_unreachable(node));
        balancer.close().await;
    }

    #[tokio::test]
    async fn test_fresh_node_is_not_probed() {
        let mock = Arc::new(MockShardClientManager::new());
        // long interval: freshly updated telemetry never goes stale in this test
        let config = BalanceConfig::new()
            .with_check_node_health_interval(Duration::from_millis(60_000))
            .with_health_check_timeout(Duration::from_millis(200));
        let balancer = LookAsideBalancer::new(mock.clone(), config);
        let node = NodeId::new(2);

        balancer.update_cost_metrics(node, CostAggregation::new(10.0, 5.0, 0));
        mock.set_behavior(node, MockBehavior::FailConnect);

        balancer.start();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!balancer.is_unreachable(node));
        assert_eq!(mock.probe_count(node), 0);
        balancer.close().await;
    }

    #[tokio::test]
    async fn test_close_drains_prober() {
        let mock = Arc::new(MockShardClientManager::new());
        let balancer = LookAsideBalancer::new(mock.clone(), fast_config());
        stale_node(&balancer, NodeId::new(1));

        balancer.start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        balancer.close().await;

        // no further probes once close returned
        let count = mock.probe_count(NodeId::new(1));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(mock.probe_count(NodeId::new(1)), count);
    }
}
