//! Look-aside balancer: selection engine and workload feedback loop

use crate::health::Prober;
use crate::rategate::RateGate;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;
use vmesh_core::time::unix_ms_now;
use vmesh_core::{BalanceConfig, CostAggregation, Error, NodeId, Result, ShardClientManager};
use vmesh_metrics::BalanceMetrics;

/// Look-aside load balancer for dispatching search requests across query
/// nodes.
///
/// For every request the balancer picks one node out of a caller-supplied
/// candidate set, aiming to equalize expected completion latency. The score
/// combines the node's last reported cost aggregation with the total cost of
/// requests already dispatched to it but not yet answered; a background
/// prober fences off nodes that stop reporting and fail an active health
/// check.
pub struct LookAsideBalancer {
    client_mgr: Arc<dyn ShardClientManager>,
    config: BalanceConfig,

    /// query node -> latest reported cost aggregation
    metrics_map: Arc<DashMap<NodeId, CostAggregation>>,

    /// query node -> receipt time of the latest aggregation, unix millis
    metrics_updated_at: Arc<DashMap<NodeId, i64>>,

    /// query node -> total cost of dispatched-but-unanswered requests
    executing_nq: Arc<DashMap<NodeId, Arc<AtomicI64>>>,

    /// nodes currently failing health criteria, excluded from selection
    unreachable: Arc<DashSet<NodeId>>,

    metrics: Arc<BalanceMetrics>,
    skip_log_gate: RateGate,

    shutdown_tx: watch::Sender<bool>,
    prober_handle: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl LookAsideBalancer {
    /// Create a new balancer bound to the given shard client manager.
    ///
    /// The balancer is inert until [`start`](Self::start) spawns the health
    /// prober.
    pub fn new(client_mgr: Arc<dyn ShardClientManager>, config: BalanceConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            client_mgr,
            config,
            metrics_map: Arc::new(DashMap::new()),
            metrics_updated_at: Arc::new(DashMap::new()),
            executing_nq: Arc::new(DashMap::new()),
            unreachable: Arc::new(DashSet::new()),
            metrics: Arc::new(BalanceMetrics::default()),
            skip_log_gate: RateGate::new(Duration::from_secs(60)),
            shutdown_tx,
            prober_handle: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Spawn the health prober. A second call is a no-op while the first
    /// prober is still running.
    pub fn start(&self) {
        let mut handle = self.prober_handle.lock();
        if handle.is_some() || self.closed.load(Ordering::SeqCst) {
            return;
        }

        let prober = Prober::new(
            self.client_mgr.clone(),
            self.config.clone(),
            self.metrics_updated_at.clone(),
            self.unreachable.clone(),
            self.metrics.clone(),
            self.shutdown_tx.subscribe(),
        );
        *handle = Some(tokio::spawn(prober.run()));
    }

    /// Signal shutdown and wait for the prober to drain its in-flight
    /// probes. Idempotent.
    ///
    /// The in-memory state outlives the prober: `select_node`,
    /// `update_cost_metrics`, and `cancel_workload` keep operating after
    /// close, they just lose reachability upkeep.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(true);
        let handle = self.prober_handle.lock().take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("query node health check loop ended abnormally");
            }
        }
    }

    /// Pick the candidate with the lowest workload score.
    ///
    /// Candidates in the unreachable set are skipped; ties keep the first
    /// occurrence in the input order. On success the request's cost is added
    /// to the chosen node's in-flight counter before returning, so the very
    /// next selection (on any thread) sees it. Fails with
    /// [`Error::ServiceUnavailable`] when no candidate survives, including
    /// the empty-input case; no state is mutated on failure.
    pub fn select_node(&self, available_nodes: &[NodeId], cost: i64) -> Result<NodeId> {
        let now_ms = unix_ms_now();
        let mut target: Option<(NodeId, f64)> = None;

        for &node in available_nodes {
            if self.unreachable.contains(&node) {
                if self.skip_log_gate.allow() {
                    warn!(node = node.as_i64(), "query node is unreachable, skipping");
                }
                continue;
            }

            let node_cost = self.metrics_map.get(&node).map(|entry| *entry.value());
            let executing = self.executing_counter(node).load(Ordering::Relaxed);
            let score = self.calculate_score(node, node_cost.as_ref(), executing, now_ms);

            self.metrics
                .workload_score
                .with_label_values(&[&node.to_string()])
                .set(score);

            match target {
                Some((_, best)) if score >= best => {}
                _ => target = Some((node, score)),
            }
        }

        let (node, _) = target.ok_or_else(|| {
            Error::service_unavailable("all available nodes are unreachable")
        })?;

        self.executing_counter(node).fetch_add(cost, Ordering::Relaxed);
        Ok(node)
    }

    /// Cache the latest cost aggregation reported by a query node.
    ///
    /// Called on every search/query response; the aggregation is trusted
    /// as-is and overwrites the previous one.
    pub fn update_cost_metrics(&self, node: NodeId, cost: CostAggregation) {
        self.metrics_map.insert(node, cost);
        self.metrics_updated_at.insert(node, unix_ms_now());
    }

    /// Return a dispatched request's cost to the in-flight ledger, e.g. when
    /// the request is cancelled before its response arrives.
    ///
    /// A node that was never selected has no counter; the call is then a
    /// no-op rather than an underflow.
    pub fn cancel_workload(&self, node: NodeId, nq: i64) {
        if let Some(counter) = self.executing_nq.get(&node) {
            counter.fetch_sub(nq, Ordering::Relaxed);
        }
    }

    /// Metric families updated by this balancer, for registration into the
    /// embedding process's registry
    pub fn metrics(&self) -> &BalanceMetrics {
        &self.metrics
    }

    fn executing_counter(&self, node: NodeId) -> Arc<AtomicI64> {
        self.executing_nq
            .entry(node)
            .or_insert_with(|| Arc::new(AtomicI64::new(0)))
            .value()
            .clone()
    }

    /// Workload score of a candidate, lower is better.
    ///
    /// With no trustworthy latency figures the score degrades to pure
    /// in-flight load, cubed to punish piling onto one node. A node that
    /// looks idle (nothing queued, nothing in flight) with expired telemetry
    /// scores zero so stale numbers are not held against it. Otherwise the
    /// score is the queuing/transport delay plus the cubed backlog scaled by
    /// service time (the C3 scoring shape).
    fn calculate_score(
        &self,
        node: NodeId,
        cost: Option<&CostAggregation>,
        executing_nq: i64,
        now_ms: i64,
    ) -> f64 {
        let cost = match cost {
            Some(c) if c.has_latency() => c,
            _ => return (1.0 + executing_nq as f64).powi(3),
        };

        if executing_nq == 0 && cost.total_nq == 0 && self.telemetry_too_old(node, now_ms) {
            return 0.0;
        }

        let execute_speed = cost.response_time_ms - cost.service_time_ms;
        let workload =
            (1.0 + cost.total_nq as f64 + executing_nq as f64).powi(3) * cost.service_time_ms;
        if workload < 0.0 {
            return f64::MAX;
        }

        execute_speed + workload
    }

    /// Telemetry older than the expire threshold is too old; a node that
    /// never reported is not (it has no numbers to hold against it).
    fn telemetry_too_old(&self, node: NodeId, now_ms: i64) -> bool {
        match self.metrics_updated_at.get(&node) {
            Some(ts) if *ts.value() != 0 => {
                now_ms - *ts.value() > self.config.cost_metrics_expire.as_millis() as i64
            }
            _ => false,
        }
    }
}

#[cfg(test)]
impl LookAsideBalancer {
    pub(crate) fn executing(&self, node: NodeId) -> i64 {
        self.executing_nq
            .get(&node)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub(crate) fn has_executing_counter(&self, node: NodeId) -> bool {
        self.executing_nq.contains_key(&node)
    }

    pub(crate) fn is_unreachable(&self, node: NodeId) -> bool {
        self.unreachable.contains(&node)
    }

    pub(crate) fn mark_unreachable(&self, node: NodeId) {
        self.unreachable.insert(node);
    }

    pub(crate) fn telemetry_timestamp(&self, node: NodeId) -> Option<i64> {
        self.metrics_updated_at.get(&node).map(|ts| *ts.value())
    }

    pub(crate) fn set_telemetry_timestamp(&self, node: NodeId, ts_ms: i64) {
        self.metrics_updated_at.insert(node, ts_ms);
    }
}
