//! Configuration for the look-aside balancer

use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the look-aside balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Prober tick period; doubles as the telemetry-staleness threshold that
    /// triggers a health probe
    pub check_node_health_interval: Duration,

    /// Age past which cached cost metrics are considered too old to hold
    /// against an idle node
    pub cost_metrics_expire: Duration,

    /// Per-probe RPC deadline
    pub health_check_timeout: Duration,

    /// Maximum concurrent health probes per tick
    pub probe_concurrency: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            check_node_health_interval: Duration::from_millis(500),
            cost_metrics_expire: Duration::from_millis(1000),
            health_check_timeout: Duration::from_secs(2),
            probe_concurrency: 16,
        }
    }
}

impl BalanceConfig {
    /// Create a new balancer configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prober tick period / staleness threshold
    pub fn with_check_node_health_interval(mut self, interval: Duration) -> Self {
        self.check_node_health_interval = interval;
        self
    }

    /// Set the cost-metrics expiry
    pub fn with_cost_metrics_expire(mut self, expire: Duration) -> Self {
        self.cost_metrics_expire = expire;
        self
    }

    /// Set the per-probe RPC deadline
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Set the probe fan-out bound
    pub fn with_probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = concurrency;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.check_node_health_interval.is_zero() {
            return Err(crate::Error::config(
                "check_node_health_interval must be greater than zero",
            ));
        }

        if self.cost_metrics_expire.is_zero() {
            return Err(crate::Error::config(
                "cost_metrics_expire must be greater than zero",
            ));
        }

        if self.health_check_timeout.is_zero() {
            return Err(crate::Error::config(
                "health_check_timeout must be greater than zero",
            ));
        }

        if self.probe_concurrency == 0 {
            return Err(crate::Error::config(
                "probe_concurrency must be greater than zero",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BalanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_node_health_interval, Duration::from_millis(500));
        assert_eq!(config.cost_metrics_expire, Duration::from_millis(1000));
    }

    #[test]
    fn test_config_builder() {
        let config = BalanceConfig::new()
            .with_check_node_health_interval(Duration::from_millis(100))
            .with_cost_metrics_expire(Duration::from_millis(200))
            .with_health_check_timeout(Duration::from_millis(50))
            .with_probe_concurrency(4);

        assert_eq!(config.check_node_health_interval, Duration::from_millis(100));
        assert_eq!(config.cost_metrics_expire, Duration::from_millis(200));
        assert_eq!(config.health_check_timeout, Duration::from_millis(50));
        assert_eq!(config.probe_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = BalanceConfig::default();
        config.check_node_health_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = BalanceConfig::default();
        config.cost_metrics_expire = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = BalanceConfig::default();
        config.health_check_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = BalanceConfig::default();
        config.probe_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
