//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `router_swaps_executed_total` - Swaps settled by the router
//! - `router_swaps_failed_total` - Swap attempts that aborted
//! - `router_fee_amount` - Fee taken per settled swap, in base units

use prometheus::{exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Swaps settled
    pub swaps_executed: IntCounter,

    /// Swaps aborted
    pub swaps_failed: IntCounter,

    /// Fee per swap
    pub fee_amount: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let swaps_executed = IntCounter::new("router_swaps_executed_total", "Swaps settled by the router")?;
        registry.register(Box::new(swaps_executed.clone()))?;

        let swaps_failed = IntCounter::new("router_swaps_failed_total", "Swap attempts that aborted")?;
        registry.register(Box::new(swaps_failed.clone()))?;

        let fee_amount = Histogram::with_opts(
            HistogramOpts::new("router_fee_amount", "Fee taken per settled swap (base units)")
                .buckets(exponential_buckets(1.0, 10.0, 24)?),
        )?;
        registry.register(Box::new(fee_amount.clone()))?;

        Ok(Self {
            swaps_executed,
            swaps_failed,
            fee_amount,
            registry,
        })
    }

    /// Record a settled swap
    pub fn record_swap(&self, fee: u128) {
        self.swaps_executed.inc();
        self.fee_amount.observe(fee as f64);
    }

    /// Record an aborted swap
    pub fn record_failure(&self) {
        self.swaps_failed.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_swap() {
        let metrics = Metrics::new().unwrap();
        metrics.record_swap(360);
        metrics.record_failure();
        assert_eq!(metrics.swaps_executed.get(), 1);
        assert_eq!(metrics.swaps_failed.get(), 1);
        assert_eq!(metrics.fee_amount.get_sample_count(), 1);
        assert_eq!(metrics.registry().gather().len(), 3);
    }

    #[test]
    fn test_export_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_swap(360);
        let text = metrics.export().unwrap();
        assert!(text.contains("router_swaps_executed_total 1"));
        assert!(text.contains("router_fee_amount_count 1"));
    }
}
