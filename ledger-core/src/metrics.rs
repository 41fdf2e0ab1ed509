//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the host.
//!
//! # Metrics
//!
//! - `ledger_transactions_committed_total` - Top-level transactions committed
//! - `ledger_transactions_rolled_back_total` - Top-level transactions rolled back

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Transactions committed
    pub committed: IntCounter,

    /// Transactions rolled back
    pub rolled_back: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let committed = IntCounter::new(
            "ledger_transactions_committed_total",
            "Top-level transactions committed",
        )?;
        registry.register(Box::new(committed.clone()))?;

        let rolled_back = IntCounter::new(
            "ledger_transactions_rolled_back_total",
            "Top-level transactions rolled back",
        )?;
        registry.register(Box::new(rolled_back.clone()))?;

        Ok(Self {
            committed,
            rolled_back,
            registry,
        })
    }

    /// Record a commit
    pub fn record_commit(&self) {
        self.committed.inc();
    }

    /// Record a rollback
    pub fn record_rollback(&self) {
        self.rolled_back.inc();
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
