//! Run Metrics
//!
//! Process-wide set of the four observable values describing the most recent
//! run, registered on a dedicated Prometheus registry. Every collector is
//! internally atomic: the scheduler's run loop updates them while scrape
//! handlers render snapshots concurrently, and no lock is ever held across
//! I/O.

use std::sync::Arc;

use chrono::Utc;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

use crate::error::Result;

// =============================================================================
// Run Metrics
// =============================================================================

/// The exported metric set.
///
/// Before the first run: `up == 1` (optimistic default), `alerts_count == 0`
/// and the last-run timestamp holds the startup time as a liveness baseline.
pub struct RunMetrics {
    registry: Registry,

    /// 0/1 health of the most recent run
    up: IntGauge,

    /// Cumulative count of failed runs
    errors_total: IntCounter,

    /// Wall-clock Unix seconds at the last run attempt
    scheduler_last_run_timestamp: Gauge,

    /// Number of alerts processed in the most recent successful run
    alerts_count: IntGauge,
}

impl RunMetrics {
    /// Create the metric set and register every series.
    pub fn new() -> Result<Arc<Self>> {
        let registry = Registry::new();

        let up = IntGauge::new(
            "opsgenie_alerts_manager_up",
            "opsgenie alerts manager scrape status",
        )?;
        let errors_total = IntCounter::new(
            "opsgenie_alerts_manager_errors_total",
            "opsgenie alerts manager scrape errors total counter",
        )?;
        let scheduler_last_run_timestamp = Gauge::new(
            "opsgenie_alerts_manager_scheduler_last_run_timestamp",
            "opsgenie alerts manager scheduler job last run timestamp",
        )?;
        let alerts_count = IntGauge::new(
            "opsgenie_alerts_manager_alerts_count",
            "opsgenie alerts manager alerts count",
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(scheduler_last_run_timestamp.clone()))?;
        registry.register(Box::new(alerts_count.clone()))?;

        // Startup baseline
        up.set(1);
        scheduler_last_run_timestamp.set(Self::now_epoch_seconds());
        alerts_count.set(0);

        Ok(Arc::new(Self {
            registry,
            up,
            errors_total,
            scheduler_last_run_timestamp,
            alerts_count,
        }))
    }

    fn now_epoch_seconds() -> f64 {
        Utc::now().timestamp() as f64
    }

    /// Commit a successful run: `count` alerts processed, timestamp advanced
    /// to now, health flag raised.
    pub fn record_success(&self, count: usize) {
        self.scheduler_last_run_timestamp.set(Self::now_epoch_seconds());
        self.alerts_count.set(count as i64);
        self.up.set(1);
    }

    /// Commit a failed run: health flag lowered, error counter bumped.
    /// Alert count and timestamp keep their prior values.
    pub fn record_failure(&self) {
        self.up.set(0);
        self.errors_total.inc();
    }

    /// Render the full metric set in Prometheus exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::Error::Internal(format!("Non-UTF8 exposition: {}", e)))
    }

    /// Current value of the health gauge
    pub fn up(&self) -> i64 {
        self.up.get()
    }

    /// Current value of the failed-run counter
    pub fn errors_total(&self) -> u64 {
        self.errors_total.get()
    }

    /// Current value of the last-run timestamp gauge
    pub fn last_run_timestamp(&self) -> f64 {
        self.scheduler_last_run_timestamp.get()
    }

    /// Current value of the alert-count gauge
    pub fn alerts_count(&self) -> i64 {
        self.alerts_count.get()
    }
}
