//! Run Job
//!
//! One execution of the list-then-close cycle: fetch the alerts matching the
//! configured query, close each one in the order received, and project the
//! outcome into the metric set. The first error anywhere in the cycle aborts
//! the remainder and counts as one failed run; the next scheduled firing is
//! the retry mechanism.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::metrics::RunMetrics;
use crate::opsgenie::AlertService;

// =============================================================================
// Run Job
// =============================================================================

/// The daily alert-closing job
pub struct RunJob {
    service: Arc<dyn AlertService>,
    metrics: Arc<RunMetrics>,
}

impl RunJob {
    /// Create a new run job over the given alert service and metric set.
    pub fn new(service: Arc<dyn AlertService>, metrics: Arc<RunMetrics>) -> Self {
        Self { service, metrics }
    }

    /// Execute one cycle and commit the outcome to the metric set.
    ///
    /// Never returns an error: any failure is logged with its full source
    /// chain and surfaced only as `up=0` / `errors_total+1`. On success the
    /// last-run timestamp, alert count and health flag are committed; on
    /// failure they keep their prior values.
    pub async fn run(&self) {
        match self.execute().await {
            Ok(count) => {
                info!("Run complete: {} alert(s) closed", count);
                self.metrics.record_success(count);
            }
            Err(e) => {
                error!("Run failed: {}", e);
                let mut source = std::error::Error::source(&e);
                while let Some(cause) = source {
                    error!("  caused by: {}", cause);
                    source = cause.source();
                }
                self.metrics.record_failure();
            }
        }
    }

    /// The fallible core of a run. Lists matching alerts and closes them in
    /// order; `?` on any close aborts the remainder, so a failure part-way
    /// through leaves the later alerts untouched.
    async fn execute(&self) -> Result<usize> {
        let alerts = self.service.list_alerts().await?;
        debug!("Listed {} alert(s) to close", alerts.len());

        for alert in &alerts {
            debug!("Closing alert with id: {:?}", alert.id);
            self.service.close_alert(&alert.id).await?;
        }

        Ok(alerts.len())
    }
}
