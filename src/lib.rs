//! Opsgenie Alerts Manager
//!
//! A scheduled daemon that once per day lists the Opsgenie alerts matching a
//! configured query, closes each of them, and exports the outcome of the
//! most recent run as Prometheus metrics.
//!
//! # Architecture
//!
//! ```text
//! Scheduler ──▶ Run Job ──▶ Alert Service Client (1 list, N closes)
//!                  │
//!                  ▼
//!             Run Metrics ◀── Metrics HTTP Server (concurrent scrapes)
//! ```
//!
//! The scheduler owns the only long-lived loop and awaits the job in-line,
//! so runs never overlap; the metrics server reads the metric set on its own
//! tasks and is never blocked by a slow run.
//!
//! # Modules
//!
//! - [`error`] - Error types
//! - [`job`] - The daily list-then-close run job
//! - [`metrics`] - The exported metric set
//! - [`opsgenie`] - Alert service port and Opsgenie REST client
//! - [`scheduler`] - Daily schedule and polling loop
//! - [`server`] - Metrics HTTP server

pub mod error;
pub mod job;
pub mod metrics;
pub mod opsgenie;
pub mod scheduler;
pub mod server;

// Re-export commonly used types
pub use error::{Error, Result};
pub use job::RunJob;
pub use metrics::RunMetrics;
pub use opsgenie::{Alert, AlertService, OpsgenieClient, OpsgenieConfig};
pub use scheduler::{DailySchedule, Scheduler};
pub use server::MetricsServer;
