//! Opsgenie Alert Service Client
//!
//! Thin capability over the Opsgenie REST v2 alert API: list open alerts
//! matching a query, close an alert by id. The rest of the crate depends on
//! the [`AlertService`] port, not on this concrete client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Opsgenie client
#[derive(Debug, Clone)]
pub struct OpsgenieConfig {
    /// Base URL of the Opsgenie API
    pub api_url: String,

    /// API key sent as `Authorization: GenieKey <key>`
    pub api_key: String,

    /// Alert search query (Opsgenie query language)
    pub query: String,

    /// Maximum number of alerts returned per listing
    pub query_limit: u32,

    /// Optional request timeout; `None` reproduces the reference behavior of
    /// waiting on the remote service indefinitely
    pub timeout: Option<Duration>,
}

impl Default for OpsgenieConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.opsgenie.com".to_string(),
            api_key: String::new(),
            query: String::new(),
            query_limit: 100,
            timeout: None,
        }
    }
}

// =============================================================================
// Alert
// =============================================================================

/// An alert as returned by the listing call. Only the id is interpreted;
/// everything else about the alert stays on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Alert {
    /// Opaque alert identifier
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct ListAlertsResponse {
    data: Vec<Alert>,
}

#[derive(Debug, Serialize)]
struct CloseAlertPayload {
    user: String,
    note: String,
    source: String,
}

impl Default for CloseAlertPayload {
    fn default() -> Self {
        Self {
            user: "opsgenie-alerts-manager".to_string(),
            note: "closed by scheduled alerts manager".to_string(),
            source: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

// =============================================================================
// Port
// =============================================================================

/// Capability the run job needs from the alert-management service.
///
/// Implemented by [`OpsgenieClient`] for production and by scripted doubles
/// in tests.
#[async_trait]
pub trait AlertService: Send + Sync {
    /// List open alerts matching the configured query, bounded by the
    /// configured limit.
    async fn list_alerts(&self) -> Result<Vec<Alert>>;

    /// Close a single alert by id.
    async fn close_alert(&self, alert_id: &str) -> Result<()>;
}

// =============================================================================
// Client
// =============================================================================

/// Opsgenie REST v2 client
pub struct OpsgenieClient {
    config: OpsgenieConfig,
    client: Client,
}

impl OpsgenieClient {
    /// Create a new client. Fails if the underlying HTTP client cannot be
    /// constructed (TLS backend initialization).
    pub fn new(config: OpsgenieConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn auth_header(&self) -> String {
        format!("GenieKey {}", self.config.api_key)
    }

    /// Convert a non-success response into an API error, consuming the body
    /// as the message.
    async fn api_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Error::OpsgenieApi { status, message }
    }
}

#[async_trait]
impl AlertService for OpsgenieClient {
    #[instrument(skip(self))]
    async fn list_alerts(&self) -> Result<Vec<Alert>> {
        let url = format!("{}/v2/alerts", self.config.api_url);
        let limit = self.config.query_limit.to_string();

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .query(&[
                ("query", self.config.query.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(Error::OpsgenieConnection)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: ListAlertsResponse = response
            .json()
            .await
            .map_err(Error::OpsgenieConnection)?;

        Ok(body.data)
    }

    #[instrument(skip(self), fields(alert_id = %alert_id))]
    async fn close_alert(&self, alert_id: &str) -> Result<()> {
        let url = format!(
            "{}/v2/alerts/{}/close?identifierType=id",
            self.config.api_url, alert_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&CloseAlertPayload::default())
            .send()
            .await
            .map_err(Error::OpsgenieConnection)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(())
    }
}
