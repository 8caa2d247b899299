//! Metrics HTTP Server
//!
//! Serves the exposition-format snapshot of [`RunMetrics`] to Prometheus
//! scrapers. Each connection is handled on its own task, so a scrape is
//! never blocked by an in-flight run.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::metrics::RunMetrics;

/// Bound metrics listener, ready to serve.
///
/// Binding is separated from serving so a bind failure surfaces at startup
/// instead of inside a background task.
pub struct MetricsServer {
    listener: TcpListener,
    metrics: Arc<RunMetrics>,
}

impl MetricsServer {
    /// Bind the listener on `addr`.
    pub async fn bind(addr: SocketAddr, metrics: Arc<RunMetrics>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind metrics server on {}: {}", addr, e)))?;

        info!("Metrics server listening on {}", addr);

        Ok(Self { listener, metrics })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Error::Io)
    }

    /// Accept loop; runs until the process exits.
    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .map_err(|e| Error::Internal(format!("Metrics server accept error: {}", e)))?;

            let io = TokioIo::new(stream);
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let metrics = metrics.clone();
                    async move { handle(req, metrics) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Metrics server connection error: {}", e);
                }
            });
        }
    }
}

fn handle(
    req: Request<hyper::body::Incoming>,
    metrics: Arc<RunMetrics>,
) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let response = match req.uri().path() {
        "/" | "/metrics" => match metrics.render() {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap(),
            Err(e) => {
                error!("Failed to render metrics: {}", e);
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::from("metrics encoding failed")))
                    .unwrap()
            }
        },
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap(),
    };
    Ok(response)
}
