//! Fetch-and-forward access to the metrics exporter running on each server.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

pub const DEFAULT_EXPORTER_PORT: u16 = 9100;
pub const DEFAULT_EXPORTER_PATH: &str = "/metrics";

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Server IP is not a valid exporter host: {0}")]
    InvalidTarget(String),

    #[error("Exporter did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Exporter is unreachable: {0}")]
    Unreachable(String),

    #[error("Exporter responded with status {0}")]
    UpstreamStatus(u16),
}

/// Raw exposition text as served by the exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterMetrics {
    pub body: String,
    pub content_type: Option<String>,
}

pub struct ExporterProxy {
    client: Client,
    port: u16,
    path: String,
    timeout: Duration,
}

impl ExporterProxy {
    pub fn new(port: u16, path: &str, timeout: Duration) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            client: Client::new(),
            port,
            path,
            timeout,
        }
    }

    pub fn target_url(&self, server_ip: &str) -> Result<String, ExporterError> {
        let ip: IpAddr = server_ip
            .trim()
            .parse()
            .map_err(|_| ExporterError::InvalidTarget(server_ip.to_string()))?;
        Ok(format!("http://{}{}", SocketAddr::new(ip, self.port), self.path))
    }

    pub async fn fetch(&self, server_ip: &str) -> Result<ExporterMetrics, ExporterError> {
        let url = self.target_url(server_ip)?;
        log::debug!("Fetching exporter metrics from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::UpstreamStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(ExporterMetrics { body, content_type })
    }

    fn classify(&self, err: reqwest::Error) -> ExporterError {
        if err.is_timeout() {
            ExporterError::Timeout(self.timeout)
        } else {
            ExporterError::Unreachable(err.to_string())
        }
    }
}
