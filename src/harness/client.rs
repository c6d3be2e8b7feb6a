//! Remote execution client
//!
//! Talks to a judgebox execution service (or anything speaking the same
//! `POST /execute` protocol) over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::sandbox::{encode_source, CodeExecutor, ExecutionRequest, ExecutionResult};

#[derive(Debug, Serialize)]
struct RemoteRequest<'a> {
    language: &'a str,
    source_code: String,
    input: &'a str,
}

/// Executor backed by a remote execution service
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid execution service URL {}: {}", base_url, e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(HttpExecutor {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CodeExecutor for HttpExecutor {
    fn name(&self) -> &str {
        "remote"
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let url = format!("{}/execute", self.base_url);
        debug!("Sending {} submission to {}", request.language, url);

        let body = RemoteRequest {
            language: &request.language,
            source_code: encode_source(&request.source_code),
            input: &request.stdin,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            let result = response.json::<ExecutionResult>().await?;
            // the service reports its own failures in-band; surface them as
            // executor errors like the in-process sandbox does
            if let Some(message) = result.system_error_message() {
                warn!("Execution service failed: {}", message);
                return Err(Error::Sandbox(message.to_string()));
            }
            Ok(result)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Execution service returned {}: {}", status, error_text);
            Err(Error::Sandbox(format!(
                "Execution service error ({}): {}",
                status, error_text
            )))
        }
    }
}
