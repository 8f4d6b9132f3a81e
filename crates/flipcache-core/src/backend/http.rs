use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, warn};

use super::{Backend, BackendCommand, BackendError};

/// Path of the command endpoint under the configured base URL.
const RPC_PATH: &str = "/rpc";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Serialize)]
struct RpcRequest<'a> {
    argv: &'a [String],
}

/// Sends commands to a backend bridge over HTTP.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), RPC_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns Ok(Some(body)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<String>, BackendError> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Ok(None);
        }
        let body = response.text().await?;
        if status.is_success() {
            Ok(Some(body))
        } else {
            Err(BackendError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, command: &BackendCommand) -> Result<String, BackendError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            debug!(url = %self.url, command = %command, "Sending backend command");
            let response = self
                .client
                .post(&self.url)
                .header(header::ACCEPT, "text/plain")
                .json(&RpcRequest { argv: &command.argv })
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(body) => return Ok(body),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(BackendError::RateLimited);
                    }
                    warn!(url = %self.url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}
