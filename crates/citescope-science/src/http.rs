use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{Result, ScienceError};

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// HTTP client that spaces requests by `min_interval` and retries 429
/// responses and connection failures. A whole `get`, retries and back-off
/// included, is bounded by `timeout`.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    timeout: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        timeout: Duration,
        max_retries: u32,
        user_agent: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            min_interval,
            timeout,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.get_with_retries(url, query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url, timeout = ?self.timeout, "request budget exhausted");
                Err(ScienceError::Timeout)
            }
        }
    }

    async fn get_with_retries(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            tracing::debug!(url, attempt, "GET");
            let resp = self.client.get(url).query(query).send().await;
            match resp {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    if attempt >= self.max_retries {
                        return Err(ScienceError::RateLimit(url.to_string(), wait));
                    }
                    tracing::warn!(url, wait, "rate limited, backing off");
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ScienceError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return r.text().await.map_err(ScienceError::from_transport),
                Err(e) if e.is_timeout() => return Err(ScienceError::Timeout),
                Err(e) => {
                    if attempt >= self.max_retries || !e.is_connect() {
                        return Err(ScienceError::Http(e));
                    }
                    let backoff = 2u64.pow(attempt);
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let text = self.get(url, query).await?;
        serde_json::from_str(&text).map_err(|e| ScienceError::Parse(e.to_string()))
    }
}
