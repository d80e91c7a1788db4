//! Chat announcer: delivers outcome lines to a chat channel.
//!
//! Posts `{"channel": ..., "text": ...}` to an incoming-webhook URL:
//! - Outcome lines are fire and forget (one attempt, warn on failure)
//! - Announcements (online/offline) are retried with exponential backoff
//! - Optional bearer token authentication

use std::time::Duration;

use async_trait::async_trait;

use crate::version::SPOTQ_VERSION;

#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Chat endpoint returned non-retryable status {0}")]
    Status(u16),
    #[error("Chat announcement failed after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Outbound delivery channel for chat text.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Best-effort delivery of the lines produced by one command.
    async fn deliver(&self, lines: &[String]);

    /// Delivery that matters (startup/shutdown), retried on transient failures.
    async fn announce(&self, text: &str) -> Result<(), AnnounceError>;
}

#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    pub channel: String,
    pub token: Option<String>,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub retry_status_codes: Vec<u16>,
    pub timeout: Duration,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            channel: "#parking".to_string(),
            token: None,
            max_retries: 5,
            backoff_base: Duration::from_millis(200),
            retry_status_codes: vec![429, 500, 502, 503, 504],
            timeout: Duration::from_secs(10),
        }
    }
}

/// Announcer backed by an HTTP incoming webhook.
pub struct ChatAnnouncer {
    url: String,
    config: AnnouncerConfig,
    client: reqwest::Client,
}

impl ChatAnnouncer {
    pub fn new(url: String, config: AnnouncerConfig) -> Result<Self, AnnounceError> {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(token) = &config.token
            && let Ok(value) = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
        {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let user_agent = format!("spotq/{}", SPOTQ_VERSION);
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&user_agent) {
            headers.insert(reqwest::header::USER_AGENT, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(AnnounceError::Client)?;

        Ok(Self {
            url,
            config,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    fn build_request(&self, text: &str) -> reqwest::RequestBuilder {
        self.client.post(&self.url).json(&serde_json::json!({
            "channel": self.config.channel,
            "text": text,
        }))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config.backoff_base * (1 << attempt.min(10))
    }
}

#[async_trait]
impl Announcer for ChatAnnouncer {
    async fn deliver(&self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }

        match self.build_request(&lines.join("\n")).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(lines = lines.len(), "Delivered outcome to chat");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status().as_u16(), "Chat rejected outcome lines");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to deliver outcome lines to chat");
            }
        }
    }

    async fn announce(&self, text: &str) -> Result<(), AnnounceError> {
        let mut attempt = 0;
        loop {
            match self.build_request(text).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        tracing::debug!(status = %status, "Announcement sent");
                        return Ok(());
                    }

                    if !self.config.retry_status_codes.contains(&status) {
                        tracing::error!(status = %status, "Announcement failed with non-retryable status");
                        return Err(AnnounceError::Status(status));
                    }

                    attempt += 1;
                    if attempt > self.config.max_retries {
                        tracing::error!(
                            status = %status,
                            attempts = attempt,
                            "Announcement failed after max retries"
                        );
                        return Err(AnnounceError::Exhausted { attempts: attempt });
                    }

                    let backoff = self.backoff(attempt);
                    tracing::warn!(
                        status = %status,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis(),
                        "Announcement failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        tracing::error!(
                            error = %e,
                            attempts = attempt,
                            "Announcement failed after max retries"
                        );
                        return Err(AnnounceError::Request(e));
                    }

                    let backoff = self.backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis(),
                        "Announcement request error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
