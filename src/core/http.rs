//! HTTP transport shared by the chat client.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::error::ChatError;

/// Configuration for HTTP client resilience.
///
/// The defaults reproduce a plain blocking call: no timeout and no retries.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    /// Base duration for exponential backoff
    pub initial_retry_delay: Duration,
    /// Cap on the backoff duration
    pub max_retry_delay: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: 0,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(10),
        }
    }
}

impl HttpClientConfig {
    fn backoff(&self, attempt: u32) -> Duration {
        // Past 2^30 the cap always wins; clamping keeps the exponent in range.
        let exponent = attempt.min(30) as i32;
        let base_delay = self.initial_retry_delay.as_millis() as f64 * 2_f64.powi(exponent);

        // +/- 10% jitter (0.9 to 1.1)
        let jitter_factor = rand::random::<f64>() * 0.2 + 0.9;
        let delay_ms = (base_delay * jitter_factor) as u64;

        Duration::from_millis(delay_ms).min(self.max_retry_delay)
    }
}

/// Thin wrapper around `reqwest::Client` that posts JSON and maps failures
/// onto [`ChatError`].
pub struct HttpClient {
    client: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig, user_agent: Option<&str>) -> Result<Self, ChatError> {
        let default_ua = format!("azure-chat/{}", env!("CARGO_PKG_VERSION"));
        let ua = user_agent.unwrap_or(&default_ua);

        let mut builder = reqwest::Client::builder().user_agent(ua);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            ChatError::Configuration(format!("Failed to build reqwest client: {e}"))
        })?;

        Ok(Self { client, config })
    }

    /// POST `body` as JSON and decode the success body as `Res`.
    ///
    /// 429 and 5xx responses and transport failures are retried up to
    /// `max_retries` times. Every other status fails immediately.
    #[tracing::instrument(
        name = "http_post_json",
        skip(self, headers, body),
        fields(url = %url),
        err
    )]
    pub async fn post_json<Req, Res>(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Req,
    ) -> Result<Res, ChatError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let mut last_error: Option<ChatError> = None;

        for attempt in 0..=self.config.max_retries {
            let mut req_builder = self.client.post(url).json(body);
            for (name, value) in headers {
                req_builder = req_builder.header(name, value);
            }

            match req_builder.send().await {
                Err(e) => {
                    let malformed = e.is_builder();
                    let error = ChatError::Network {
                        message: format!(
                            "Request failed ({})",
                            attempt_label(attempt, self.config.max_retries)
                        ),
                        source: Box::new(e),
                    };
                    // A URL that cannot be parsed will not get better on retry.
                    if malformed {
                        return Err(error);
                    }
                    warn!(attempt, error = %error, "HTTP request failed");
                    last_error = Some(error);
                }
                Ok(res) => {
                    let status = res.status();

                    if status.is_success() {
                        debug!(status = %status, "HTTP request successful");

                        let response_text = res.text().await.map_err(|e| ChatError::Network {
                            message: "Failed to read response body".to_string(),
                            source: Box::new(e),
                        })?;

                        return serde_json::from_str(&response_text).map_err(|e| {
                            ChatError::Parse {
                                message: "Failed to parse API response".to_string(),
                                source: Box::new(e),
                            }
                        });
                    }

                    warn!(attempt, status = %status, "API returned error status");

                    let error_text = res
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let error = error_for_status(status, &error_text);

                    if !is_retryable(status) {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.backoff(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| ChatError::Api {
            message: format!(
                "Request failed after max retries ({}) with unknown error",
                self.config.max_retries
            ),
            status_code: None,
        }))
    }
}

/// `attempt N/M` with both counts 1-based. Saturates so `u32::MAX` retries
/// still formats.
fn attempt_label(attempt: u32, max_retries: u32) -> String {
    format!(
        "attempt {}/{}",
        attempt.saturating_add(1),
        max_retries.saturating_add(1)
    )
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: String,
}

/// Map a non-success status and its body onto a [`ChatError`], preferring
/// the service's own `{"error": {"code", "message"}}` description.
fn error_for_status(status: StatusCode, body: &str) -> ChatError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody {
                code: Some(code),
                message,
            },
        }) => format!("{code}: {message}"),
        Ok(ErrorEnvelope { error }) => error.message,
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body.to_string(),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Authentication {
            message,
            status_code: status.as_u16(),
        },
        _ => ChatError::Api {
            message,
            status_code: Some(status.as_u16()),
        },
    }
}
