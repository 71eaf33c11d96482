// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP access to Datadog: batch delivery to the logs intake and the
//! credential probe used by health checks.
//!
//! Response classification:
//!
//! | Response            | Result        | Handling                              |
//! |---------------------|---------------|---------------------------------------|
//! | 2xx                 | success       |                                       |
//! | 401, 403            | `AuthInvalid` | refresh the API key once, send again  |
//! | other 4xx           | `Rejected`    | surfaced, never retried               |
//! | 5xx, 3xx, transport | `Unavailable` | retried with backoff, then surfaced   |

use crate::config::Config;
use crate::error::ForwarderError;
use crate::logs::batcher::ForwardBatch;
use crate::logs::constants::{EVP_ORIGIN, INTAKE_PATH, VALIDATE_PATH};
use crate::retry::RetryPolicy;
use crate::secrets::{Secret, SecretCache};
use crate::FORWARDER_VERSION;
use reqwest::header::{HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use zstd::stream::write::Encoder;

const MAX_ERROR_BODY_CHARS: usize = 256;

/// What a successful probe was able to confirm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The API answered and accepted the key.
    Authenticated,
    /// The API answered; no key was available to verify.
    Reachable,
}

#[derive(Clone, Debug)]
pub struct DatadogClient {
    client: reqwest::Client,
    intake_url: String,
    validate_url: String,
    secrets: Arc<SecretCache>,
    retry_policy: RetryPolicy,
    timeout: Duration,
    use_compression: bool,
    compression_level: i32,
}

struct EncodedBody {
    bytes: Vec<u8>,
    zstd: bool,
}

impl DatadogClient {
    #[must_use]
    pub fn new(config: &Config, client: reqwest::Client, secrets: Arc<SecretCache>) -> Self {
        DatadogClient {
            client,
            intake_url: format!("{}{INTAKE_PATH}", config.logs_dd_url),
            validate_url: format!("{}{VALIDATE_PATH}", config.api_url),
            secrets,
            retry_policy: config.retry_policy(),
            timeout: config.flush_timeout(),
            use_compression: config.use_compression,
            compression_level: config.compression_level,
        }
    }

    #[must_use]
    pub fn intake_url(&self) -> &str {
        &self.intake_url
    }

    /// Delivers one batch. On `AuthInvalid` the API key is refreshed once and
    /// the batch sent once more.
    pub async fn send(&self, batch: &ForwardBatch) -> Result<(), ForwarderError> {
        let secret = self.secrets.get().await?;
        let body = self.encode(batch);

        match self.send_with_retry(&body, &secret).await {
            Err(ForwarderError::AuthInvalid(reason)) => {
                warn!("LOGS | API key refused by the intake ({reason}), refreshing it");
                let fresh = self.secrets.refresh(&secret).await.map_err(|e| {
                    ForwarderError::AuthInvalid(format!("{reason}; key refresh failed: {e}"))
                })?;
                self.send_with_retry(&body, &fresh).await
            }
            result => result,
        }
    }

    async fn send_with_retry(
        &self,
        body: &EncodedBody,
        secret: &Secret,
    ) -> Result<(), ForwarderError> {
        self.retry_policy
            .retry(
                "LOGS | send",
                |attempt| self.send_once(body, secret, attempt),
                |e: &ForwarderError| e.kind().is_retryable(),
            )
            .await
    }

    async fn send_once(
        &self,
        body: &EncodedBody,
        secret: &Secret,
        attempt: u32,
    ) -> Result<(), ForwarderError> {
        let mut request = self
            .client
            .post(&self.intake_url)
            .timeout(self.timeout)
            .header("DD-API-KEY", api_key_header(secret)?)
            .header(CONTENT_TYPE, "application/json")
            .header("DD-EVP-ORIGIN", EVP_ORIGIN)
            .header("DD-EVP-ORIGIN-VERSION", FORWARDER_VERSION);
        if body.zstd {
            request = request.header(CONTENT_ENCODING, "zstd");
        }

        let time = Instant::now();
        let response = request
            .body(body.bytes.clone())
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let status = response.status();
        debug!(
            "LOGS | Intake answered {status} in {} ms (attempt {attempt})",
            time.elapsed().as_millis()
        );
        classify(response).await
    }

    /// Checks that the Datadog API is reachable and, given a key, that it is
    /// valid. Never touches the intake. Fails with `AuthInvalid` or
    /// `Unavailable` only.
    pub async fn probe(&self, secret: Option<&Secret>) -> Result<ProbeOutcome, ForwarderError> {
        let mut request = self.client.get(&self.validate_url).timeout(self.timeout);
        if let Some(secret) = secret {
            request = request.header("DD-API-KEY", api_key_header(secret)?);
        }

        let response = request.send().await.map_err(|e| transport_error(&e))?;

        match secret {
            Some(_) => match classify(response).await {
                Ok(()) => Ok(ProbeOutcome::Authenticated),
                Err(ForwarderError::Rejected { status, message }) => Err(
                    ForwarderError::Unavailable(format!("HTTP {status}: {message}")),
                ),
                Err(e) => Err(e),
            },
            None if response.status().is_server_error() => Err(ForwarderError::Unavailable(
                format!("HTTP {}", response.status()),
            )),
            None => Ok(ProbeOutcome::Reachable),
        }
    }

    fn encode(&self, batch: &ForwardBatch) -> EncodedBody {
        if self.use_compression {
            match self.compress(batch.payload()) {
                Ok(bytes) => return EncodedBody { bytes, zstd: true },
                Err(e) => debug!("LOGS | Failed to compress data: {e}, sending uncompressed"),
            }
        }
        EncodedBody {
            bytes: batch.payload().to_vec(),
            zstd: false,
        }
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = Encoder::new(Vec::new(), self.compression_level)?;
        encoder.write_all(data)?;
        encoder.finish()
    }
}

fn api_key_header(secret: &Secret) -> Result<HeaderValue, ForwarderError> {
    let mut value = HeaderValue::from_str(secret.expose()).map_err(|_| {
        ForwarderError::AuthInvalid("API key is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn transport_error(e: &reqwest::Error) -> ForwarderError {
    if e.is_timeout() {
        ForwarderError::Unavailable("request timed out".to_string())
    } else {
        ForwarderError::Unavailable(format!("request failed: {e}"))
    }
}

async fn classify(response: Response) -> Result<(), ForwarderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let message = truncate(&body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ForwarderError::AuthInvalid(format!("HTTP {status}")))
        }
        s if s.is_client_error() => Err(ForwarderError::Rejected {
            status: s.as_u16(),
            message,
        }),
        s => Err(ForwarderError::Unavailable(format!("HTTP {s}: {message}"))),
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_string(),
    }
}
