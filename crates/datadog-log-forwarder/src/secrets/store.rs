// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Failure reported by a [`SecretStore`]. Messages never contain the secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret store unreachable: {0}")]
    Unreachable(String),

    #[error("secret retrieval timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("malformed secret: {0}")]
    Malformed(String),

    #[error("secret store rejected the request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Transient failures are retried, everything else is final.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unreachable(_) | StoreError::Timeout(_))
    }
}

/// Source of the Datadog API key.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the API key, already extracted from the stored payload.
    async fn fetch(&self) -> Result<String, StoreError>;

    /// Human readable location used in logs, never the value.
    fn describe(&self) -> String;
}

/// Key provided directly through `DD_API_KEY`.
#[derive(Clone)]
pub struct StaticSecretStore {
    api_key: String,
}

impl StaticSecretStore {
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        StaticSecretStore {
            api_key: api_key.to_string(),
        }
    }
}

impl fmt::Debug for StaticSecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StaticSecretStore")
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn fetch(&self) -> Result<String, StoreError> {
        parse_secret_string(&self.api_key)
    }

    fn describe(&self) -> String {
        "DD_API_KEY".to_string()
    }
}

/// Extracts the API key from a stored secret.
///
/// Accepts a JSON object holding the key under `api_key` or `DD_API_KEY`, or
/// the raw key itself.
pub fn parse_secret_string(raw: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim();

    let key = if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| StoreError::Malformed(format!("invalid JSON secret: {e}")))?;
        ["api_key", "DD_API_KEY"]
            .iter()
            .find_map(|field| value.get(field).and_then(Value::as_str))
            .map(|key| key.trim().to_string())
            .ok_or_else(|| {
                StoreError::Malformed("JSON secret has no api_key or DD_API_KEY field".to_string())
            })?
    } else {
        trimmed.to_string()
    };

    if key.is_empty() {
        return Err(StoreError::Malformed("API key is empty".to_string()));
    }
    Ok(key)
}
