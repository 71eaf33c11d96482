// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudWatch Logs subscription envelope decoding.
//!
//! CloudWatch delivers `{"awslogs": {"data": "<base64>"}}` where `data` is a
//! gzip-compressed JSON document:
//!
//! ```json
//! {
//!   "messageType": "DATA_MESSAGE",
//!   "owner": "123456789012",
//!   "logGroup": "/aws/lambda/app",
//!   "logStream": "2024/01/01/[$LATEST]abc",
//!   "subscriptionFilters": ["datadog"],
//!   "logEvents": [{"id": "3759...", "timestamp": 1700000000000, "message": "hello"}]
//! }
//! ```

use crate::error::ForwarderError;
use crate::logs::constants::{CONTROL_MESSAGE, MAX_DECOMPRESSED_ENVELOPE_BYTES};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::io::Read;

/// The encoded `awslogs.data` payload of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionEnvelope {
    data: String,
}

impl SubscriptionEnvelope {
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        SubscriptionEnvelope { data: data.into() }
    }

    /// Decodes the envelope. Each call starts again from the encoded data.
    pub fn decode(&self) -> Result<DecodedEnvelope, ForwarderError> {
        self.decode_with_limit(MAX_DECOMPRESSED_ENVELOPE_BYTES)
    }

    pub fn decode_with_limit(&self, max_bytes: u64) -> Result<DecodedEnvelope, ForwarderError> {
        let compressed = STANDARD
            .decode(self.data.trim())
            .map_err(|e| ForwarderError::Decode(format!("invalid base64: {e}")))?;

        let mut json = Vec::new();
        MultiGzDecoder::new(compressed.as_slice())
            .take(max_bytes.saturating_add(1))
            .read_to_end(&mut json)
            .map_err(|e| ForwarderError::Decode(format!("invalid gzip: {e}")))?;

        if json.len() as u64 > max_bytes {
            return Err(ForwarderError::Decode(format!(
                "decompressed envelope exceeds {max_bytes} bytes"
            )));
        }

        serde_json::from_slice(&json)
            .map_err(|e| ForwarderError::Decode(format!("invalid JSON: {e}")))
    }
}

/// One CloudWatch log line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    id: String,
    timestamp: i64,
    message: String,
}

impl LogEvent {
    #[must_use]
    pub fn new(id: impl Into<String>, timestamp: i64, message: impl Into<String>) -> Self {
        LogEvent {
            id: id.into(),
            timestamp,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Where the events came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    pub owner: String,
    pub log_group: String,
    pub log_stream: String,
    pub subscription_filters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEnvelope {
    #[serde(default)]
    message_type: String,
    #[serde(default)]
    owner: String,
    log_group: String,
    log_stream: String,
    #[serde(default)]
    subscription_filters: Vec<String>,
    #[serde(default)]
    log_events: Vec<LogEvent>,
}

impl DecodedEnvelope {
    /// CloudWatch sends a control message when a subscription is created to
    /// check the destination. It carries no user logs.
    #[must_use]
    pub fn is_control_message(&self) -> bool {
        self.message_type == CONTROL_MESSAGE
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log_events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log_events.is_empty()
    }

    /// Splits into source metadata and a one-shot iterator over the events,
    /// in delivery order.
    #[must_use]
    pub fn into_parts(self) -> (SourceMetadata, std::vec::IntoIter<LogEvent>) {
        let metadata = SourceMetadata {
            owner: self.owner,
            log_group: self.log_group,
            log_stream: self.log_stream,
            subscription_filters: self.subscription_filters,
        };
        (metadata, self.log_events.into_iter())
    }
}
