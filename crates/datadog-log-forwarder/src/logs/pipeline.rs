// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One forwarding invocation: decode, authenticate, enrich, batch, send.

use crate::error::{ErrorKind, ForwarderError};
use crate::logs::batcher::{BatchLimits, Batcher};
use crate::logs::client::DatadogClient;
use crate::logs::decoder::SubscriptionEnvelope;
use crate::logs::processor::LogsProcessor;
use crate::logs::InvocationContext;
use crate::secrets::SecretCache;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of a forward that got past decoding and key retrieval.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ForwardSummary {
    pub batches_sent: usize,
    pub records_sent: usize,
    /// Events dropped by processing rules.
    pub records_filtered: usize,
    /// Events too large for any batch.
    pub records_dropped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// HTTP status of the response that rejected a batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ForwardSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

#[derive(Debug)]
pub struct ForwardingPipeline {
    secrets: Arc<SecretCache>,
    client: Arc<DatadogClient>,
    processor: LogsProcessor,
    limits: BatchLimits,
}

impl ForwardingPipeline {
    #[must_use]
    pub fn new(
        secrets: Arc<SecretCache>,
        client: Arc<DatadogClient>,
        processor: LogsProcessor,
        limits: BatchLimits,
    ) -> Self {
        ForwardingPipeline {
            secrets,
            client,
            processor,
            limits,
        }
    }

    /// Forwards every event of `envelope`.
    ///
    /// Decode and key retrieval failures are returned as errors and nothing
    /// is sent. Send failures stop at the first failing batch and are
    /// reported in the summary together with the progress made so far.
    pub async fn forward(
        &self,
        envelope: &SubscriptionEnvelope,
        context: &InvocationContext,
    ) -> Result<ForwardSummary, ForwarderError> {
        let decoded = envelope.decode()?;
        if decoded.is_control_message() {
            info!("LOGS | Received CloudWatch control message, nothing to forward");
            return Ok(ForwardSummary::default());
        }
        if decoded.is_empty() {
            debug!("LOGS | Envelope has no log events");
            return Ok(ForwardSummary::default());
        }

        self.secrets.get().await?;

        let (metadata, events) = decoded.into_parts();
        let processor = self.processor.for_invocation(&metadata, context);
        let mut batcher = Batcher::new(self.limits);
        let mut summary = ForwardSummary::default();

        for event in events {
            match processor.process(&event) {
                Some(log) => {
                    batcher.add(&log);
                }
                None => summary.records_filtered += 1,
            }
        }
        summary.records_dropped = batcher.dropped();

        for batch in batcher.by_ref() {
            if let Err(e) = self.client.send(&batch).await {
                error!(
                    "LOGS | Failed to send batch {} of {} records from {}: {e}",
                    summary.batches_sent + 1,
                    batch.records(),
                    metadata.log_group
                );
                if let ForwarderError::Rejected { status, .. } = &e {
                    summary.status = Some(*status);
                }
                summary.failed = Some(e.kind());
                summary.message = Some(e.to_string());
                return Ok(summary);
            }
            summary.batches_sent += 1;
            summary.records_sent += batch.records();
        }

        info!(
            "LOGS | Forwarded {} records in {} batches from {}",
            summary.records_sent, summary.batches_sent, metadata.log_group
        );
        Ok(summary)
    }
}
