// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits intake records into POST-sized JSON arrays.
//!
//! Records are serialized as they are added, so the byte limit is checked
//! against exactly what goes on the wire (before compression). A batch closes
//! when the next record would exceed either the entry count or the byte
//! limit. Order is preserved within and across batches.

use crate::logs::constants;
use crate::logs::processor::IntakeLog;
use std::collections::VecDeque;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_entries: usize,
    pub max_content_bytes: usize,
    /// Records above this size are still sent; the intake truncates them.
    pub max_log_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        BatchLimits {
            max_entries: constants::MAX_BATCH_ENTRIES_SIZE,
            max_content_bytes: constants::MAX_CONTENT_SIZE_BYTES,
            max_log_bytes: constants::MAX_LOG_SIZE_BYTES,
        }
    }
}

/// A serialized JSON array of records, ready to POST.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardBatch {
    payload: Vec<u8>,
    records: usize,
}

impl ForwardBatch {
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of records in the batch.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Uncompressed payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[derive(Debug)]
pub struct Batcher {
    limits: BatchLimits,
    messages: VecDeque<String>,
    dropped: usize,
}

impl Batcher {
    #[must_use]
    pub fn new(limits: BatchLimits) -> Self {
        Batcher {
            limits,
            messages: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Queues a record. Returns `false` when the record can never fit in a
    /// batch and was dropped.
    pub fn add(&mut self, log: &IntakeLog) -> bool {
        let serialized = match serde_json::to_string(log) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("LOGS | Failed to serialize record {}: {e}", log.id);
                self.dropped += 1;
                return false;
            }
        };

        // `[` and `]` around a single record
        if serialized.len() + 2 > self.limits.max_content_bytes {
            warn!(
                "LOGS | Record {} is {} bytes, above the {} bytes payload limit, dropping it",
                log.id,
                serialized.len(),
                self.limits.max_content_bytes
            );
            self.dropped += 1;
            return false;
        }

        if serialized.len() > self.limits.max_log_bytes {
            warn!(
                "LOGS | Record {} size exceeds the {} bytes limit: {}, will be truncated by the backend.",
                log.id,
                self.limits.max_log_bytes,
                serialized.len()
            );
        }

        self.messages.push_back(serialized);
        true
    }

    /// Records dropped by [`Batcher::add`].
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Records still waiting to be batched.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.messages.len()
    }

    /// Takes the next batch, or `None` once every record has been batched.
    pub fn get_batch(&mut self) -> Option<ForwardBatch> {
        let mut buffer = Vec::with_capacity(self.limits.max_content_bytes.min(64 * 1024));
        buffer.push(b'[');
        let mut records = 0;

        while records < self.limits.max_entries {
            let Some(log) = self.messages.pop_front() else {
                break;
            };
            // the trailing comma becomes the closing bracket
            if buffer.len() + log.len() + 1 > self.limits.max_content_bytes {
                self.messages.push_front(log);
                break;
            }
            buffer.extend(log.as_bytes());
            buffer.push(b',');
            records += 1;
        }

        if records == 0 {
            return None;
        }
        buffer.pop();
        buffer.push(b']');

        Some(ForwardBatch {
            payload: buffer,
            records,
        })
    }
}

impl Iterator for Batcher {
    type Item = ForwardBatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_batch()
    }
}
