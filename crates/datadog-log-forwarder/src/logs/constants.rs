// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logs intake limits and wire constants.

/// Maximum uncompressed size of one POST to the intake (5 MiB).
///
/// Larger payloads are answered with 413.
pub const MAX_CONTENT_SIZE_BYTES: usize = 5 * 1_024 * 1_024;

/// Size above which a single record is reported as oversized (1 MiB).
///
/// The intake truncates such records; they are still sent.
pub const MAX_LOG_SIZE_BYTES: usize = 1_024 * 1_024;

/// Maximum number of records in one POST.
pub const MAX_BATCH_ENTRIES_SIZE: usize = 1000;

/// Upper bound on a decompressed subscription envelope (64 MiB).
pub const MAX_DECOMPRESSED_ENVELOPE_BYTES: u64 = 64 * 1_024 * 1_024;

pub const INTAKE_PATH: &str = "/api/v2/logs";
pub const VALIDATE_PATH: &str = "/api/v1/validate";

pub const DEFAULT_SOURCE: &str = "cloudwatch";
pub const DEFAULT_SERVICE: &str = "cloudwatch-logs";

/// Value of the `DD-EVP-ORIGIN` header.
pub const EVP_ORIGIN: &str = "cloudwatch-log-forwarder";

pub const CONTROL_MESSAGE: &str = "CONTROL_MESSAGE";
