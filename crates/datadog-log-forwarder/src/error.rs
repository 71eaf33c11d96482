// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by every stage of an invocation.
//!
//! Each [`ForwarderError`] maps to exactly one [`ErrorKind`]. The kind is what
//! callers branch on (retry, refresh the API key, give up); the message is
//! what ends up in the invocation result and the function logs.

use serde::Serialize;
use std::fmt;

/// Classification of a failed invocation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The invocation payload is neither a health check nor a subscription envelope.
    InvalidPayload,
    /// The subscription envelope could not be base64-decoded, decompressed or parsed.
    DecodeError,
    /// The Datadog API key could not be retrieved from the secret store.
    SecretUnavailable,
    /// The intake refused the batch (4xx). Never retried.
    Rejected,
    /// The intake or the network failed (5xx, timeout, connection error).
    Unavailable,
    /// The intake refused the API key (401/403).
    AuthInvalid,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidPayload => "InvalidPayload",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::SecretUnavailable => "SecretUnavailable",
            ErrorKind::Rejected => "Rejected",
            ErrorKind::Unavailable => "Unavailable",
            ErrorKind::AuthInvalid => "AuthInvalid",
        }
    }

    /// Whether the invocation must fail so CloudWatch redelivers the
    /// envelope. A rejected batch would be rejected again.
    #[must_use]
    pub fn fails_invocation(self) -> bool {
        !matches!(self, ErrorKind::Rejected)
    }

    /// Whether the failure is transient and worth another attempt with the same inputs.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Unavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the forwarder to the hosting runtime.
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("InvalidPayload: {0}")]
    InvalidPayload(String),

    #[error("DecodeError: {0}")]
    Decode(String),

    #[error("SecretUnavailable: {0}")]
    SecretUnavailable(String),

    #[error("Rejected: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("AuthInvalid: {0}")]
    AuthInvalid(String),

    /// A forward that stopped part-way. Carries the progress made before the failure.
    #[error("{message} (sent {batches_sent} batches, {records_sent} records before failing)")]
    Forward {
        kind: ErrorKind,
        batches_sent: usize,
        records_sent: usize,
        message: String,
    },
}

impl ForwarderError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForwarderError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            ForwarderError::Decode(_) => ErrorKind::DecodeError,
            ForwarderError::SecretUnavailable(_) => ErrorKind::SecretUnavailable,
            ForwarderError::Rejected { .. } => ErrorKind::Rejected,
            ForwarderError::Unavailable(_) => ErrorKind::Unavailable,
            ForwarderError::AuthInvalid(_) => ErrorKind::AuthInvalid,
            ForwarderError::Forward { kind, .. } => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_prefixed_with_kind() {
        let error = ForwarderError::SecretUnavailable("access denied".to_string());
        assert_eq!(error.to_string(), "SecretUnavailable: access denied");

        let error = ForwarderError::Rejected {
            status: 413,
            message: "payload too large".to_string(),
        };
        assert_eq!(error.to_string(), "Rejected: HTTP 413: payload too large");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ForwarderError::InvalidPayload(String::new()).kind(),
            ErrorKind::InvalidPayload
        );
        assert_eq!(
            ForwarderError::Decode(String::new()).kind(),
            ErrorKind::DecodeError
        );
        assert_eq!(
            ForwarderError::AuthInvalid(String::new()).kind(),
            ErrorKind::AuthInvalid
        );
        let error = ForwarderError::Forward {
            kind: ErrorKind::Rejected,
            batches_sent: 1,
            records_sent: 3,
            message: "Rejected: HTTP 400: bad".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Rejected);
        assert_eq!(
            error.to_string(),
            "Rejected: HTTP 400: bad (sent 1 batches, 3 records before failing)"
        );
    }

    #[test]
    fn test_rejected_does_not_fail_invocation() {
        assert!(!ErrorKind::Rejected.fails_invocation());
        assert!(ErrorKind::Unavailable.fails_invocation());
        assert!(ErrorKind::SecretUnavailable.fails_invocation());
        assert!(ErrorKind::DecodeError.fails_invocation());
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(ErrorKind::Unavailable.is_retryable());
        assert!(!ErrorKind::Rejected.is_retryable());
        assert!(!ErrorKind::AuthInvalid.is_retryable());
        assert!(!ErrorKind::SecretUnavailable.is_retryable());
    }

    #[test]
    fn test_kind_serializes_by_name() {
        let value = serde_json::to_value(ErrorKind::AuthInvalid).unwrap();
        assert_eq!(value, serde_json::json!("AuthInvalid"));
    }
}
