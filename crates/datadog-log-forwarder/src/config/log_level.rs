// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwarder log verbosity.
//!
//! Parsed case-insensitively from `LOG_LEVEL` (or `DD_LOG_LEVEL`). Unknown values
//! never prevent a cold start: they are reported and replaced by [`LogLevel::Info`].

use std::str::FromStr;
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl LogLevel {
    /// Lowercase directive usable in a `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parses `value`, falling back to the default level with an error log.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match LogLevel::from_str(value) {
            Ok(level) => level,
            Err(e) => {
                error!("{e}, using {}", LogLevel::default().as_filter_directive());
                LogLevel::default()
            }
        }
    }
}

/// Accepts the standard levels plus the Python-style aliases `warning`,
/// `critical` and `fatal` that existing deployments set in `LOG_LEVEL`.
impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" | "critical" | "fatal" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Invalid log level: '{s}'. Valid levels are: error, warn, info, debug, trace"
            )),
        }
    }
}
