// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log processing rules, in the `logs_config.processing_rules` format.
//!
//! ```json
//! [
//!   {"type": "exclude_at_match", "name": "health", "pattern": "GET /health"},
//!   {"type": "mask_sequences", "name": "cards", "pattern": "\\d{4}-\\d{4}-\\d{4}-\\d{4}",
//!    "replace_placeholder": "[CARD]"}
//! ]
//! ```

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Drop records whose message matches.
    ExcludeAtMatch,
    /// Drop records whose message does not match.
    IncludeAtMatch,
    /// Replace every match with `replace_placeholder`.
    MaskSequences,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProcessingRule {
    #[serde(rename = "type")]
    pub kind: Kind,
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub replace_placeholder: Option<String>,
}

/// Parses the value of `DD_LOGS_CONFIG_PROCESSING_RULES`.
///
/// Lenient: a value that is not a JSON array yields `None`, and individual
/// malformed rules are logged and skipped.
#[must_use]
pub fn parse_processing_rules(raw: &str) -> Option<Vec<ProcessingRule>> {
    let value: JsonValue = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse processing rules: {e}, ignoring");
            return None;
        }
    };

    let JsonValue::Array(entries) = value else {
        error!("Processing rules must be a JSON array, ignoring");
        return None;
    };

    let rules: Vec<ProcessingRule> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(rule) => Some(rule),
            Err(e) => {
                error!("Failed to parse processing rule: {e}, ignoring");
                None
            }
        })
        .collect();

    if rules.is_empty() {
        None
    } else {
        Some(rules)
    }
}
