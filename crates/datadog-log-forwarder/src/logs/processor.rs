// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns decoded CloudWatch events into intake records.
//!
//! Processing rules run first, on the message text. Surviving events are
//! enriched with the source, service, tags and AWS origin of the envelope.
//! Messages that are JSON objects also have their keys lifted to top-level
//! attributes so they are searchable without a pipeline.

use crate::config::processing_rule::{self, ProcessingRule};
use crate::config::Config;
use crate::logs::decoder::{LogEvent, SourceMetadata};
use crate::logs::InvocationContext;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Keys an attribute lifted from a JSON message may never replace.
const RESERVED_KEYS: [&str; 8] = [
    "message",
    "timestamp",
    "ddsource",
    "ddtags",
    "service",
    "hostname",
    "id",
    "aws",
];

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct IntakeLog {
    pub message: String,
    pub timestamp: i64,
    pub ddsource: String,
    pub ddtags: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub id: String,
    pub aws: AwsAttributes,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AwsAttributes {
    pub awslogs: AwsLogsOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked_function_arn: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsLogsOrigin {
    pub log_group: String,
    pub log_stream: String,
    pub owner: String,
}

#[derive(Clone, Debug)]
struct Rule {
    kind: processing_rule::Kind,
    regex: regex::Regex,
    placeholder: String,
}

/// Long-lived part of the processor, built once from configuration.
#[derive(Clone, Debug)]
pub struct LogsProcessor {
    source: String,
    service: String,
    hostname: Option<String>,
    tags: Vec<String>,
    rules: Option<Vec<Rule>>,
}

impl LogsProcessor {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        LogsProcessor {
            source: config.source.clone(),
            service: config.service.clone(),
            hostname: config.hostname.clone(),
            tags: config.tags.clone(),
            rules: Self::compile_rules(config.processing_rules.as_deref()),
        }
    }

    /// Binds the processor to one envelope, precomputing what every record
    /// of that envelope shares.
    #[must_use]
    pub fn for_invocation(
        &self,
        metadata: &SourceMetadata,
        context: &InvocationContext,
    ) -> InvocationProcessor<'_> {
        let mut tags = self.tags.clone();
        tags.push(format!("log_group:{}", metadata.log_group));
        tags.push(format!("log_stream:{}", metadata.log_stream));
        if let Some(region) = context.region() {
            tags.push(format!("region:{region}"));
        }

        InvocationProcessor {
            processor: self,
            ddtags: tags.join(","),
            aws: AwsAttributes {
                awslogs: AwsLogsOrigin {
                    log_group: metadata.log_group.clone(),
                    log_stream: metadata.log_stream.clone(),
                    owner: metadata.owner.clone(),
                },
                invoked_function_arn: context.invoked_function_arn.clone(),
            },
        }
    }

    /// Returns `false` when the message must be dropped. Mask rules rewrite
    /// `message` in place.
    fn apply_rules(&self, message: &mut String) -> bool {
        let Some(rules) = &self.rules else {
            return true;
        };

        for rule in rules {
            match rule.kind {
                processing_rule::Kind::ExcludeAtMatch => {
                    if rule.regex.is_match(message) {
                        return false;
                    }
                }
                processing_rule::Kind::IncludeAtMatch => {
                    if !rule.regex.is_match(message) {
                        return false;
                    }
                }
                processing_rule::Kind::MaskSequences => {
                    let masked = rule.regex.replace_all(message, rule.placeholder.as_str());
                    *message = masked.into_owned();
                }
            }
        }
        true
    }

    fn compile_rules(rules: Option<&[ProcessingRule]>) -> Option<Vec<Rule>> {
        let rules = rules.filter(|rules| !rules.is_empty())?;

        let compiled = rules
            .iter()
            .filter_map(|rule| match regex::Regex::new(&rule.pattern) {
                Ok(regex) => Some(Rule {
                    kind: rule.kind,
                    regex,
                    placeholder: rule.replace_placeholder.clone().unwrap_or_default(),
                }),
                Err(e) => {
                    error!(
                        "Failed to compile processing rule '{}': {e}, ignoring",
                        rule.name
                    );
                    None
                }
            })
            .collect();
        Some(compiled)
    }
}

pub struct InvocationProcessor<'a> {
    processor: &'a LogsProcessor,
    ddtags: String,
    aws: AwsAttributes,
}

impl InvocationProcessor<'_> {
    /// Returns `None` when a processing rule filters the event out.
    #[must_use]
    pub fn process(&self, event: &LogEvent) -> Option<IntakeLog> {
        let mut message = event.message().to_string();
        if !self.processor.apply_rules(&mut message) {
            debug!("LOGS | Event {} filtered by processing rules", event.id());
            return None;
        }

        let attributes = lift_attributes(&message);

        Some(IntakeLog {
            message,
            timestamp: event.timestamp(),
            ddsource: self.processor.source.clone(),
            ddtags: self.ddtags.clone(),
            service: self.processor.service.clone(),
            hostname: self.processor.hostname.clone(),
            id: event.id().to_string(),
            aws: self.aws.clone(),
            attributes,
        })
    }
}

fn lift_attributes(message: &str) -> Map<String, Value> {
    if !message.trim_start().starts_with('{') {
        return Map::new();
    }
    match serde_json::from_str::<Map<String, Value>>(message) {
        Ok(mut attributes) => {
            attributes.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
            attributes
        }
        Err(_) => Map::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::processing_rule::Kind;
    use serde_json::json;
    use tracing_test::traced_test;

    fn metadata() -> SourceMetadata {
        SourceMetadata {
            owner: "123456789012".to_string(),
            log_group: "/poc/dd-log".to_string(),
            log_stream: "stream-1".to_string(),
            subscription_filters: vec!["datadog".to_string()],
        }
    }

    fn context() -> InvocationContext {
        InvocationContext {
            request_id: "req-1".to_string(),
            invoked_function_arn: Some(
                "arn:aws:lambda:us-east-1:123456789012:function:forwarder".to_string(),
            ),
        }
    }

    fn rule(kind: Kind, pattern: &str, placeholder: Option<&str>) -> ProcessingRule {
        ProcessingRule {
            kind,
            name: "test".to_string(),
            pattern: pattern.to_string(),
            replace_placeholder: placeholder.map(str::to_string),
        }
    }

    fn processor_with_rules(rules: Vec<ProcessingRule>) -> LogsProcessor {
        LogsProcessor::new(&Config {
            processing_rules: Some(rules),
            ..Default::default()
        })
    }

    #[test]
    fn test_enrichment() {
        let config = Config {
            tags: vec!["env:prod".to_string()],
            hostname: Some("host-a".to_string()),
            ..Default::default()
        };
        let processor = LogsProcessor::new(&config);
        let bound = processor.for_invocation(&metadata(), &context());

        let log = bound
            .process(&LogEvent::new("42", 1_700_000_000_000, "hello"))
            .unwrap();

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "hello",
                "timestamp": 1_700_000_000_000_i64,
                "ddsource": "cloudwatch",
                "ddtags": "env:prod,log_group:/poc/dd-log,log_stream:stream-1,region:us-east-1",
                "service": "cloudwatch-logs",
                "hostname": "host-a",
                "id": "42",
                "aws": {
                    "awslogs": {
                        "logGroup": "/poc/dd-log",
                        "logStream": "stream-1",
                        "owner": "123456789012"
                    },
                    "invoked_function_arn": "arn:aws:lambda:us-east-1:123456789012:function:forwarder"
                }
            })
        );
    }

    #[test]
    fn test_region_tag_omitted_without_arn() {
        let processor = LogsProcessor::new(&Config::default());
        let context = InvocationContext {
            request_id: "req-1".to_string(),
            invoked_function_arn: None,
        };
        let log = processor
            .for_invocation(&metadata(), &context)
            .process(&LogEvent::new("1", 1, "x"))
            .unwrap();
        assert_eq!(log.ddtags, "log_group:/poc/dd-log,log_stream:stream-1");
        assert!(log.hostname.is_none());
    }

    #[test]
    fn test_json_message_attributes_never_override_reserved_keys() {
        let processor = LogsProcessor::new(&Config::default());
        let bound = processor.for_invocation(&metadata(), &context());
        let message = r#"{"level":"error","service":"spoofed","request":{"path":"/"}}"#;

        let log = bound.process(&LogEvent::new("7", 5, message)).unwrap();

        assert_eq!(log.message, message);
        assert_eq!(log.service, "cloudwatch-logs");
        assert_eq!(log.attributes.get("level"), Some(&json!("error")));
        assert_eq!(log.attributes.get("request"), Some(&json!({"path": "/"})));
        assert!(!log.attributes.contains_key("service"));

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["service"], json!("cloudwatch-logs"));
        assert_eq!(value["level"], json!("error"));
    }

    #[test]
    fn test_non_object_messages_have_no_attributes() {
        let processor = LogsProcessor::new(&Config::default());
        let bound = processor.for_invocation(&metadata(), &context());
        for message in ["plain text", "[1,2,3]", "{not json", "\"quoted\""] {
            let log = bound.process(&LogEvent::new("1", 1, message)).unwrap();
            assert!(log.attributes.is_empty(), "{message}");
        }
    }

    #[test]
    fn test_exclude_rule() {
        let processor = processor_with_rules(vec![rule(Kind::ExcludeAtMatch, "GET /health", None)]);
        let bound = processor.for_invocation(&metadata(), &context());
        assert!(bound.process(&LogEvent::new("1", 1, "GET /health 200")).is_none());
        assert!(bound.process(&LogEvent::new("2", 1, "GET /orders 200")).is_some());
    }

    #[test]
    fn test_include_rule() {
        let processor = processor_with_rules(vec![rule(Kind::IncludeAtMatch, "ERROR|FATAL", None)]);
        let bound = processor.for_invocation(&metadata(), &context());
        assert!(bound.process(&LogEvent::new("1", 1, "INFO ok")).is_none());
        assert!(bound.process(&LogEvent::new("2", 1, "ERROR boom")).is_some());
    }

    #[test]
    fn test_mask_rule_changes_outgoing_message_only() {
        let processor = processor_with_rules(vec![rule(
            Kind::MaskSequences,
            r"\d{4}-\d{4}-\d{4}-\d{4}",
            Some("[CARD]"),
        )]);
        let bound = processor.for_invocation(&metadata(), &context());
        let event = LogEvent::new("1", 1, "paid with 1234-5678-9012-3456");

        let log = bound.process(&event).unwrap();

        assert_eq!(log.message, "paid with [CARD]");
        assert_eq!(event.message(), "paid with 1234-5678-9012-3456");
    }

    #[test]
    #[traced_test]
    fn test_invalid_regex_is_skipped() {
        let processor = processor_with_rules(vec![
            rule(Kind::ExcludeAtMatch, "(unclosed", None),
            rule(Kind::ExcludeAtMatch, "drop me", None),
        ]);
        assert_eq!(processor.rules.as_ref().unwrap().len(), 1);
        assert!(logs_contain("Failed to compile processing rule 'test'"));
        let bound = processor.for_invocation(&metadata(), &context());
        assert!(bound.process(&LogEvent::new("1", 1, "please drop me")).is_none());
        assert!(bound.process(&LogEvent::new("2", 1, "(unclosed")).is_some());
    }
}
