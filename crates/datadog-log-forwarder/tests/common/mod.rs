// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the forwarder integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use datadog_log_forwarder::config::Config;
use datadog_log_forwarder::logs::InvocationContext;
use datadog_log_forwarder::secrets::store::{SecretStore, StoreError};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const LOG_GROUP: &str = "/poc/dd-log";
pub const LOG_STREAM: &str = "2024/01/01/[$LATEST]0123456789abcdef";
pub const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:dd-forwarder";

/// Secret store returning `key-<n>` on the n-th fetch, unless told to fail.
#[derive(Default)]
pub struct MockStore {
    calls: AtomicU64,
    failure: Mutex<Option<StoreError>>,
}

impl MockStore {
    pub fn failing(error: StoreError) -> Self {
        let store = MockStore::default();
        store.fail_with(error);
        store
    }

    pub fn fail_with(&self, error: StoreError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for MockStore {
    async fn fetch(&self) -> Result<String, StoreError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(format!("key-{n}"))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// Configuration pointing both the intake and the API at `server_url`, with
/// fast retries and no compression so bodies can be matched.
pub fn test_config(server_url: &str) -> Config {
    Config {
        api_key_secret_arn: Some("arn:aws:secretsmanager:us-east-1:123456789012:secret:dd".to_string()),
        logs_dd_url: server_url.to_string(),
        api_url: server_url.to_string(),
        flush_timeout: 2,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 5,
        use_compression: false,
        ..Default::default()
    }
}

pub fn context() -> InvocationContext {
    InvocationContext {
        request_id: "c6af9ac6-7b61-11e6-9a41-93e8deadbeef".to_string(),
        invoked_function_arn: Some(FUNCTION_ARN.to_string()),
    }
}

/// Builds a `{"awslogs": {"data": ...}}` invocation payload.
pub fn subscription_payload(messages: &[&str]) -> Value {
    let events: Vec<Value> = messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            json!({
                "id": format!("3759{i:04}"),
                "timestamp": 1_700_000_000_000_i64 + i as i64,
                "message": message,
            })
        })
        .collect();

    envelope_payload(&json!({
        "messageType": "DATA_MESSAGE",
        "owner": "123456789012",
        "logGroup": LOG_GROUP,
        "logStream": LOG_STREAM,
        "subscriptionFilters": ["datadog-forwarder"],
        "logEvents": events,
    }))
}

pub fn control_payload() -> Value {
    envelope_payload(&json!({
        "messageType": "CONTROL_MESSAGE",
        "owner": "CloudwatchLogs",
        "logGroup": "",
        "logStream": "",
        "subscriptionFilters": [],
        "logEvents": [{
            "id": "",
            "timestamp": 1_700_000_000_000_i64,
            "message": "CWL CONTROL MESSAGE: Checking health of destination Lambda."
        }],
    }))
}

pub fn envelope_payload(document: &Value) -> Value {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(document.to_string().as_bytes()).unwrap();
    let data = STANDARD.encode(encoder.finish().unwrap());
    json!({"awslogs": {"data": data}})
}
