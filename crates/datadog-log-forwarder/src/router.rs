// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Entry point for every invocation: decides between a health check and a
//! forward, and wires the shared components together.

use crate::config::Config;
use crate::error::ForwarderError;
use crate::health::{HealthChecker, HealthReport};
use crate::http::get_client;
use crate::logs::client::DatadogClient;
use crate::logs::decoder::SubscriptionEnvelope;
use crate::logs::pipeline::{ForwardSummary, ForwardingPipeline};
use crate::logs::processor::LogsProcessor;
use crate::logs::InvocationContext;
use crate::secrets::store::SecretStore;
use crate::secrets::SecretCache;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument};

const HEALTH_CHECK_FIELD: &str = "healthCheck";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    HealthCheck,
    Forward(SubscriptionEnvelope),
}

impl Invocation {
    /// Classifies a raw payload. A truthy `healthCheck` wins over anything
    /// else; otherwise the payload must be `{"awslogs": {"data": "..."}}`.
    pub fn from_payload(payload: &Value) -> Result<Self, ForwarderError> {
        let Value::Object(fields) = payload else {
            return Err(ForwarderError::InvalidPayload(
                "invocation payload must be a JSON object".to_string(),
            ));
        };

        if fields.get(HEALTH_CHECK_FIELD).is_some_and(is_truthy) {
            return Ok(Invocation::HealthCheck);
        }

        let awslogs = fields.get("awslogs").ok_or_else(|| {
            ForwarderError::InvalidPayload(
                "expected a healthCheck flag or an awslogs subscription envelope".to_string(),
            )
        })?;
        let data = awslogs
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ForwarderError::InvalidPayload("awslogs.data must be a string".to_string())
            })?;

        Ok(Invocation::Forward(SubscriptionEnvelope::new(data)))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvocationResponse {
    Health(HealthReport),
    Forwarded(ForwardSummary),
}

impl InvocationResponse {
    /// 200 for health checks and complete forwards; the intake's status when
    /// a batch was rejected.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            InvocationResponse::Health(_) => 200,
            InvocationResponse::Forwarded(summary) => match summary.failed {
                None => 200,
                Some(_) => summary.status.unwrap_or(400),
            },
        }
    }

    #[must_use]
    pub fn into_lambda_response(self) -> LambdaResponse {
        let status_code = self.status_code();
        match serde_json::to_string(&self) {
            Ok(body) => LambdaResponse { status_code, body },
            Err(e) => {
                error!("Failed to serialize invocation response: {e}");
                LambdaResponse {
                    status_code: 500,
                    body: json!({ "error": e.to_string() }).to_string(),
                }
            }
        }
    }
}

/// What the function returns to its caller: the report or summary as a JSON
/// string in `body`.
///
/// ```json
/// {"statusCode": 200, "body": "{\"healthy\":true,\"checks\":{...}}"}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LambdaResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug)]
pub struct Forwarder {
    health: HealthChecker,
    pipeline: ForwardingPipeline,
}

impl Forwarder {
    /// Builds the shared components. Call once per execution environment so
    /// the API key cache and HTTP connections survive across invocations.
    #[must_use]
    pub fn new(config: &Config, store: Arc<dyn SecretStore>) -> Self {
        let secrets = Arc::new(
            SecretCache::new(store, config.secret_ttl())
                .with_retry_policy(config.retry_policy())
                .with_fetch_timeout(config.flush_timeout()),
        );
        let client = Arc::new(DatadogClient::new(
            config,
            get_client(config),
            Arc::clone(&secrets),
        ));

        Forwarder {
            health: HealthChecker::new(Arc::clone(&secrets), Arc::clone(&client)),
            pipeline: ForwardingPipeline::new(
                secrets,
                client,
                LogsProcessor::new(config),
                config.batch_limits(),
            ),
        }
    }

    /// Handles one invocation and wraps the result for the Lambda caller.
    pub async fn invoke(
        &self,
        payload: &Value,
        context: &InvocationContext,
    ) -> Result<LambdaResponse, ForwarderError> {
        self.handle(payload, context)
            .await
            .map(InvocationResponse::into_lambda_response)
    }

    /// Handles one invocation. Health checks always succeed. A forward that
    /// stops part-way is returned as [`ForwarderError::Forward`] so the
    /// runtime marks the invocation as failed and CloudWatch redelivers it,
    /// except when the intake rejected a batch: that summary is returned
    /// with its failure recorded.
    #[instrument(name = "invocation", skip_all, fields(request_id = %context.request_id))]
    pub async fn handle(
        &self,
        payload: &Value,
        context: &InvocationContext,
    ) -> Result<InvocationResponse, ForwarderError> {
        match Invocation::from_payload(payload)? {
            Invocation::HealthCheck => {
                info!("HEALTH | Running health check");
                Ok(InvocationResponse::Health(self.health.check().await))
            }
            Invocation::Forward(envelope) => {
                let summary = self.pipeline.forward(&envelope, context).await?;
                match summary.failed {
                    Some(kind) if kind.fails_invocation() => Err(ForwarderError::Forward {
                        kind,
                        batches_sent: summary.batches_sent,
                        records_sent: summary.records_sent,
                        message: summary.message.unwrap_or_else(|| kind.to_string()),
                    }),
                    _ => Ok(InvocationResponse::Forwarded(summary)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use duplicate::duplicate_item;

    #[duplicate_item(
        test_name                       payload;
        [test_health_check_true]        [json!({"healthCheck": true})];
        [test_health_check_number]      [json!({"healthCheck": 1})];
        [test_health_check_string]      [json!({"healthCheck": "yes"})];
        [test_health_check_wins]        [json!({"healthCheck": true, "awslogs": {"data": "H4sI"}})];
    )]
    #[test]
    fn test_name() {
        assert_eq!(
            Invocation::from_payload(&payload).unwrap(),
            Invocation::HealthCheck
        );
    }

    #[duplicate_item(
        test_name                       payload;
        [test_health_check_false]       [json!({"healthCheck": false, "awslogs": {"data": "H4sI"}})];
        [test_health_check_zero]        [json!({"healthCheck": 0, "awslogs": {"data": "H4sI"}})];
        [test_health_check_empty]       [json!({"healthCheck": "", "awslogs": {"data": "H4sI"}})];
        [test_health_check_null]        [json!({"healthCheck": null, "awslogs": {"data": "H4sI"}})];
    )]
    #[test]
    fn test_name() {
        assert_eq!(
            Invocation::from_payload(&payload).unwrap(),
            Invocation::Forward(SubscriptionEnvelope::new("H4sI"))
        );
    }

    #[test]
    fn test_health_response_is_wrapped_with_status_200() {
        let report = HealthReport::new(std::collections::BTreeMap::new());
        let response = InvocationResponse::Health(report).into_lambda_response();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"healthy":true,"checks":{}}"#);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"statusCode": 200, "body": r#"{"healthy":true,"checks":{}}"#})
        );
    }

    #[test]
    fn test_rejected_forward_carries_intake_status() {
        let summary = ForwardSummary {
            batches_sent: 1,
            records_sent: 2,
            failed: Some(ErrorKind::Rejected),
            message: Some("Rejected: HTTP 413: too large".to_string()),
            status: Some(413),
            ..Default::default()
        };
        let response = InvocationResponse::Forwarded(summary).into_lambda_response();
        assert_eq!(response.status_code, 413);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["failed"], "Rejected");
        assert_eq!(body["batches_sent"], 1);
    }

    #[duplicate_item(
        test_name                       payload;
        [test_invalid_not_object]       [json!([1, 2, 3])];
        [test_invalid_empty_object]     [json!({})];
        [test_invalid_falsy_health]     [json!({"healthCheck": false})];
        [test_invalid_missing_data]     [json!({"awslogs": {}})];
        [test_invalid_data_not_string]  [json!({"awslogs": {"data": 42}})];
    )]
    #[test]
    fn test_name() {
        let err = Invocation::from_payload(&payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }
}
