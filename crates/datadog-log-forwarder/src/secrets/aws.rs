// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::secrets::store::{parse_secret_string, SecretStore, StoreError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client;
use std::fmt::Debug;
use tracing::debug;

/// API key stored in AWS Secrets Manager, addressed by name or ARN.
#[derive(Debug, Clone)]
pub struct AwsSecretsManagerStore {
    client: Client,
    secret_id: String,
}

impl AwsSecretsManagerStore {
    #[must_use]
    pub fn new(client: Client, secret_id: &str) -> Self {
        AwsSecretsManagerStore {
            client,
            secret_id: secret_id.to_string(),
        }
    }

    /// Builds a client from the Lambda execution environment (region and
    /// role credentials).
    pub async fn from_env(secret_id: &str) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        AwsSecretsManagerStore::new(Client::new(&sdk_config), secret_id)
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManagerStore {
    async fn fetch(&self) -> Result<String, StoreError> {
        debug!("SECRETS | Fetching API key from {}", self.secret_id);
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let secret_string = output.secret_string().ok_or_else(|| {
            StoreError::Malformed(format!(
                "secret '{}' has no string value",
                self.secret_id
            ))
        })?;
        parse_secret_string(secret_string)
    }

    fn describe(&self) -> String {
        format!("secretsmanager:{}", self.secret_id)
    }
}

fn classify_sdk_error<R: Debug>(err: &SdkError<GetSecretValueError, R>) -> StoreError {
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Unreachable(message)
        }
        SdkError::ServiceError(context) => {
            let service_err = context.err();
            if service_err.is_resource_not_found_exception() {
                StoreError::NotFound(message)
            } else if service_err.is_internal_service_error() {
                StoreError::Unreachable(message)
            } else if service_err.code() == Some("AccessDeniedException") {
                StoreError::AccessDenied(message)
            } else {
                StoreError::Rejected(message)
            }
        }
        _ => StoreError::Rejected(message),
    }
}
