// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{debug, error, info};

use datadog_log_forwarder::{
    config::{self, Config},
    logger,
    logs::InvocationContext,
    router::{Forwarder, LambdaResponse},
    secrets::{
        aws::AwsSecretsManagerStore,
        store::{SecretStore, StaticSecretStore},
    },
    FORWARDER_VERSION,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    if let Err(e) = logger::init(config::log_level_from_env()) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!("Logging subsystem enabled");

    let config = Config::from_env().map_err(|e| {
        error!("{e}");
        e
    })?;
    info!(
        "Starting Datadog log forwarder {FORWARDER_VERSION} for site {}",
        config.site
    );

    let store: Arc<dyn SecretStore> = match (&config.api_key, &config.api_key_secret_arn) {
        (Some(api_key), _) => {
            info!("SECRETS | Using API key from DD_API_KEY");
            Arc::new(StaticSecretStore::new(api_key))
        }
        (None, Some(secret_id)) => {
            info!("SECRETS | Using API key from Secrets Manager secret {secret_id}");
            Arc::new(AwsSecretsManagerStore::from_env(secret_id).await)
        }
        (None, None) => {
            error!("No API key source configured");
            return Err("one of DD_API_KEY or DD_API_KEY_SECRET_ARN must be set".into());
        }
    };

    let forwarder = Forwarder::new(&config, store);
    let forwarder = &forwarder;

    run(service_fn(move |event: LambdaEvent<Value>| async move {
        let (payload, lambda_context) = event.into_parts();
        let context = InvocationContext {
            request_id: lambda_context.request_id,
            invoked_function_arn: Some(lambda_context.invoked_function_arn)
                .filter(|arn| !arn.is_empty()),
        };

        let response: LambdaResponse = forwarder.invoke(&payload, &context).await?;
        Ok::<LambdaResponse, Error>(response)
    }))
    .await
}
