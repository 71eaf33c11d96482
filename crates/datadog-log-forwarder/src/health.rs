// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Dependency report returned for `{"healthCheck": true}` invocations.
//!
//! ```json
//! {
//!   "healthy": false,
//!   "checks": {
//!     "datadog_api": {"status": "ok"},
//!     "secrets_manager": {"status": "error", "detail": "SecretUnavailable: access denied: ..."}
//!   }
//! }
//! ```

use crate::error::ForwarderError;
use crate::logs::client::{DatadogClient, ProbeOutcome};
use crate::secrets::{Secret, SecretCache};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub const SECRETS_MANAGER: &str = "secrets_manager";
pub const DATADOG_API: &str = "datadog_api";

/// One key lookup shared by both probes of a check.
type SecretResult = OnceCell<Result<Secret, ForwarderError>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckStatus {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckStatus {
    #[must_use]
    pub fn ok() -> Self {
        CheckStatus {
            status: Status::Ok,
            detail: None,
        }
    }

    #[must_use]
    pub fn ok_with_detail(detail: &str) -> Self {
        CheckStatus {
            status: Status::Ok,
            detail: Some(detail.to_string()),
        }
    }

    #[must_use]
    pub fn error(error: &ForwarderError) -> Self {
        CheckStatus {
            status: Status::Error,
            detail: Some(error.to_string()),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// `healthy` is derived from `checks` and cannot be set independently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    healthy: bool,
    checks: BTreeMap<String, CheckStatus>,
}

impl HealthReport {
    #[must_use]
    pub fn new(checks: BTreeMap<String, CheckStatus>) -> Self {
        let healthy = checks.values().all(CheckStatus::is_ok);
        HealthReport { healthy, checks }
    }

    #[must_use]
    pub fn healthy(&self) -> bool {
        self.healthy
    }

    #[must_use]
    pub fn check(&self, name: &str) -> Option<&CheckStatus> {
        self.checks.get(name)
    }

    #[must_use]
    pub fn checks(&self) -> &BTreeMap<String, CheckStatus> {
        &self.checks
    }
}

#[derive(Debug)]
pub struct HealthChecker {
    secrets: Arc<SecretCache>,
    client: Arc<DatadogClient>,
}

impl HealthChecker {
    #[must_use]
    pub fn new(secrets: Arc<SecretCache>, client: Arc<DatadogClient>) -> Self {
        HealthChecker { secrets, client }
    }

    /// Probes both dependencies concurrently. Never fails.
    pub async fn check(&self) -> HealthReport {
        let secret = OnceCell::new();
        let (secrets_manager, datadog_api) = tokio::join!(
            self.check_secrets(&secret),
            self.check_datadog(&secret)
        );

        let report = HealthReport::new(BTreeMap::from([
            (SECRETS_MANAGER.to_string(), secrets_manager),
            (DATADOG_API.to_string(), datadog_api),
        ]));
        if report.healthy() {
            debug!("HEALTH | All dependencies healthy");
        } else {
            warn!("HEALTH | Unhealthy dependencies: {:?}", report.checks());
        }
        report
    }

    async fn secret<'a>(&self, cell: &'a SecretResult) -> &'a Result<Secret, ForwarderError> {
        cell.get_or_init(|| self.secrets.get()).await
    }

    async fn check_secrets(&self, cell: &SecretResult) -> CheckStatus {
        match self.secret(cell).await {
            Ok(_) => CheckStatus::ok(),
            Err(e) => CheckStatus::error(e),
        }
    }

    /// Uses the key when one can be obtained, otherwise falls back to a
    /// reachability check so a secret store outage is not reported twice.
    async fn check_datadog(&self, cell: &SecretResult) -> CheckStatus {
        let secret = self.secret(cell).await.as_ref().ok();
        match self.client.probe(secret).await {
            Ok(ProbeOutcome::Authenticated) => CheckStatus::ok(),
            Ok(ProbeOutcome::Reachable) => {
                CheckStatus::ok_with_detail("reachable; credential not verified")
            }
            Err(e) => CheckStatus::error(&e),
        }
    }
}
