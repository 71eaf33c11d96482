// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client shared by the intake sender and the health probe.
//!
//! Built once per process so connections to the intake stay pooled across
//! warm invocations.

use crate::config::Config;
use std::error::Error;
use std::time::Duration;
use tracing::error;

/// Builds the client, falling back to a direct connection when the proxy
/// configuration is unusable.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to parse proxy configuration: {e}, falling back to direct connection");
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!("Failed to build HTTP client: {inner}, using reqwest defaults");
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &Config, allow_proxy: bool) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(config.flush_timeout())
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.proxy_https {
            let proxy = reqwest::Proxy::https(https_uri.as_str())?;
            client = client.proxy(proxy);
        }
    }

    Ok(client.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_proxy() {
        let config = Config {
            proxy_https: Some("https://proxy.internal:3128".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config, true).is_ok());
    }

    #[test]
    fn test_client_without_proxy_ignores_proxy_setting() {
        let config = Config {
            proxy_https: Some("::not a url::".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config, false).is_ok());
        let _client = get_client(&config);
    }
}
