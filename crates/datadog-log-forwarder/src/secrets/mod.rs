// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide cache for the Datadog API key.
//!
//! The cache lives for the whole execution environment, so warm invocations
//! reuse the key instead of calling the secret store every time. One mutex
//! guards the slot and is held across a retrieval: concurrent callers queue
//! behind the in-flight fetch and then read its result. The slot is only
//! assigned after a fetch completes, so a cancelled invocation leaves the
//! previous value untouched.

pub mod aws;
pub mod store;

use crate::error::ForwarderError;
use crate::retry::RetryPolicy;
use crate::secrets::store::{SecretStore, StoreError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// The API key together with the moment it was fetched.
#[derive(Clone)]
pub struct Secret {
    value: Arc<str>,
    acquired_at: Instant,
    ttl: Duration,
    generation: u64,
}

impl Secret {
    fn new(value: String, ttl: Duration, generation: u64) -> Self {
        Secret {
            value: Arc::from(value),
            acquired_at: Instant::now(),
            ttl,
            generation,
        }
    }

    /// The raw key. Only for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.acquired_at.elapsed() >= self.ttl
    }

    #[must_use]
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Increments on every successful retrieval.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<redacted>)")
    }
}

#[derive(Default)]
struct Slot {
    current: Option<Secret>,
    generation: u64,
}

pub struct SecretCache {
    store: Arc<dyn SecretStore>,
    ttl: Duration,
    retry_policy: RetryPolicy,
    fetch_timeout: Duration,
    slot: Mutex<Slot>,
    fetches: AtomicU64,
}

impl fmt::Debug for SecretCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCache")
            .field("store", &self.store.describe())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SecretCache {
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>, ttl: Duration) -> Self {
        SecretCache {
            store,
            ttl,
            retry_policy: RetryPolicy::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            slot: Mutex::new(Slot::default()),
            fetches: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Timeout applied to each individual store call.
    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Number of calls made to the underlying store, retries included.
    #[must_use]
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Returns a valid key, fetching a new one when the cached key is missing
    /// or expired.
    pub async fn get(&self) -> Result<Secret, ForwarderError> {
        let mut slot = self.slot.lock().await;
        if let Some(secret) = slot.current.as_ref().filter(|secret| !secret.is_expired()) {
            return Ok(secret.clone());
        }

        match self.fetch().await {
            Ok(value) => Ok(Self::install(&mut slot, value, self.ttl)),
            Err(e) => {
                slot.current = None;
                error!(
                    "SECRETS | Failed to retrieve API key from {}: {e}",
                    self.store.describe()
                );
                Err(ForwarderError::SecretUnavailable(e.to_string()))
            }
        }
    }

    /// Forces a new retrieval after `stale` was refused by the intake.
    ///
    /// If another caller already replaced `stale`, the newer key is returned
    /// without fetching again. When the fetch fails, a key that is still
    /// within its TTL stays cached.
    pub async fn refresh(&self, stale: &Secret) -> Result<Secret, ForwarderError> {
        let mut slot = self.slot.lock().await;
        if let Some(current) = slot.current.as_ref() {
            if current.generation != stale.generation && !current.is_expired() {
                debug!("SECRETS | API key already refreshed by a concurrent caller");
                return Ok(current.clone());
            }
        }

        match self.fetch().await {
            Ok(value) => Ok(Self::install(&mut slot, value, self.ttl)),
            Err(e) => {
                if slot.current.as_ref().is_some_and(Secret::is_expired) {
                    slot.current = None;
                }
                warn!(
                    "SECRETS | Failed to refresh API key from {}: {e}",
                    self.store.describe()
                );
                Err(ForwarderError::SecretUnavailable(e.to_string()))
            }
        }
    }

    fn install(slot: &mut Slot, value: String, ttl: Duration) -> Secret {
        slot.generation += 1;
        let secret = Secret::new(value, ttl, slot.generation);
        slot.current = Some(secret.clone());
        debug!("SECRETS | Cached API key (generation {})", secret.generation);
        secret
    }

    async fn fetch(&self) -> Result<String, StoreError> {
        self.retry_policy
            .retry(
                "SECRETS | fetch",
                |_| async move {
                    self.fetches.fetch_add(1, Ordering::Relaxed);
                    match tokio::time::timeout(self.fetch_timeout, self.store.fetch()).await {
                        Ok(result) => result,
                        Err(_) => Err(StoreError::Timeout(self.fetch_timeout)),
                    }
                },
                StoreError::is_transient,
            )
            .await
    }
}
