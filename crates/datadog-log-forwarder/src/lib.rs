// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards CloudWatch Logs subscription events to the Datadog logs intake.
//!
//! The crate is organised leaf-first:
//!
//! - [`secrets`]: the API key cache and the stores it reads from
//! - [`logs`]: envelope decoding, record enrichment, batching and delivery
//! - [`health`]: dependency probe answering `{"healthCheck": true}`
//! - [`router`]: the per-invocation entry point used by the Lambda binary

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod logger;
pub mod logs;
pub mod retry;
pub mod router;
pub mod secrets;

pub const FORWARDER_VERSION: &str = env!("CARGO_PKG_VERSION");
