// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line formatting for the forwarder's own logs.
//!
//! Every line is prefixed with `DD_FORWARDER` so forwarder output can be told
//! apart from the records it ships:
//!
//! ```text
//! DD_FORWARDER | INFO | invocation{request_id=8f2c}: LOGS | Forwarded 1500 records in 2 batches from /aws/lambda/app
//! ```
//!
//! Timestamps are left out; CloudWatch adds its own.

use crate::config::log_level::LogLevel;
use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, DefaultFields, FormatEvent, FormatFields},
    FmtContext, FormattedFields, SubscriberBuilder,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "DD_FORWARDER | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Filter that silences the HTTP and TLS stacks below the forwarder.
#[must_use]
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(format!(
        "h2=off,hyper=off,rustls=off,{}",
        level.as_filter_directive()
    ))
}

/// Plain-text subscriber: CloudWatch stores escape codes verbatim.
fn builder(level: LogLevel) -> SubscriberBuilder<DefaultFields, Formatter, EnvFilter> {
    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .event_format(Formatter)
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    builder(level).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{info, info_span, warn};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(level: LogLevel, emit: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = builder(level)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        buffer.contents()
    }

    #[test]
    fn test_prefix_and_level() {
        let output = capture(LogLevel::Info, || info!("LOGS | forwarded"));
        assert_eq!(output, "DD_FORWARDER | INFO | LOGS | forwarded\n");
    }

    #[test]
    fn test_span_fields_are_included() {
        let output = capture(LogLevel::Info, || {
            let span = info_span!("invocation", request_id = "abc-123");
            let _guard = span.enter();
            warn!("slow intake");
        });
        assert_eq!(
            output,
            "DD_FORWARDER | WARN | invocation{request_id=\"abc-123\"}: slow intake\n"
        );
    }

    #[test]
    fn test_level_filtering() {
        let output = capture(LogLevel::Warn, || info!("hidden"));
        assert!(output.is_empty());
    }
}
