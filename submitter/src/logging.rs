//! Tracing setup and the in-memory execution log.
//!
//! # Separation of Concerns
//!
//! - **stderr layer**: operator diagnostics, filtered by `RUST_LOG`.
//! - **[`LogSink`] layer**: the execution log embedded in every submission.
//!   Captures this crate's INFO+ events regardless of `RUST_LOG`.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Append-only execution log shared between the tracing layer and the pipeline.
///
/// Created once per process run. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    buffer: Arc<Mutex<String>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line directly, bypassing tracing.
    pub fn record(&self, line: &str) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push_str(line);
        if !line.ends_with('\n') {
            buffer.push('\n');
        }
    }

    /// Copy of everything logged so far.
    pub fn snapshot(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Writer handed out to the fmt layer for each event.
pub struct LogSinkWriter {
    buffer: Arc<Mutex<String>>,
}

impl io::Write for LogSinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogSinkWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` for the stderr layer. Defaults to `info` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=submitter=debug submitter abc200 c --test
/// ```
pub fn init(sink: &LogSink) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let audit_filter = Targets::new().with_target(env!("CARGO_CRATE_NAME"), Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .compact()
                .with_filter(filter),
        )
        .with(
            fmt::layer()
                .with_writer(sink.clone())
                .with_ansi(false)
                .with_target(false)
                .with_filter(audit_filter),
        )
        .init();
}
