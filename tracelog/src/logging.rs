//! `tracing` wiring for the wrapper.
//!
//! # Separation of Concerns
//!
//! - **Subscriber setup (this module)**: one fmt layer whose writer routes
//!   through the [`TraceContext`], so the resolved sink and any active
//!   capture session both receive every event.
//!
//! - **Level policy (`spec`)**: `RUST_LOG` wins when set; otherwise the
//!   effective `DRIVER` level from `TRACE` picks the default filter.

use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::context::TraceContext;
use crate::sink::SinkHandle;

/// Install the global subscriber for this process.
///
/// Resolves the sink up front so open failures surface here rather than per
/// event, and a malformed `TRACE` spec is fatal as everywhere else.
pub fn init(ctx: &TraceContext) -> Result<()> {
    ctx.sink()?;
    let level = ctx.driver_level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(ContextWriter::new(ctx)).compact())
        .init();
    Ok(())
}

/// Map the wrapper's verbosity level onto a default filter directive.
fn default_directive(level: u32) -> &'static str {
    match level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `MakeWriter` handing out tee writers bound to the context's current state.
///
/// Each event gets a fresh writer, so a capture session started after
/// subscriber init still sees subsequent events.
#[derive(Clone)]
pub struct ContextWriter {
    ctx: TraceContext,
}

impl ContextWriter {
    pub fn new(ctx: &TraceContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl<'a> MakeWriter<'a> for ContextWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> TeeWriter {
        // `init` resolves the sink before events flow; an unresolved sink
        // here means direct construction in tests, where stderr will do.
        let sink = match self.ctx.sink() {
            Ok(sink) => sink.writer(),
            Err(_) => SinkHandle::Stderr,
        };
        TeeWriter {
            sink,
            capture: self.ctx.capture_writer(),
        }
    }
}

/// Writes every byte to the sink and, when a session is active, to the
/// capture file as well.
pub struct TeeWriter {
    sink: SinkHandle,
    capture: Option<Arc<File>>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write_all(buf)?;
        if let Some(capture) = &mut self.capture {
            capture.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()?;
        if let Some(capture) = &mut self.capture {
            capture.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::TraceConfig;

    #[test]
    fn directive_tracks_driver_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(3), "trace");
        assert_eq!(default_directive(42), "trace");
    }

    #[test]
    fn tee_writes_to_sink_and_capture() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink_path = temp.path().join("trace.log");
        let ctx = TraceContext::new(TraceConfig {
            spec: None,
            dest: Some(sink_path.to_str().expect("utf8").to_string()),
        });
        let session = ctx.start_capture().expect("start capture");

        let maker = ContextWriter::new(&ctx);
        let mut writer = maker.make_writer();
        writer.write_all(b"event line\n").expect("write");
        writer.flush().expect("flush");

        assert_eq!(fs::read(&sink_path).expect("sink"), b"event line\n");
        let capture_path = session.path().expect("capture path").to_path_buf();
        assert_eq!(fs::read(capture_path).expect("capture"), b"event line\n");
    }

    #[test]
    fn tee_skips_capture_when_inactive() {
        let temp = tempfile::tempdir().expect("tempdir");
        let sink_path = temp.path().join("trace.log");
        let ctx = TraceContext::new(TraceConfig {
            spec: None,
            dest: Some(sink_path.to_str().expect("utf8").to_string()),
        });

        let maker = ContextWriter::new(&ctx);
        let mut writer = maker.make_writer();
        writer.write_all(b"solo\n").expect("write");
        assert_eq!(fs::read(&sink_path).expect("sink"), b"solo\n");
    }
}
