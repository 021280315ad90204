//! Explicit context object replacing process-wide tracing globals.
//!
//! One [`TraceContext`] is built at startup and threaded through every call
//! that needs tracing or capture behavior. Cloning is cheap (shared inner
//! state), which is what lets the `tracing` writer hold one while the rest of
//! the wrapper holds another. Tests construct as many independent contexts
//! as they like.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};

use crate::capture::CaptureShared;
use crate::config::{DRIVER_MODULE, TraceConfig};
use crate::sink::TraceSink;
use crate::spec::TraceSpec;

#[derive(Clone)]
pub struct TraceContext {
    inner: Arc<Inner>,
}

struct Inner {
    config: TraceConfig,
    /// Memoized parse of the verbosity spec. Only a successful parse is
    /// cached; a malformed spec fails on every access.
    spec: Mutex<Option<Arc<TraceSpec>>>,
    /// Resolve-once sink. The first successful resolution wins; the
    /// configured destination is never re-checked afterwards.
    sink: Mutex<Option<Arc<TraceSink>>>,
    /// Active capture session, if any, shared with the writer tee.
    capture: Mutex<Option<CaptureShared>>,
}

impl TraceContext {
    pub fn new(config: TraceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                spec: Mutex::new(None),
                sink: Mutex::new(None),
                capture: Mutex::new(None),
            }),
        }
    }

    pub fn from_env() -> Self {
        Self::new(TraceConfig::from_env())
    }

    pub fn config(&self) -> &TraceConfig {
        &self.inner.config
    }

    /// The parsed verbosity spec. An unset `TRACE` resolves to an empty spec;
    /// a malformed one is fatal.
    pub fn spec(&self) -> Result<Arc<TraceSpec>> {
        let mut slot = lock(&self.inner.spec);
        if let Some(spec) = &*slot {
            return Ok(spec.clone());
        }
        let raw = self.inner.config.spec.as_deref().unwrap_or("");
        let spec = Arc::new(TraceSpec::parse(raw).context("parse TRACE spec")?);
        *slot = Some(spec.clone());
        Ok(spec)
    }

    /// Effective level for the wrapper's own diagnostics.
    pub fn driver_level(&self) -> Result<u32> {
        Ok(self.spec()?.effective_level(DRIVER_MODULE))
    }

    /// The resolved trace sink, opening the configured destination on first
    /// access. Opening (and truncating) the file happens exactly once per
    /// context.
    pub fn sink(&self) -> Result<Arc<TraceSink>> {
        let mut slot = lock(&self.inner.sink);
        if let Some(sink) = &*slot {
            return Ok(sink.clone());
        }
        let sink = Arc::new(TraceSink::resolve(&self.inner.config)?);
        *slot = Some(sink.clone());
        Ok(sink)
    }

    /// Flush the sink so a concurrent reader sees everything written so far.
    pub fn flush(&self) -> Result<()> {
        self.sink()?.flush().context("flush trace sink")?;
        Ok(())
    }

    pub(crate) fn capture_slot(&self) -> MutexGuard<'_, Option<CaptureShared>> {
        lock(&self.inner.capture)
    }
}

/// Capture transitions are assumed externally serialized (single-threaded
/// lifecycle); a poisoned lock only means a writer panicked mid-write, and
/// the slot itself is still coherent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::*;
    use crate::config::TraceConfig;

    #[test]
    fn spec_is_parsed_once_and_shared() {
        let ctx = TraceContext::new(TraceConfig {
            spec: Some("DRIVER:2,OPT:1".to_string()),
            dest: None,
        });
        let first = ctx.spec().expect("spec");
        let second = ctx.spec().expect("spec");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.driver_level().expect("level"), 2);
    }

    #[test]
    fn missing_spec_resolves_to_empty() {
        let ctx = TraceContext::new(TraceConfig::default());
        assert!(ctx.spec().expect("spec").is_empty());
        assert_eq!(ctx.driver_level().expect("level"), 0);
    }

    #[test]
    fn malformed_spec_is_fatal() {
        let ctx = TraceContext::new(TraceConfig {
            spec: Some("DRIVER:x".to_string()),
            dest: None,
        });
        assert!(ctx.spec().is_err());
    }

    #[test]
    fn sink_resolves_once_per_context() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("trace.log");
        let ctx = TraceContext::new(TraceConfig {
            spec: None,
            dest: Some(path.to_str().expect("utf8").to_string()),
        });

        let first = ctx.sink().expect("sink");
        // Scribble on the file; a second access must not re-open (truncate).
        fs::write(&path, "kept").expect("write");
        let second = ctx.sink().expect("sink");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs::read(&path).expect("read"), b"kept");
    }
}
