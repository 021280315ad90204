//! Environment-derived configuration, captured once at startup.

use std::env;

/// Environment variable carrying the verbosity spec.
pub const TRACE_ENV: &str = "TRACE";

/// Environment variable carrying the trace destination: a file path, or (in
/// a worker spawned by the wrapper) a decimal file-descriptor number.
pub const TRACEFILE_ENV: &str = "TRACEFILE";

/// Spec key for the wrapper's own diagnostics. Stripped from the worker's
/// environment because the wrapper has already acted on it.
pub const DRIVER_MODULE: &str = "DRIVER";

/// Snapshot of the tracing-related environment.
///
/// Built from the real environment via [`TraceConfig::from_env`], or filled
/// in directly by tests so several configurations can coexist in one process.
#[derive(Debug, Clone, Default)]
pub struct TraceConfig {
    /// Raw verbosity spec (`TRACE`). `None` means no tracing configured.
    pub spec: Option<String>,
    /// Trace destination (`TRACEFILE`). `None` means standard error.
    pub dest: Option<String>,
}

impl TraceConfig {
    pub fn from_env() -> Self {
        Self {
            spec: env::var(TRACE_ENV).ok(),
            dest: env::var(TRACEFILE_ENV).ok(),
        }
    }
}
