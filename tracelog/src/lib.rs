//! Tracing and log capture for the driver wrapper.
//!
//! The driver is a thin CLI wrapper around a native worker binary. This crate
//! owns the three pieces of that arrangement with real invariants:
//!
//! - **[`spec`]**: parses the `TRACE` verbosity spec (`module:level` pairs or
//!   a bare global level) and resolves effective per-module levels.
//! - **[`sink`] / [`child_env`]**: resolves the `TRACEFILE` destination once
//!   per process and hands it to the spawned worker as an already-open file
//!   descriptor, so both processes append through one shared write cursor
//!   instead of truncating or racing on the same path.
//! - **[`capture`]**: an optional scoped session that tees all log output
//!   into a private temp file, exportable at any point as a zstd archive.
//!
//! Everything hangs off an explicit [`TraceContext`] constructed once at
//! startup and threaded through calls; there is no process-global state, so
//! tests can run several contexts side by side. Process spawning itself and
//! log formatting live elsewhere; [`logging`] only wires the `tracing`
//! subscriber to the context's writer.

pub mod capture;
pub mod child_env;
pub mod config;
pub mod context;
pub mod logging;
pub mod sink;
pub mod spec;

pub use capture::CaptureSession;
pub use config::TraceConfig;
pub use context::TraceContext;
pub use spec::{ALL, TraceSpec};
