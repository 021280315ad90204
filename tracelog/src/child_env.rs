//! Environment handoff for the spawned worker process.
//!
//! Two rewrites happen before spawning the worker, both on a copy of the
//! parent environment:
//!
//! 1. the wrapper's own `DRIVER` entry is stripped from `TRACE`, since the
//!    wrapper has already consumed it and the worker must not re-derive it;
//! 2. when trace output goes to a real file, `TRACEFILE` is replaced with
//!    the decimal number of the wrapper's already-open descriptor. The
//!    worker appends through that descriptor instead of re-opening the
//!    path, which would truncate the wrapper's output. (Having the worker
//!    open the path in append mode is no answer either: run standalone, the
//!    worker should still truncate.)
//!
//! Whoever spawns the worker must keep the descriptor inheritable; this
//! module only shapes the environment.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::config::{DRIVER_MODULE, TRACE_ENV, TRACEFILE_ENV};
use crate::context::TraceContext;
use crate::spec::TraceSpec;

/// Build the worker's environment from a copy of the parent's.
///
/// The parent map is never mutated. Resolves the sink if it has not been
/// resolved yet; a malformed `TRACE` value is fatal.
pub fn prepare(
    ctx: &TraceContext,
    parent_env: &HashMap<String, String>,
) -> Result<HashMap<String, String>> {
    let mut env = parent_env.clone();
    strip_driver_tag(&mut env)?;
    rewrite_trace_file(ctx, &mut env)?;
    Ok(env)
}

/// Remove the `DRIVER` entry from the embedded spec, leaving other modules
/// and the global default intact. No `TRACE` entry, or no `DRIVER` entry in
/// it, means nothing to strip.
fn strip_driver_tag(env: &mut HashMap<String, String>) -> Result<()> {
    let Some(raw) = env.get(TRACE_ENV) else {
        return Ok(());
    };
    let mut spec = TraceSpec::parse(raw).context("parse TRACE for worker handoff")?;
    spec.remove(DRIVER_MODULE);
    env.insert(TRACE_ENV.to_string(), spec.render());
    Ok(())
}

/// Point `TRACEFILE` at the wrapper's open descriptor when the sink is a
/// real file. A stderr sink needs no rewrite; the worker inherits it.
fn rewrite_trace_file(ctx: &TraceContext, env: &mut HashMap<String, String>) -> Result<()> {
    let sink = ctx.sink()?;
    if let Some(fd) = sink.shared_fd() {
        env.insert(TRACEFILE_ENV.to_string(), fd.to_string());
    }
    Ok(())
}
