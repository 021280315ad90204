//! End-to-end descriptor handoff: a parent context resolves a file sink,
//! prepares a worker environment, and a second context built from that
//! environment appends through the shared cursor instead of truncating.

use std::collections::HashMap;
use std::fs;
use std::io::Write;

use tracelog::config::{TRACE_ENV, TRACEFILE_ENV};
use tracelog::{TraceConfig, TraceContext, TraceSpec, child_env};

#[test]
fn worker_appends_through_the_parent_descriptor() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("trace.log");
    let path_str = path.to_str().expect("utf8").to_string();

    let parent_ctx = TraceContext::new(TraceConfig {
        spec: Some("DRIVER:2,OPT:1".to_string()),
        dest: Some(path_str.clone()),
    });
    let mut parent_writer = parent_ctx.sink().expect("sink").writer();
    parent_writer.write_all(b"wrapper: starting worker\n").expect("write");
    parent_ctx.flush().expect("flush");

    let mut parent_env = HashMap::new();
    parent_env.insert(TRACE_ENV.to_string(), "DRIVER:2,OPT:1".to_string());
    parent_env.insert(TRACEFILE_ENV.to_string(), path_str);
    let worker_env = child_env::prepare(&parent_ctx, &parent_env).expect("prepare");

    // The worker sees a descriptor number, not the path, and no DRIVER tag.
    let fd: i32 = worker_env[TRACEFILE_ENV].parse().expect("fd number");
    assert!(fd >= 0);
    let spec = TraceSpec::parse(&worker_env[TRACE_ENV]).expect("reparse");
    assert_eq!(spec.level("DRIVER"), None);
    assert_eq!(spec.level("OPT"), Some(1));

    // Stand in for the worker process: resolve a sink from the handoff env.
    let worker_ctx = TraceContext::new(TraceConfig {
        spec: worker_env.get(TRACE_ENV).cloned(),
        dest: worker_env.get(TRACEFILE_ENV).cloned(),
    });
    let mut worker_writer = worker_ctx.sink().expect("worker sink").writer();
    worker_writer.write_all(b"worker: optimizing\n").expect("write");
    worker_ctx.flush().expect("flush");

    // Both processes' output interleaves at the shared cursor; nothing was
    // truncated by the worker's resolve.
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "wrapper: starting worker\nworker: optimizing\n"
    );

    // In a real handoff each process holds its own copy of the descriptor.
    // Here both contexts wrap the same one, so leak the worker's view
    // instead of double-closing it.
    std::mem::forget(worker_ctx);
}
