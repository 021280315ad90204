//! Archive capture: a scoped secondary log destination, exportable at any
//! point as a compressed snapshot.
//!
//! Starting a session tees everything routed through the context's writer
//! into a private temp file. [`TraceContext::export_capture`] compresses a
//! point-in-time copy of that file to a caller-chosen path; the session keeps
//! accumulating, so later exports supersede earlier ones. The
//! [`CaptureSession`] handle owns cleanup: when it leaves scope, by any path,
//! the temp file is closed and deleted.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tempfile::{Builder, TempPath};
use tracing::debug;

use crate::context::TraceContext;

/// High-ratio zstd level for exported archives. Exports are rare and
/// post-hoc, so ratio wins over speed.
const ARCHIVE_LEVEL: i32 = 19;

/// Shared half of an active session, visible to the writer tee.
#[derive(Debug, Clone)]
pub(crate) struct CaptureShared {
    pub(crate) file: Arc<File>,
    pub(crate) path: PathBuf,
}

impl TraceContext {
    /// Start capturing all log output into a private temp file.
    ///
    /// # Panics
    ///
    /// Panics if a session is already active on this context. That is a
    /// wrapper bug, not a recoverable I/O condition.
    pub fn start_capture(&self) -> Result<CaptureSession> {
        let mut slot = self.capture_slot();
        assert!(
            slot.is_none(),
            "a capture session is already active on this context"
        );
        let temp = Builder::new()
            .prefix("tracelog-")
            .suffix(".log")
            .tempfile()
            .context("create capture temp file")?;
        let (file, temp_path) = temp.into_parts();
        debug!(path = %temp_path.display(), "capture session started");
        *slot = Some(CaptureShared {
            file: Arc::new(file),
            path: temp_path.to_path_buf(),
        });
        drop(slot);
        Ok(CaptureSession {
            ctx: self.clone(),
            temp: Some(temp_path),
        })
    }

    /// The active session's writer, or `None` when no capture is running.
    pub fn capture_writer(&self) -> Option<Arc<File>> {
        self.capture_slot().as_ref().map(|shared| shared.file.clone())
    }

    /// Compress a point-in-time copy of the captured output into `dest`.
    ///
    /// Returns `Ok(false)` when no session is active (nothing to do). The
    /// capture file is first copied aside so compression never reads a file
    /// that is still being appended to, then the copy is removed.
    pub fn export_capture(&self, dest: &Path) -> Result<bool> {
        let Some(shared) = self.capture_slot().clone() else {
            return Ok(false);
        };
        (&*shared.file)
            .flush()
            .context("flush capture file")?;

        let snapshot = Builder::new()
            .prefix("tracelog-")
            .suffix(".log.bak")
            .tempfile()
            .context("create capture snapshot")?;
        fs::copy(&shared.path, snapshot.path())
            .with_context(|| format!("snapshot capture file {}", shared.path.display()))?;

        let input = File::open(snapshot.path()).context("open capture snapshot")?;
        let output = File::create(dest)
            .with_context(|| format!("create archive {}", dest.display()))?;
        zstd::stream::copy_encode(input, output, ARCHIVE_LEVEL)
            .with_context(|| format!("compress archive {}", dest.display()))?;
        debug!(dest = %dest.display(), "capture exported");
        // `snapshot` is removed when it drops here.
        Ok(true)
    }
}

/// RAII handle for one capture session.
pub struct CaptureSession {
    ctx: TraceContext,
    temp: Option<TempPath>,
}

impl CaptureSession {
    /// Path of the temp capture file while the session is open.
    pub fn path(&self) -> Option<&Path> {
        self.temp.as_deref()
    }

    /// Detach the tee, close the handle, and delete the temp file.
    /// Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if let Some(temp) = self.temp.take() {
            *self.ctx.capture_slot() = None;
            // TempPath removes the file on drop.
            drop(temp);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}
