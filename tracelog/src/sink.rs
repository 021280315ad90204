//! The resolved trace destination: stderr, a fresh file, or a descriptor
//! inherited from a parent wrapper.
//!
//! A sink is resolved at most once per [`TraceContext`](crate::context::TraceContext)
//! and lives for the rest of the process. When `TRACEFILE` names a path the
//! file is truncated exactly once, here; the worker later appends through the
//! same descriptor (see [`child_env`](crate::child_env)) rather than opening
//! the path a second time.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::config::TraceConfig;

/// Where trace output goes for the life of the process.
#[derive(Debug)]
pub enum TraceSink {
    /// Nothing configured; alias the process stderr (never closed here).
    Stderr,
    /// A file opened (truncated) from a configured path.
    File { path: PathBuf, file: Arc<File> },
    /// An already-open descriptor handed down by a parent wrapper. Writes
    /// append through the shared cursor; the file is never truncated.
    Inherited { fd: RawFd, file: Arc<File> },
}

impl TraceSink {
    /// Resolve the destination from configuration.
    ///
    /// An integer `TRACEFILE` value is a descriptor inherited from a parent
    /// process; anything else is a path to truncate-and-write. A set-but-empty
    /// value means the same as an unset one: stderr.
    pub fn resolve(config: &TraceConfig) -> Result<Self> {
        let Some(dest) = config.dest.as_deref().filter(|dest| !dest.is_empty()) else {
            return Ok(Self::Stderr);
        };
        if let Ok(fd) = dest.parse::<RawFd>() {
            let file = adopt_descriptor(fd)?;
            return Ok(Self::Inherited {
                fd,
                file: Arc::new(file),
            });
        }
        let path = PathBuf::from(dest);
        let file = File::create(&path)
            .with_context(|| format!("open trace file {}", path.display()))?;
        // The user asked for a file, so stderr no longer shows trace output;
        // tell them where it went.
        eprintln!("Trace output will go to {}", path.display());
        Ok(Self::File {
            path,
            file: Arc::new(file),
        })
    }

    /// The backing path, when the sink was opened from one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Stderr | Self::Inherited { .. } => None,
        }
    }

    /// The descriptor a spawned worker should append through, or `None` when
    /// the sink is stderr and the worker simply inherits it.
    pub fn shared_fd(&self) -> Option<RawFd> {
        match self {
            Self::Stderr => None,
            Self::File { file, .. } => Some(file.as_raw_fd()),
            Self::Inherited { fd, .. } => Some(*fd),
        }
    }

    /// A cheap clonable write handle onto this sink.
    pub fn writer(&self) -> SinkHandle {
        match self {
            Self::Stderr => SinkHandle::Stderr,
            Self::File { file, .. } | Self::Inherited { file, .. } => {
                SinkHandle::File(file.clone())
            }
        }
    }

    /// Force buffered bytes out so a concurrent reader (e.g. a worker
    /// tailing the same file) sees them.
    pub fn flush(&self) -> io::Result<()> {
        self.writer().flush()
    }
}

/// Take ownership of a descriptor passed down by a parent wrapper.
///
/// The parent keeps the descriptor open for at least our lifetime and does
/// not own it inside this process, so wrapping it in a `File` is sound.
#[allow(unsafe_code)]
fn adopt_descriptor(fd: RawFd) -> Result<File> {
    if fd < 0 {
        bail!("invalid inherited trace descriptor {fd}");
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// Write handle usable from the `tracing` layer and the capture tee.
#[derive(Debug, Clone)]
pub enum SinkHandle {
    Stderr,
    File(Arc<File>),
}

impl Write for SinkHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stderr => io::stderr().write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stderr => io::stderr().flush(),
            Self::File(file) => file.flush(),
        }
    }
}
