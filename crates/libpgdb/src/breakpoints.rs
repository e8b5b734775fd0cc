//! Breakpoint scripts handed to the debugger through `-x <path>`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use crate::errors::{PgdbError, PgdbResult};

/// Per-process counter keeping script names unique.
static SCRIPT_VERSION: AtomicU32 = AtomicU32::new(0);

/// Debugger directives that set each breakpoint and then resume execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointScript {
    contents: String,
    breakpoints: usize,
}

impl BreakpointScript {
    /// Build a script from `specs`, skipping nulls.
    ///
    /// Returns `None` when no breakpoint survives, in which case the caller
    /// runs the base command unchanged.
    pub fn from_specs(specs: &[Option<String>]) -> Option<Self> {
        let mut contents = String::new();
        let mut breakpoints = 0;
        for spec in specs.iter().flatten() {
            contents.push_str("break ");
            contents.push_str(spec);
            contents.push('\n');
            breakpoints += 1;
        }
        if breakpoints == 0 {
            return None;
        }
        contents.push_str("continue\n");
        Some(Self {
            contents,
            breakpoints,
        })
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn breakpoint_count(&self) -> usize {
        self.breakpoints
    }

    /// Write the script through `sink`, returning the path it landed at.
    ///
    /// The contents go out in a single write; anything less than the full
    /// script is reported as [`PgdbError::ShortWrite`].
    pub fn persist<S: ScriptSink>(&self, sink: &S, pid: i32) -> PgdbResult<PathBuf> {
        let path = sink.next_path(pid);
        let mut file = sink.create(&path).map_err(|source| PgdbError::CreateFile {
            path: path.clone(),
            source,
        })?;

        let bytes = self.contents.as_bytes();
        let written = file.write(bytes)?;
        if written != bytes.len() {
            return Err(PgdbError::ShortWrite {
                path,
                written,
                expected: bytes.len(),
            });
        }
        file.flush()?;

        debug!(
            "wrote {} breakpoint(s) to {}",
            self.breakpoints,
            path.display()
        );
        Ok(path)
    }
}

/// Where breakpoint scripts get written.
pub trait ScriptSink {
    type Writer: Write;

    /// Fresh, collision-free path for a script owned by `pid`.
    fn next_path(&self, pid: i32) -> PathBuf;

    fn create(&self, path: &Path) -> io::Result<Self::Writer>;
}

/// Scripts as plain files in a directory, `/tmp` by default.
///
/// Files are named `gdb_commands_<pid>_<n>.tmp` and are left behind once the
/// debugger has read them.
#[derive(Debug, Clone)]
pub struct TempScriptDir {
    dir: PathBuf,
}

impl TempScriptDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ScriptSink for TempScriptDir {
    type Writer = File;

    fn next_path(&self, pid: i32) -> PathBuf {
        let version = SCRIPT_VERSION.fetch_add(1, Ordering::Relaxed) + 1;
        self.dir.join(format!("gdb_commands_{pid}_{version}.tmp"))
    }

    fn create(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
    }
}
