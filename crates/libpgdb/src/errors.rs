//! Error taxonomy for the debugger launcher core.

use nix::errno;
use std::ffi::NulError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Unified result type across the launcher core.
pub type PgdbResult<T> = Result<T, PgdbError>;

/// Hint attached to every rejected debugger template.
pub const INVALID_COMMAND_HINT: &str = "command must have only a single %d escape for process id";

/// Error cases
#[derive(Debug, Error)]
pub enum PgdbError {
    /// The configured debugger template was absent or carried bad escapes.
    #[error("invalid debugger provided in {setting}")]
    InvalidCommand { setting: &'static str },

    #[error("Expected text array")]
    ExpectedTextArray { found: String },

    #[error("could not create file: {}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write all data to file: {}", path.display())]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },

    #[error("could not execute command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("system call failed: {0}")]
    SysCall(#[from] errno::Errno),

    #[error("C string error: {0}")]
    CStringError(#[from] NulError),
}

impl PgdbError {
    /// User-facing hint accompanying the error, when there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PgdbError::InvalidCommand { .. } => Some(INVALID_COMMAND_HINT),
            _ => None,
        }
    }
}
