//! Debugger configuration as seen by the core.
//!
//! The hosting environment owns loading and storing the setting; the core only
//! reads it through [`crate::host::Host::debugger_command`].

use std::path::PathBuf;

/// Name of the user-settable configuration variable.
pub const COMMAND_SETTING: &str = "debugger.command";

/// Short description registered alongside the setting.
pub const COMMAND_DESCRIPTION: &str =
    "Debugger command to run; a single %d is required for the pid.";

/// Template used when the host has not overridden the setting.
pub const DEFAULT_COMMAND: &str = "screen -X screen -t gdb_window gdb -p %d";

/// Directory that receives generated breakpoint scripts.
pub const DEFAULT_SCRIPT_DIR: &str = "/tmp";

/// Snapshot of the settings one invocation runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerConfig {
    /// Raw template; `None` models an unset value and is rejected on use.
    pub command: Option<String>,
    pub script_dir: PathBuf,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            command: Some(DEFAULT_COMMAND.to_owned()),
            script_dir: PathBuf::from(DEFAULT_SCRIPT_DIR),
        }
    }
}

impl DebuggerConfig {
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }
}
