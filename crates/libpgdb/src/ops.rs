//! The two user-facing operations: attaching a debugger and listing symbols.

use std::path::PathBuf;

use log::info;

use crate::breakpoints::BreakpointScript;
use crate::errors::PgdbResult;
use crate::host::{ArrayArg, Host};
use crate::launcher::{Launcher, Spawned};
use crate::symbols::{self, LineStream, ShellPipe};
use crate::template::CommandTemplate;

/// What [`attach`] started.
#[derive(Debug)]
pub struct Attached {
    /// Final shell command handed to the launcher.
    pub command: String,
    /// Breakpoint script referenced through `-x`, if one was written.
    pub script: Option<PathBuf>,
    pub child: Spawned,
}

/// Build the debugger command for `host` without launching it.
///
/// Validation and the script write both happen here, so any error leaves
/// nothing running.
pub fn prepare_command<H: Host>(
    host: &H,
    breakpoints: Option<&ArrayArg>,
) -> PgdbResult<(String, Option<PathBuf>)> {
    let template = CommandTemplate::parse(host.debugger_command().as_deref())?;
    let pid = host.pid();
    let mut command = template.expand(pid);

    let Some(arg) = breakpoints else {
        return Ok((command, None));
    };
    let Some(script) = BreakpointScript::from_specs(arg.as_text()?) else {
        return Ok((command, None));
    };
    let path = script.persist(host.script_sink(), pid)?;
    command = format!("{command} -x {}", shell_quote(&path.to_string_lossy()));
    Ok((command, Some(path)))
}

/// Quote `word` as a single `sh` argument.
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Launch the configured debugger against the host's process.
pub fn attach<H: Host, L: Launcher>(
    host: &H,
    launcher: &L,
    breakpoints: Option<&ArrayArg>,
) -> PgdbResult<Attached> {
    let (command, script) = prepare_command(host, breakpoints)?;
    info!("attaching debugger to pid {}: {command}", host.pid());
    let child = launcher.launch(&command)?;
    Ok(Attached {
        command,
        script,
        child,
    })
}

/// Symbols of `pid`, or of the host's own process when `pid` is `None`.
pub fn list_symbols<H: Host>(host: &H, pid: Option<i32>) -> LineStream<ShellPipe> {
    symbols::open(pid.unwrap_or_else(|| host.pid()))
}
