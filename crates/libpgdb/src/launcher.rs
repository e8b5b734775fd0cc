//! Detached launch of shell commands via `fork` + `exec`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use log::{debug, info};
use nix::libc;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};

use crate::errors::PgdbResult;

/// Interpreter every launched command runs under.
pub const DEFAULT_SHELL: &CStr = c"/bin/sh";

/// Exit status of a child whose `exec` failed.
pub const EXEC_FAILED_STATUS: i32 = 1;

/// Starts a shell command without waiting for it.
pub trait Launcher {
    fn launch(&self, command: &str) -> PgdbResult<Spawned>;
}

/// Forks and execs `sh -c <command>` in the child.
#[derive(Debug, Clone)]
pub struct ForkLauncher {
    shell: CString,
}

impl Default for ForkLauncher {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_owned(),
        }
    }
}

impl ForkLauncher {
    /// Use a different interpreter; it is still handed `sh -c <command>`.
    pub fn with_shell(shell: &str) -> PgdbResult<Self> {
        Ok(Self {
            shell: CString::new(shell)?,
        })
    }
}

impl Launcher for ForkLauncher {
    fn launch(&self, command: &str) -> PgdbResult<Spawned> {
        // Everything the child touches is built before forking so the child
        // only calls execv and _exit.
        let command = CString::new(command)?;
        let argv: [*const c_char; 4] = [
            c"sh".as_ptr(),
            c"-c".as_ptr(),
            command.as_ptr(),
            ptr::null(),
        ];

        debug!("forking {} -c {:?}", self.shell.to_string_lossy(), command);
        match unsafe { fork() }? {
            ForkResult::Parent { child } => {
                info!("launched debugger command as pid {child}");
                Ok(Spawned::new(child))
            }
            ForkResult::Child => {
                exec_shell(&self.shell, &argv);
                // SAFETY: _exit skips atexit handlers and stdio flushing, so
                // nothing inherited from the parent runs twice.
                unsafe { libc::_exit(EXEC_FAILED_STATUS) }
            }
        }
    }
}

fn exec_shell(shell: &CStr, argv: &[*const c_char; 4]) {
    // SAFETY: argv is NULL terminated and every entry outlives the call.
    unsafe {
        libc::execv(shell.as_ptr(), argv.as_ptr());
    }
}

/// Handle to a launched child that is never waited on implicitly.
#[derive(Debug)]
pub struct Spawned {
    pid: Pid,
    status: Option<WaitStatus>,
}

impl Spawned {
    fn new(pid: Pid) -> Self {
        Self { pid, status: None }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Poll the child; `None` while it is still running.
    pub fn try_wait(&mut self) -> PgdbResult<Option<WaitStatus>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }
        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::StillAlive => Ok(None),
            status => Ok(Some(self.record(status))),
        }
    }

    /// Block until the child exits.
    pub fn wait(&mut self) -> PgdbResult<WaitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = waitpid(self.pid, None)?;
        Ok(self.record(status))
    }

    fn record(&mut self, status: WaitStatus) -> WaitStatus {
        if matches!(status, WaitStatus::Exited(..) | WaitStatus::Signaled(..)) {
            self.status = Some(status);
        }
        status
    }
}
