//! Narrow interface to the environment hosting the launcher.

use nix::unistd::getpid;

use crate::breakpoints::{ScriptSink, TempScriptDir};
use crate::config::DebuggerConfig;
use crate::errors::{PgdbError, PgdbResult};

/// What the core needs from its host: the calling process, the configured
/// template, and a place to write breakpoint scripts.
pub trait Host {
    type Sink: ScriptSink;

    /// Process the debugger attaches to.
    fn pid(&self) -> i32;

    /// Current value of the debugger template setting.
    fn debugger_command(&self) -> Option<String>;

    fn script_sink(&self) -> &Self::Sink;
}

/// Element type of a decoded array argument.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ElementType {
    Text,
    Other(String),
}

/// Array argument as handed over by the host, elements possibly null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayArg {
    element_type: ElementType,
    elements: Vec<Option<String>>,
}

impl ArrayArg {
    pub fn text(elements: Vec<Option<String>>) -> Self {
        Self {
            element_type: ElementType::Text,
            elements,
        }
    }

    /// Array of a non-text type; only its type name matters here.
    pub fn other(type_name: impl Into<String>) -> Self {
        Self {
            element_type: ElementType::Other(type_name.into()),
            elements: Vec::new(),
        }
    }

    /// Elements of a text array, or [`PgdbError::ExpectedTextArray`].
    pub fn as_text(&self) -> PgdbResult<&[Option<String>]> {
        match &self.element_type {
            ElementType::Text => Ok(&self.elements),
            ElementType::Other(name) => Err(PgdbError::ExpectedTextArray {
                found: name.clone(),
            }),
        }
    }
}

/// Host backed by the current OS process and a fixed configuration.
#[derive(Debug, Clone)]
pub struct ProcessHost {
    pid: i32,
    config: DebuggerConfig,
    sink: TempScriptDir,
}

impl ProcessHost {
    pub fn new(config: DebuggerConfig) -> Self {
        let sink = TempScriptDir::new(config.script_dir.clone());
        Self {
            pid: getpid().as_raw(),
            config,
            sink,
        }
    }

    /// Attach to `pid` instead of the current process.
    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = pid;
        self
    }
}

impl Host for ProcessHost {
    type Sink = TempScriptDir;

    fn pid(&self) -> i32 {
        self.pid
    }

    fn debugger_command(&self) -> Option<String> {
        self.config.command.clone()
    }

    fn script_sink(&self) -> &TempScriptDir {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_array_exposes_elements() {
        let arg = ArrayArg::text(vec![Some("main".into()), None]);
        assert_eq!(arg.as_text().unwrap(), &[Some("main".to_owned()), None]);
    }

    #[test]
    fn non_text_array_is_rejected() {
        let err = ArrayArg::other("int4").as_text().unwrap_err();
        assert_eq!(err.to_string(), "Expected text array");
        assert!(matches!(err, PgdbError::ExpectedTextArray { found } if found == "int4"));
    }

    #[test]
    fn process_host_defaults_to_own_pid() {
        let host = ProcessHost::new(DebuggerConfig::default());
        assert_eq!(host.pid(), std::process::id() as i32);
        assert_eq!(host.with_pid(17).pid(), 17);
    }
}
