//! Validation and expansion of the debugger command template.
//!
//! A template carries exactly one `%d` for the process id. `%%` is allowed as
//! a literal percent sign; every other `%`-escape is refused so the template
//! can never pull in anything beyond the pid.

use log::debug;

use crate::config::COMMAND_SETTING;
use crate::errors::{PgdbError, PgdbResult};

/// Check that a debugger command is valid.
pub fn is_valid_debugger_command(command: Option<&str>) -> bool {
    let Some(command) = command else {
        return false;
    };

    let mut pid_escapes = 0;
    let mut chars = command.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        match chars.next() {
            Some('d') => pid_escapes += 1,
            Some('%') => {}
            _ => return false,
        }
    }

    pid_escapes == 1
}

/// A debugger command that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
}

impl CommandTemplate {
    /// Validate `command`, refusing absent templates and bad escapes.
    pub fn parse(command: Option<&str>) -> PgdbResult<Self> {
        match command {
            Some(raw) if is_valid_debugger_command(Some(raw)) => Ok(Self {
                raw: raw.to_owned(),
            }),
            _ => {
                debug!("rejecting debugger template {command:?}");
                Err(PgdbError::InvalidCommand {
                    setting: COMMAND_SETTING,
                })
            }
        }
    }

    /// Substitute `pid` for the `%d` escape and collapse `%%` to `%`.
    pub fn expand(&self, pid: i32) -> String {
        let mut out = String::with_capacity(self.raw.len() + 8);
        let mut chars = self.raw.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('d') => out.push_str(&pid.to_string()),
                Some('%') => out.push('%'),
                // parse() guarantees every escape is one of the two above
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_pid_escape() {
        assert!(is_valid_debugger_command(Some("gdb -p %d")));
        assert!(is_valid_debugger_command(Some("%d")));
        assert!(is_valid_debugger_command(Some(
            "screen -X screen -t gdb_window gdb -p %d"
        )));
    }

    #[test]
    fn accepts_literal_percents() {
        assert!(is_valid_debugger_command(Some("echo 100%% && gdb -p %d")));
        assert!(is_valid_debugger_command(Some("%%%d%%%%")));
    }

    #[test]
    fn rejects_missing_or_repeated_pid() {
        assert!(!is_valid_debugger_command(None));
        assert!(!is_valid_debugger_command(Some("")));
        assert!(!is_valid_debugger_command(Some("gdb")));
        assert!(!is_valid_debugger_command(Some("gdb -p %d %d")));
        assert!(!is_valid_debugger_command(Some("gdb -p %%d")));
    }

    #[test]
    fn rejects_other_escapes() {
        assert!(!is_valid_debugger_command(Some("gdb -p %d %s")));
        assert!(!is_valid_debugger_command(Some("%x gdb -p %d")));
        assert!(!is_valid_debugger_command(Some("gdb -p %i")));
        assert!(!is_valid_debugger_command(Some("gdb -p %d %")));
    }

    #[test]
    fn parse_error_carries_hint() {
        let err = CommandTemplate::parse(Some("gdb -p %s")).unwrap_err();
        assert!(matches!(err, PgdbError::InvalidCommand { .. }));
        assert_eq!(err.to_string(), "invalid debugger provided in debugger.command");
        assert_eq!(
            err.hint(),
            Some("command must have only a single %d escape for process id")
        );
    }

    #[test]
    fn expands_pid_and_collapses_percents() {
        let template = CommandTemplate::parse(Some("gdb -p %d")).unwrap();
        assert_eq!(template.expand(4242), "gdb -p 4242");

        let template = CommandTemplate::parse(Some("echo 50%% >log; gdb -p %d")).unwrap();
        assert_eq!(template.expand(7), "echo 50% >log; gdb -p 7");
    }

    #[test]
    fn expansion_keeps_multibyte_text() {
        let template = CommandTemplate::parse(Some("gdb -ex 'echo é' -p %d")).unwrap();
        assert_eq!(template.expand(1), "gdb -ex 'echo é' -p 1");
    }
}
