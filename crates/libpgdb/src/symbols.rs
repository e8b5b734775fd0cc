//! Exported text symbols of a live process, read lazily from an `nm` pipeline.
//!
//! The pipeline walks `/proc/<pid>/maps` for mapped shared objects, runs `nm`
//! over them plus the executable image, and keeps the sorted, deduplicated
//! names of defined text symbols. [`LineStream`] relays its output one line at
//! a time; the pipe is opened on the first pull and released exactly once,
//! either at end of stream or when the stream is dropped.

use std::io::{self, BufRead, BufReader};
use std::mem;
use std::process::{Child, ChildStdout, Command, Stdio};

use log::{debug, warn};

use crate::errors::{PgdbError, PgdbResult};

/// Stages turning `nm` output into sorted, unique text-symbol names.
pub fn symbol_filter() -> &'static str {
    "grep -v :$ | grep -i ' T ' | awk '{ print $3 }' | sort | uniq"
}

/// Shell pipeline listing the exported text symbols of `pid`.
pub fn symbol_pipeline(pid: i32) -> String {
    format!(
        "nm -C /proc/{pid}/exe $(cat /proc/{pid}/maps | grep -vi '(deleted)' | \
         awk '{{ print $6 }}' | grep ^'/.*o$' | sort | uniq) | {}",
        symbol_filter()
    )
}

/// Lazy symbol listing for `pid`.
pub fn open(pid: i32) -> LineStream<ShellPipe> {
    LineStream::new(ShellPipe, symbol_pipeline(pid))
}

/// Readable end of a running pipeline.
pub trait PipeHandle {
    /// Append the next line, newline included, to `buf`; `Ok(0)` at end of stream.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Release the pipe and reap whatever produced it.
    fn close(&mut self) -> io::Result<()>;
}

/// Starts pipelines.
pub trait PipeSpawner {
    type Handle: PipeHandle;

    fn spawn(&self, command: &str) -> io::Result<Self::Handle>;
}

/// Runs pipelines with `sh -c`, reading their stdout.
///
/// The child runs in the C locale so `sort` orders bytewise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellPipe;

impl PipeSpawner for ShellPipe {
    type Handle = ShellPipeHandle;

    fn spawn(&self, command: &str) -> io::Result<ShellPipeHandle> {
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        Ok(ShellPipeHandle {
            child,
            stdout: Some(BufReader::new(stdout)),
        })
    }
}

#[derive(Debug)]
pub struct ShellPipeHandle {
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
}

impl PipeHandle for ShellPipeHandle {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read_until(b'\n', buf),
            None => Ok(0),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the reader first lets a pipeline abandoned mid-stream exit
        // on SIGPIPE instead of blocking the wait below.
        drop(self.stdout.take());
        let status = self.child.wait()?;
        debug!("pipeline pid {} finished with {status}", self.child.id());
        Ok(())
    }
}

enum State<H> {
    Unopened,
    Open(H),
    Closed,
}

/// Forward-only sequence of lines from one run of a pipeline.
pub struct LineStream<S: PipeSpawner> {
    spawner: S,
    command: String,
    state: State<S::Handle>,
}

impl<S: PipeSpawner> LineStream<S> {
    /// Prepare a stream; nothing runs until the first call to `next`.
    pub fn new(spawner: S, command: impl Into<String>) -> Self {
        Self {
            spawner,
            command: command.into(),
            state: State::Unopened,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    fn read_next(handle: &mut S::Handle) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        if handle.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Move to `Closed`, releasing the pipe if one is held.
    fn close(&mut self) {
        if let State::Open(mut handle) = mem::replace(&mut self.state, State::Closed) {
            if let Err(e) = handle.close() {
                warn!("closing pipeline `{}` failed: {e}", self.command);
            }
        }
    }
}

impl<S: PipeSpawner> Iterator for LineStream<S> {
    type Item = PgdbResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::Unopened = self.state {
            match self.spawner.spawn(&self.command) {
                Ok(handle) => {
                    debug!("opened pipeline `{}`", self.command);
                    self.state = State::Open(handle);
                }
                Err(source) => {
                    self.state = State::Closed;
                    return Some(Err(PgdbError::Spawn {
                        command: self.command.clone(),
                        source,
                    }));
                }
            }
        }

        let State::Open(handle) = &mut self.state else {
            return None;
        };
        match Self::read_next(handle) {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e.into()))
            }
        }
    }
}

impl<S: PipeSpawner> Drop for LineStream<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Canned output with a shared close counter.
    struct FakePipe {
        output: Vec<&'static str>,
        closes: Rc<Cell<usize>>,
        fail_spawn: bool,
    }

    struct FakeHandle {
        lines: VecDeque<&'static str>,
        closes: Rc<Cell<usize>>,
    }

    impl PipeHandle for FakeHandle {
        fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
            match self.lines.pop_front() {
                Some(line) => {
                    buf.extend_from_slice(line.as_bytes());
                    Ok(line.len())
                }
                None => Ok(0),
            }
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    impl PipeSpawner for FakePipe {
        type Handle = FakeHandle;

        fn spawn(&self, _command: &str) -> io::Result<FakeHandle> {
            if self.fail_spawn {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no shell"));
            }
            Ok(FakeHandle {
                lines: self.output.iter().copied().collect(),
                closes: Rc::clone(&self.closes),
            })
        }
    }

    fn fake(output: Vec<&'static str>) -> (FakePipe, Rc<Cell<usize>>) {
        let closes = Rc::new(Cell::new(0));
        let pipe = FakePipe {
            output,
            closes: Rc::clone(&closes),
            fail_spawn: false,
        };
        (pipe, closes)
    }

    #[test]
    fn pipeline_targets_pid() {
        let command = symbol_pipeline(4242);
        assert!(command.starts_with("nm -C /proc/4242/exe $(cat /proc/4242/maps"));
        assert!(command.contains("awk '{ print $6 }'"));
        assert!(command.contains("grep -i ' T '"));
        assert!(command.ends_with(symbol_filter()));
    }

    #[test]
    fn lines_are_trimmed_and_stream_closes_once() {
        let (pipe, closes) = fake(vec!["alpha\n", "beta\n", "gamma"]);
        let mut stream = LineStream::new(pipe, "ignored");
        assert!(!stream.is_open());

        assert_eq!(stream.next().unwrap().unwrap(), "alpha");
        assert!(stream.is_open());
        assert_eq!(stream.next().unwrap().unwrap(), "beta");
        assert_eq!(stream.next().unwrap().unwrap(), "gamma");
        assert!(stream.next().is_none());
        assert!(stream.is_closed());
        assert!(stream.next().is_none());
        drop(stream);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn abandoning_early_still_closes() {
        let (pipe, closes) = fake(vec!["a\n", "b\n"]);
        let mut stream = LineStream::new(pipe, "ignored");
        assert_eq!(stream.next().unwrap().unwrap(), "a");
        drop(stream);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn unopened_stream_never_spawns() {
        let (pipe, closes) = fake(vec!["a\n"]);
        drop(LineStream::new(pipe, "ignored"));
        assert_eq!(closes.get(), 0);
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let (mut pipe, _) = fake(vec![]);
        pipe.fail_spawn = true;
        let mut stream = LineStream::new(pipe, "nm -C /proc/1/exe");
        match stream.next() {
            Some(Err(PgdbError::Spawn { command, .. })) => assert_eq!(command, "nm -C /proc/1/exe"),
            other => panic!("expected spawn error, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn filter_keeps_defined_text_symbols() {
        let nm_output = [
            "",
            "/usr/lib/libfoo.so:",
            "0000000000001130 T b",
            "0000000000001140 T a",
            "                 U malloc",
            "0000000000001150 t local_helper",
            "0000000000004010 D some_data",
            "/usr/lib/libbar.so:",
            "0000000000002130 T a",
            "0000000000002140 T c",
            "0000000000002150 W weak_one",
        ]
        .join("\n");
        let command = format!("printf '%s\\n' '{nm_output}' | {}", symbol_filter());

        let lines: Vec<String> = LineStream::new(ShellPipe, command)
            .collect::<PgdbResult<_>>()
            .expect("lines");
        // ' T ' is matched case-insensitively, so local text symbols stay
        assert_eq!(lines, ["a", "b", "c", "local_helper"]);
    }

    #[test]
    fn shell_pipe_sorts_bytewise() {
        let stream = LineStream::new(ShellPipe, "printf 'b\\nB\\n_x\\na\\n' | sort");
        let lines: Vec<String> = stream.collect::<PgdbResult<_>>().expect("lines");
        assert_eq!(lines, ["B", "_x", "a", "b"]);
    }

    #[test]
    fn shell_pipe_dedups_and_sorts() {
        let stream = LineStream::new(ShellPipe, "printf 'b\\na\\nc\\na\\n' | sort | uniq");
        let lines: Vec<String> = stream.collect::<PgdbResult<_>>().expect("lines");
        assert_eq!(lines, ["a", "b", "c"]);
    }
}
