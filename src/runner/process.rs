//! Process spawning and line streaming.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};

use os_pipe::PipeReader;

use super::types::{Invocation, RunEvent, RunnerError};

impl Invocation {
    /// Start the process and return a stream over its merged output.
    ///
    /// stdout and stderr are attached to the same pipe, so lines arrive in
    /// the order the kernel received the writes. No line is produced when
    /// the program cannot be started.
    pub fn spawn(self) -> Result<OutputStream, RunnerError> {
        let (reader, writer) = os_pipe::pipe().map_err(RunnerError::Pipe)?;
        let writer_err = writer.try_clone().map_err(RunnerError::Pipe)?;

        let mut command = Command::new(self.program());
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err);
        if let Some(dir) = self.cwd() {
            command.current_dir(dir);
        }

        let spawned = command.spawn();
        // The command owns our copies of the write end; EOF only arrives
        // once they are closed.
        drop(command);

        let child = spawned.map_err(|source| RunnerError::Spawn {
            program: self.program().to_string(),
            source,
        })?;

        tracing::debug!(
            pid = child.id(),
            argv = ?self.argv(),
            cwd = ?self.cwd(),
            "process started"
        );

        Ok(OutputStream {
            program: self.program().to_string(),
            reader: Some(BufReader::new(reader)),
            child: Some(child),
            buf: Vec::new(),
        })
    }
}

/// Lazy, finite sequence of [`RunEvent`]s for one running process.
///
/// Yields every output line in order, then a single
/// [`RunEvent::Finished`], then `None` forever.
pub struct OutputStream {
    program: String,
    reader: Option<BufReader<PipeReader>>,
    child: Option<Child>,
    buf: Vec<u8>,
}

impl OutputStream {
    /// OS process id, while the process has not been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Discard any remaining output and wait for the exit code.
    pub fn wait(mut self) -> i32 {
        while self.next_line().is_some() {}
        self.finish().unwrap_or(-1)
    }

    fn next_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        self.buf.clear();

        match reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.reader = None;
                None
            }
            Ok(_) => Some(decode_line(&self.buf)),
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "output read failed");
                self.reader = None;
                None
            }
        }
    }

    fn finish(&mut self) -> Option<i32> {
        let mut child = self.child.take()?;
        self.reader = None;

        let code = match child.wait() {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "wait failed");
                -1
            }
        };
        tracing::debug!(program = %self.program, code, "process exited");
        Some(code)
    }
}

impl Iterator for OutputStream {
    type Item = RunEvent;

    fn next(&mut self) -> Option<RunEvent> {
        if let Some(line) = self.next_line() {
            return Some(RunEvent::Line(line));
        }
        self.finish().map(RunEvent::Finished)
    }
}

impl std::iter::FusedIterator for OutputStream {}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Map an exit status to a single integer code.
///
/// Signal deaths on unix follow the shell convention of `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_decode_line_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"a\xffb\n"), "a\u{fffd}b");
    }
}
