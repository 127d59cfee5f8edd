//! Output observers: the shared log pane and the channel forwarder.

use std::fs::File;
use std::io::Write;
use std::sync::Mutex;
use std::sync::mpsc::Sender;

use chrono::Local;

use super::types::{InvocationId, JobEvent, ObserverError, RunEvent};

/// Consumer of streamed output lines and a terminal exit code.
///
/// Implementations are shared between worker threads, so every call must
/// be safe to make concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait Observer: Send + Sync {
    /// Receive one output line.
    fn append(&self, line: &str) -> Result<(), ObserverError>;

    /// Receive the exit code. Called once per invocation, after every line.
    fn finished(&self, code: i32) -> Result<(), ObserverError>;
}

struct PaneWriters<W> {
    out: W,
    mirror: Option<File>,
}

/// Shared log surface.
///
/// Each line is written and flushed while holding one lock, so lines from
/// concurrent invocations never tear. An optional mirror file receives the
/// same lines with a local timestamp.
pub struct LogPane<W: Write + Send> {
    writers: Mutex<PaneWriters<W>>,
}

impl<W: Write + Send> LogPane<W> {
    pub fn new(out: W) -> Self {
        Self {
            writers: Mutex::new(PaneWriters { out, mirror: None }),
        }
    }

    /// Also copy every line into `file`, prefixed with the time of day.
    pub fn mirror_to(self, file: File) -> Self {
        let mut writers = self
            .writers
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writers.mirror = Some(file);
        Self {
            writers: Mutex::new(writers),
        }
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writers
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .out
    }

    fn write_line(&self, line: &str) -> Result<(), ObserverError> {
        let mut guard = self.writers.lock().map_err(|_| ObserverError::Poisoned)?;
        let writers = &mut *guard;

        writeln!(writers.out, "{line}")?;
        writers.out.flush()?;

        if let Some(mirror) = writers.mirror.as_mut() {
            let stamp = Local::now().format("%H:%M:%S%.3f");
            // A failed mirror write only disables the mirror.
            if let Err(e) = writeln!(mirror, "{stamp} {line}") {
                tracing::warn!(error = %e, "log file write failed, mirror disabled");
                writers.mirror = None;
            }
        }

        Ok(())
    }
}

impl<W: Write + Send> Observer for LogPane<W> {
    fn append(&self, line: &str) -> Result<(), ObserverError> {
        self.write_line(line)
    }

    fn finished(&self, code: i32) -> Result<(), ObserverError> {
        self.write_line(&format!("[exit {code}]"))
    }
}

/// Forwards a single invocation's events to a control loop over a channel.
pub struct ChannelObserver {
    id: InvocationId,
    tx: Sender<JobEvent>,
}

impl ChannelObserver {
    pub fn new(id: InvocationId, tx: Sender<JobEvent>) -> Self {
        Self { id, tx }
    }

    fn send(&self, event: RunEvent) -> Result<(), ObserverError> {
        self.tx
            .send(JobEvent { id: self.id, event })
            .map_err(|_| ObserverError::Disconnected)
    }
}

impl Observer for ChannelObserver {
    fn append(&self, line: &str) -> Result<(), ObserverError> {
        self.send(RunEvent::Line(line.to_string()))
    }

    fn finished(&self, code: i32) -> Result<(), ObserverError> {
        self.send(RunEvent::Finished(code))
    }
}

/// Prefixes every line with `[label]` before handing it on.
///
/// The exit code becomes a labelled `[exit N]` line, since the inner
/// observer is shared and would not otherwise know which run ended.
pub struct Labeled<'a> {
    label: &'a str,
    inner: &'a dyn Observer,
}

impl<'a> Labeled<'a> {
    pub fn new(label: &'a str, inner: &'a dyn Observer) -> Self {
        Self { label, inner }
    }
}

impl Observer for Labeled<'_> {
    fn append(&self, line: &str) -> Result<(), ObserverError> {
        self.inner.append(&format!("[{}] {line}", self.label))
    }

    fn finished(&self, code: i32) -> Result<(), ObserverError> {
        self.inner.append(&format!("[{}] [exit {code}]", self.label))
    }
}
