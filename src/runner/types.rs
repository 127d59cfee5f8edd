//! Invocation and event types.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur when starting an external process.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Empty command: an invocation needs at least a program token")]
    EmptyCommand,

    #[error("Cannot start process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pipe setup failed: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("Worker thread failed to start: {0}")]
    Thread(#[source] std::io::Error),
}

/// Errors reported by an [`Observer`](super::Observer).
#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("Observer disconnected")]
    Disconnected,

    #[error("Log surface lock poisoned")]
    Poisoned,

    #[error("Write to log surface failed: {0}")]
    Write(#[from] std::io::Error),
}

/// One observable event produced by a running invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A line of merged stdout/stderr, without its line terminator.
    Line(String),
    /// The process exited with this code. Always the last event.
    Finished(i32),
}

/// Identifier handed out by a [`Dispatcher`](super::Dispatcher) per launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(pub u64);

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An event tagged with the invocation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub id: InvocationId,
    pub event: RunEvent,
}

/// A request to run one external command.
///
/// The first token is the program, the rest are passed as arguments
/// verbatim. Nothing is interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl Invocation {
    /// Build an invocation from an ordered token list.
    pub fn new<I, S>(tokens: I) -> Result<Self, RunnerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = tokens.into_iter().map(Into::into);
        let program = tokens.next().ok_or(RunnerError::EmptyCommand)?;
        if program.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }

        Ok(Self {
            program,
            args: tokens.collect(),
            cwd: None,
        })
    }

    /// Set the working directory the process starts in.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// The full token list, program first.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}
