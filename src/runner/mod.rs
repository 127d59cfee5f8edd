//! Process runner: start external commands and stream their output.
//!
//! An [`Invocation`] is an immutable token list. Spawning it yields an
//! [`OutputStream`] of lines followed by one exit code. Workers pump that
//! stream into an [`Observer`] on their own threads, and the [`Dispatcher`]
//! collects events from many workers over a channel so the control thread
//! never blocks on process I/O.

mod observer;
mod process;
mod types;
mod worker;

pub use observer::{ChannelObserver, Labeled, LogPane, Observer};
pub use process::OutputStream;
pub use types::{Invocation, InvocationId, JobEvent, ObserverError, RunEvent, RunnerError};
pub use worker::{Dispatcher, Worker, run_to_observer, spawn_worker};

#[cfg(test)]
pub use observer::MockObserver;
