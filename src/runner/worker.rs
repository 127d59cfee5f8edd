//! Worker threads and the channel-driven control loop.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::observer::{ChannelObserver, Labeled, Observer};
use super::process::OutputStream;
use super::types::{Invocation, InvocationId, JobEvent, RunEvent, RunnerError};

/// Deliver every event of `stream` to `observer` and return the exit code.
///
/// If the observer fails, nothing more is delivered to it; the rest of the
/// output is read and discarded so the child is still reaped.
pub fn run_to_observer(mut stream: OutputStream, observer: &dyn Observer) -> i32 {
    while let Some(event) = stream.next() {
        match event {
            RunEvent::Line(line) => {
                if let Err(e) = observer.append(&line) {
                    tracing::debug!(error = %e, "observer gone, dropping remaining output");
                    return stream.wait();
                }
            }
            RunEvent::Finished(code) => {
                if let Err(e) = observer.finished(code) {
                    tracing::debug!(error = %e, code, "observer gone before exit code");
                }
                return code;
            }
        }
    }

    -1
}

/// How long [`Dispatcher::next_event`] waits before checking for dead workers.
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// Handle to a process being pumped on its own thread.
pub struct Worker {
    pid: u32,
    handle: JoinHandle<i32>,
}

impl Worker {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True once the pump thread has returned or panicked.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the process exits. `None` if the worker thread panicked.
    pub fn join(self) -> Option<i32> {
        self.handle.join().ok()
    }
}

/// Start `invocation` and pump its output to `observer` on a new thread.
///
/// The process is spawned on the calling thread, so a missing program is
/// reported here and the observer is never called.
pub fn spawn_worker(
    invocation: Invocation,
    observer: Arc<dyn Observer>,
) -> Result<Worker, RunnerError> {
    let name = format!("run:{}", invocation.program());
    let stream = invocation.spawn()?;
    let pid = stream.pid().unwrap_or_default();

    let handle = thread::Builder::new()
        .name(name)
        .spawn(move || run_to_observer(stream, observer.as_ref()))
        .map_err(RunnerError::Thread)?;

    Ok(Worker { pid, handle })
}

/// Control loop for any number of concurrent invocations.
///
/// Workers push [`JobEvent`]s onto one channel; the owner of the dispatcher
/// consumes them in arrival order. Per invocation that order is the order
/// the process wrote its lines. A worker thread that dies without reporting
/// is surfaced as `Finished(-1)`.
pub struct Dispatcher {
    tx: Sender<JobEvent>,
    rx: Receiver<JobEvent>,
    next_id: u64,
    labels: BTreeMap<InvocationId, String>,
    running: BTreeMap<InvocationId, Worker>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            next_id: 0,
            labels: BTreeMap::new(),
            running: BTreeMap::new(),
        }
    }

    /// Start an invocation. Returns immediately; output arrives through
    /// [`next_event`](Self::next_event) or [`drain`](Self::drain).
    pub fn launch(
        &mut self,
        label: impl Into<String>,
        invocation: Invocation,
    ) -> Result<InvocationId, RunnerError> {
        let id = InvocationId(self.next_id);
        let label = label.into();

        let observer = Arc::new(ChannelObserver::new(id, self.tx.clone()));
        let worker = spawn_worker(invocation, observer)?;
        tracing::debug!(%id, %label, pid = worker.pid(), "launched");

        self.next_id += 1;
        self.track(id, label, worker);
        Ok(id)
    }

    fn track(&mut self, id: InvocationId, label: String, worker: Worker) {
        self.labels.insert(id, label);
        self.running.insert(id, worker);
    }

    /// Number of launched invocations that have not reported an exit code.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub fn label(&self, id: InvocationId) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    /// Wait for the next event, or `None` once nothing is running.
    pub fn next_event(&mut self) -> Option<JobEvent> {
        if self.running.is_empty() {
            return None;
        }

        loop {
            match self.rx.recv_timeout(LIVENESS_POLL) {
                Ok(event) => return Some(self.settle(event)),
                // Unreachable while we hold `tx`.
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            }

            // Collect dead workers before the final check, so anything they
            // sent before exiting is already queued.
            let dead: Vec<InvocationId> = self
                .running
                .iter()
                .filter(|(_, worker)| worker.is_finished())
                .map(|(&id, _)| id)
                .collect();
            if let Ok(event) = self.rx.try_recv() {
                return Some(self.settle(event));
            }
            if let Some(&id) = dead.first() {
                tracing::warn!(%id, "worker thread died without an exit code");
                self.running.remove(&id);
                return Some(JobEvent {
                    id,
                    event: RunEvent::Finished(-1),
                });
            }
        }
    }

    fn settle(&mut self, event: JobEvent) -> JobEvent {
        if let RunEvent::Finished(_) = event.event {
            self.running.remove(&event.id);
        }
        event
    }

    /// Forward events to `observer` until every invocation has finished.
    ///
    /// With `labeled`, lines are prefixed with the launch label so runs
    /// sharing one log stay tellable apart. Exit codes are returned per id
    /// even if the observer stops accepting output.
    pub fn drain(&mut self, observer: &dyn Observer, labeled: bool) -> BTreeMap<InvocationId, i32> {
        let mut codes = BTreeMap::new();
        let mut delivering = true;

        while let Some(JobEvent { id, event }) = self.next_event() {
            if let RunEvent::Finished(code) = event {
                codes.insert(id, code);
            }
            if !delivering {
                continue;
            }

            let label = self.labels.get(&id).map(String::as_str).unwrap_or("?");
            let labeled_observer = Labeled::new(label, observer);
            let target: &dyn Observer = if labeled { &labeled_observer } else { observer };

            let delivered = match event {
                RunEvent::Line(line) => target.append(&line),
                RunEvent::Finished(code) => target.finished(code),
            };
            if let Err(e) = delivered {
                tracing::debug!(error = %e, "log surface gone, discarding output");
                delivering = false;
            }
        }

        codes
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_worker() -> Worker {
        let handle = thread::Builder::new()
            .name("run:dead".to_string())
            .spawn(|| -> i32 { panic!("pump thread crashed") })
            .unwrap();
        Worker { pid: 0, handle }
    }

    #[test]
    fn test_dead_worker_reports_unknown_exit() {
        let mut dispatcher = Dispatcher::new();
        let id = InvocationId(0);
        dispatcher.track(id, "dead".to_string(), dead_worker());

        let event = dispatcher.next_event().unwrap();

        assert_eq!(
            event,
            JobEvent {
                id,
                event: RunEvent::Finished(-1),
            }
        );
        assert_eq!(dispatcher.running(), 0);
        assert!(dispatcher.next_event().is_none());
    }

    #[test]
    fn test_drain_returns_despite_dead_worker() {
        use crate::runner::LogPane;

        let mut dispatcher = Dispatcher::new();
        dispatcher.track(InvocationId(3), "dead".to_string(), dead_worker());
        let pane = LogPane::new(Vec::new());

        let codes = dispatcher.drain(&pane, true);

        assert_eq!(codes.get(&InvocationId(3)), Some(&-1));
        let text = String::from_utf8(pane.into_inner()).unwrap();
        assert_eq!(text, "[dead] [exit -1]\n");
    }

    #[test]
    fn test_events_sent_before_panic_are_kept() {
        let mut dispatcher = Dispatcher::new();
        let id = InvocationId(1);
        let tx = dispatcher.tx.clone();
        let handle = thread::spawn(move || -> i32 {
            tx.send(JobEvent {
                id,
                event: RunEvent::Line("last words".to_string()),
            })
            .unwrap();
            panic!("pump thread crashed");
        });
        dispatcher.track(id, "dying".to_string(), Worker { pid: 0, handle });

        assert_eq!(
            dispatcher.next_event().unwrap().event,
            RunEvent::Line("last words".to_string())
        );
        assert_eq!(dispatcher.next_event().unwrap().event, RunEvent::Finished(-1));
        assert!(dispatcher.next_event().is_none());
    }
}
