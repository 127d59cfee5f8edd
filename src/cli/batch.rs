//! Batch files: parsing and concurrent execution.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::runner::{Dispatcher, Invocation, InvocationId, Observer};

/// Errors that can occur when parsing a batch file.
#[derive(Error, Debug)]
pub enum BatchParseError {
    #[error("Line {line}: expected a JSON array of strings: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: command has no tokens")]
    EmptyCommand { line: usize },
}

/// One command from a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// 1-based line number in the file.
    pub line: usize,
    pub tokens: Vec<String>,
}

impl BatchEntry {
    /// Label shown in front of this entry's output lines.
    pub fn label(&self) -> String {
        let program = self.tokens.first().map(String::as_str).unwrap_or("?");
        let program = program.rsplit(['/', '\\']).next().unwrap_or(program);
        format!("{}:{program}", self.line)
    }
}

/// Parse a batch file: one JSON token array per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_batch(input: &str) -> Result<Vec<BatchEntry>, BatchParseError> {
    let mut entries = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let tokens: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|source| BatchParseError::InvalidLine { line, source })?;
        if tokens.first().is_none_or(String::is_empty) {
            return Err(BatchParseError::EmptyCommand { line });
        }

        entries.push(BatchEntry { line, tokens });
    }

    Ok(entries)
}

/// Result of running a batch to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Entries whose program could not be started.
    pub spawn_failures: usize,
    /// Exit code of every entry that did start.
    pub codes: BTreeMap<InvocationId, i32>,
}

impl BatchOutcome {
    /// Entries that failed to start or exited nonzero.
    pub fn failed(&self) -> usize {
        self.spawn_failures + self.codes.values().filter(|&&code| code != 0).count()
    }

    pub fn exit_status(&self) -> u8 {
        if self.failed() == 0 { 0 } else { 1 }
    }
}

/// Launch every labelled invocation at once and stream them into `pane`.
///
/// A spawn failure is reported on the pane under its label and does not
/// stop the other entries.
pub fn run_batch(invocations: Vec<(String, Invocation)>, pane: &dyn Observer) -> BatchOutcome {
    let mut dispatcher = Dispatcher::new();
    let mut outcome = BatchOutcome::default();

    for (label, invocation) in invocations {
        if let Err(e) = dispatcher.launch(label.as_str(), invocation) {
            outcome.spawn_failures += 1;
            if let Err(pane_err) = pane.append(&format!("[{label}] {e}")) {
                tracing::debug!(error = %pane_err, "log surface gone, spawn failure not shown");
            }
        }
    }

    outcome.codes = dispatcher.drain(pane, true);
    outcome
}

/// Launcher exit status for a child exit code.
///
/// Codes outside 0..=255 (negative, or unavailable) collapse to 1.
pub fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
