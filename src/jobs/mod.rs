//! Helper-script jobs.
//!
//! Each job is an immutable value captured when the user asks for an action.
//! It validates itself and marshals into an explicit token list for the
//! runner; no command string is ever assembled.

mod params;

pub use params::{
    ExtractJob, Job, JobError, LongSynthJob, RHYTHM_RANGE, SPEED_RANGE, SayJob,
};
