//! openvoice-launcher: installer and process launcher for OpenVoice helpers.
//!
//! This crate writes the OpenVoice helper scripts into a directory and runs
//! them as subprocesses, streaming their merged output line by line. Voice
//! cloning itself happens inside the OpenVoice and MeloTTS toolkits.

pub mod cli;
pub mod config;
pub mod installer;
pub mod jobs;
pub mod runner;
