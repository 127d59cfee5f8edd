//! CLI argument definitions and parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::LauncherConfig;
use crate::jobs::{ExtractJob, LongSynthJob, SayJob};

/// Installer and launcher for the OpenVoice helper scripts.
#[derive(Parser, Debug)]
#[command(name = "openvoice-launcher")]
#[command(about = "Install and run the OpenVoice voice-cloning helper scripts")]
#[command(version)]
pub struct Args {
    /// Python interpreter that runs the helper scripts
    #[arg(long, global = true)]
    pub python: Option<String>,

    /// Directory containing the helper scripts
    #[arg(long, global = true)]
    pub scripts_dir: Option<PathBuf>,

    /// Directory the scripts run in (holds OpenVoice/checkpoints_v2)
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Settings file to use instead of ~/.openvoice-launcher/config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write output lines, timestamped, to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print the command tokens instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, mut config: LauncherConfig) -> LauncherConfig {
        if let Some(python) = &self.python {
            config.python = python.clone();
        }
        if let Some(dir) = &self.scripts_dir {
            config.scripts_dir = dir.clone();
        }
        if let Some(dir) = &self.workdir {
            config.workdir = Some(dir.clone());
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the helper scripts into a directory
    Install {
        /// Installation directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Remember the directory as the scripts directory
        #[arg(long)]
        save_config: bool,
    },

    /// Extract a timbre embedding from reference audio
    Extract(ExtractArgs),

    /// Generate speech from text with a saved embedding
    Say(SayArgs),

    /// Synthesize a whole text file against reference audio
    LongSynth(LongSynthArgs),

    /// Run an arbitrary command and stream its output
    Exec {
        /// Program followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },

    /// Run every command in a file concurrently
    ///
    /// Each non-blank line not starting with '#' is a JSON array of tokens.
    Batch {
        /// File with one JSON token array per line
        file: PathBuf,
    },

    /// Inspect or persist settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective settings as JSON
    Show,
    /// Print the settings file location
    Path,
    /// Save the effective settings, including command-line overrides
    Save,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Reference WAV/MP3
    pub wav: PathBuf,

    /// Name for the embedding (defaults to the file stem)
    #[arg(short, long)]
    pub name: Option<String>,
}

impl ExtractArgs {
    pub fn to_job(&self) -> ExtractJob {
        let job = ExtractJob::new(self.wav.clone());
        match &self.name {
            Some(name) => job.with_name(name.clone()),
            None => job,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct SayArgs {
    /// Text to speak
    #[arg(long)]
    pub text: String,

    /// Embedding name (no .pth)
    #[arg(long)]
    pub voice: String,

    /// Base speaker token
    #[arg(long, default_value = "en_default")]
    pub base: String,

    /// Language code
    #[arg(long, default_value = "EN")]
    pub lang: String,

    /// Speed factor (0.7 to 1.3)
    #[arg(long, default_value = "1.0")]
    pub speed: f32,

    /// Rhythm factor (0.5 to 1.5)
    #[arg(long, default_value = "1.0")]
    pub rhythm: f32,

    /// Normalize volume
    #[arg(long)]
    pub normalize: bool,

    /// Output file
    #[arg(long, default_value = "out.wav")]
    pub out: PathBuf,
}

impl SayArgs {
    pub fn to_job(&self) -> SayJob {
        SayJob::new(self.text.clone(), self.voice.clone())
            .with_base(self.base.clone())
            .with_lang(self.lang.clone())
            .with_speed(self.speed)
            .with_rhythm(self.rhythm)
            .with_normalize(self.normalize)
            .with_out(self.out.clone())
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct LongSynthArgs {
    /// Text file to read aloud
    pub text_file: PathBuf,

    /// Reference recording of the target voice
    pub reference_wav: PathBuf,

    /// Output audio file
    pub output_wav: PathBuf,

    /// Language code
    #[arg(long, default_value = "EN")]
    pub lang: String,

    /// Base speaker token
    #[arg(long, default_value = "en_default")]
    pub base: String,

    /// Emotion preset
    #[arg(long, default_value = "neutral")]
    pub emotion: String,

    /// Speed factor (0.7 to 1.3)
    #[arg(long, default_value = "1.0")]
    pub speed: f32,

    /// Rhythm factor (0.5 to 1.5)
    #[arg(long, default_value = "1.0")]
    pub rhythm: f32,

    /// Output container format
    #[arg(long, default_value = "WAV")]
    pub format: String,

    /// Output sample rate in Hz
    #[arg(long, default_value = "24000")]
    pub samplerate: String,

    /// Output channel layout
    #[arg(long, default_value = "mono")]
    pub channels: String,
}

impl LongSynthArgs {
    pub fn to_job(&self) -> LongSynthJob {
        LongSynthJob {
            lang: self.lang.clone(),
            base: self.base.clone(),
            emotion: self.emotion.clone(),
            speed: self.speed,
            rhythm: self.rhythm,
            format: self.format.clone(),
            samplerate: self.samplerate.clone(),
            channels: self.channels.clone(),
            ..LongSynthJob::new(
                self.text_file.clone(),
                self.reference_wav.clone(),
                self.output_wav.clone(),
            )
        }
    }
}
