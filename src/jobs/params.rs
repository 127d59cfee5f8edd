//! Job parameter values and their command-line marshaling.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::LauncherConfig;
use crate::runner::{Invocation, RunnerError};

/// Speed factors the helper scripts accept.
pub const SPEED_RANGE: RangeInclusive<f32> = 0.7..=1.3;

/// Rhythm factors the helper scripts accept.
pub const RHYTHM_RANGE: RangeInclusive<f32> = 0.5..=1.5;

/// Errors raised while turning job parameters into an invocation.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidName { field: &'static str, reason: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Cannot resolve {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// A helper-script run described by plain values.
pub trait Job {
    /// File name of the helper script, relative to the scripts directory.
    const SCRIPT: &'static str;

    /// Short label used in logs.
    fn label(&self) -> &'static str;

    /// Reject parameters the script would choke on.
    fn validate(&self) -> Result<(), JobError>;

    /// Arguments passed after the script path.
    ///
    /// File arguments are made absolute against the launcher's current
    /// directory, since the script runs in the configured working directory.
    fn script_args(&self) -> Result<Vec<String>, JobError>;

    /// Build the full invocation: interpreter, script, arguments.
    fn invocation(&self, config: &LauncherConfig) -> Result<Invocation, JobError> {
        self.validate()?;

        let script = config.script_path(Self::SCRIPT);
        let tokens = [config.python.clone(), path_token(&script)]
            .into_iter()
            .chain(self.script_args()?);

        Ok(Invocation::new(tokens)?.with_cwd(config.working_dir()))
    }
}

/// Extract a timbre embedding from a reference recording.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractJob {
    pub wav: PathBuf,
    /// Embedding name; the script falls back to the file stem.
    pub name: Option<String>,
}

impl ExtractJob {
    pub fn new(wav: impl Into<PathBuf>) -> Self {
        Self {
            wav: wav.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Job for ExtractJob {
    const SCRIPT: &'static str = "extract_se.py";

    fn label(&self) -> &'static str {
        "extract"
    }

    fn validate(&self) -> Result<(), JobError> {
        if self.wav.as_os_str().is_empty() {
            return Err(JobError::Empty("reference audio"));
        }
        if let Some(name) = &self.name {
            validate_name("embedding name", name)?;
        }
        Ok(())
    }

    fn script_args(&self) -> Result<Vec<String>, JobError> {
        let mut args = vec![user_path(&self.wav)?];
        if let Some(name) = &self.name {
            args.push("-n".to_string());
            args.push(name.clone());
        }
        Ok(args)
    }
}

/// Speak text with a saved embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct SayJob {
    pub text: String,
    pub voice: String,
    pub base: String,
    pub lang: String,
    pub speed: f32,
    pub rhythm: f32,
    pub normalize: bool,
    pub out: PathBuf,
}

impl SayJob {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            base: "en_default".to_string(),
            lang: "EN".to_string(),
            speed: 1.0,
            rhythm: 1.0,
            normalize: false,
            out: PathBuf::from("out.wav"),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_rhythm(mut self, rhythm: f32) -> Self {
        self.rhythm = rhythm;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = out.into();
        self
    }
}

impl Job for SayJob {
    const SCRIPT: &'static str = "say.py";

    fn label(&self) -> &'static str {
        "say"
    }

    fn validate(&self) -> Result<(), JobError> {
        if self.text.trim().is_empty() {
            return Err(JobError::Empty("text"));
        }
        validate_name("voice", &self.voice)?;
        validate_name("base speaker", &self.base)?;
        if self.lang.is_empty() {
            return Err(JobError::Empty("language"));
        }
        check_range("speed", self.speed, &SPEED_RANGE)?;
        check_range("rhythm", self.rhythm, &RHYTHM_RANGE)?;
        Ok(())
    }

    fn script_args(&self) -> Result<Vec<String>, JobError> {
        let mut args = vec![
            "--text".to_string(),
            self.text.clone(),
            "--voice".to_string(),
            self.voice.clone(),
            "--base".to_string(),
            self.base.clone(),
            "--lang".to_string(),
            self.lang.clone(),
            "--speed".to_string(),
            number(self.speed),
            "--rhythm".to_string(),
            number(self.rhythm),
        ];
        if self.normalize {
            args.push("--normalize".to_string());
        }
        args.push("--out".to_string());
        args.push(user_path(&self.out)?);
        Ok(args)
    }
}

/// Long-form synthesis of a whole text file against a reference recording.
#[derive(Debug, Clone, PartialEq)]
pub struct LongSynthJob {
    pub text_file: PathBuf,
    pub reference_wav: PathBuf,
    pub output_wav: PathBuf,
    pub lang: String,
    pub base: String,
    pub emotion: String,
    pub speed: f32,
    pub rhythm: f32,
    pub format: String,
    pub samplerate: String,
    pub channels: String,
}

impl LongSynthJob {
    pub fn new(
        text_file: impl Into<PathBuf>,
        reference_wav: impl Into<PathBuf>,
        output_wav: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text_file: text_file.into(),
            reference_wav: reference_wav.into(),
            output_wav: output_wav.into(),
            lang: "EN".to_string(),
            base: "en_default".to_string(),
            emotion: "neutral".to_string(),
            speed: 1.0,
            rhythm: 1.0,
            format: "WAV".to_string(),
            samplerate: "24000".to_string(),
            channels: "mono".to_string(),
        }
    }
}

impl Job for LongSynthJob {
    const SCRIPT: &'static str = "long_synth.py";

    fn label(&self) -> &'static str {
        "long-synth"
    }

    fn validate(&self) -> Result<(), JobError> {
        for (field, path) in [
            ("text file", &self.text_file),
            ("reference audio", &self.reference_wav),
            ("output file", &self.output_wav),
        ] {
            if path.as_os_str().is_empty() {
                return Err(JobError::Empty(field));
            }
        }
        validate_name("base speaker", &self.base)?;
        check_range("speed", self.speed, &SPEED_RANGE)?;
        check_range("rhythm", self.rhythm, &RHYTHM_RANGE)?;
        Ok(())
    }

    fn script_args(&self) -> Result<Vec<String>, JobError> {
        Ok(vec![
            user_path(&self.text_file)?,
            user_path(&self.reference_wav)?,
            user_path(&self.output_wav)?,
            "--lang".to_string(),
            self.lang.clone(),
            "--base".to_string(),
            self.base.clone(),
            "--emotion".to_string(),
            self.emotion.clone(),
            "--speed".to_string(),
            number(self.speed),
            "--rhythm".to_string(),
            number(self.rhythm),
            "--format".to_string(),
            self.format.clone(),
            "--samplerate".to_string(),
            self.samplerate.clone(),
            "--channels".to_string(),
            self.channels.clone(),
        ])
    }
}

/// Names end up as file names under the checkpoints tree.
fn validate_name(field: &'static str, name: &str) -> Result<(), JobError> {
    if name.is_empty() {
        return Err(JobError::Empty(field));
    }

    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(JobError::InvalidName {
            field,
            reason: "cannot contain path separators".to_string(),
        });
    }

    Ok(())
}

fn check_range(field: &'static str, value: f32, range: &RangeInclusive<f32>) -> Result<(), JobError> {
    if range.contains(&value) {
        return Ok(());
    }

    Err(JobError::OutOfRange {
        field,
        value,
        min: *range.start(),
        max: *range.end(),
    })
}

/// Always carries a decimal point, which argparse's `type=float` accepts.
fn number(value: f32) -> String {
    format!("{value:?}")
}

fn path_token(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn user_path(path: &Path) -> Result<String, JobError> {
    let absolute = std::path::absolute(path).map_err(|source| JobError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path_token(&absolute))
}
