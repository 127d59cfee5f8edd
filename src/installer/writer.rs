//! Writes the embedded helper scripts into a directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{ConfigError, expand_home};

/// Errors that can occur while installing helper scripts.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Invalid destination: {0}")]
    Destination(#[from] ConfigError),

    #[error("Cannot create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One helper script shipped inside the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelperScript {
    pub name: &'static str,
    pub description: &'static str,
    pub contents: &'static str,
}

/// Every script the installer writes, in install order.
pub const HELPER_SCRIPTS: [HelperScript; 3] = [
    HelperScript {
        name: "long_synth.py",
        description: "long-form synthesis (placeholder)",
        contents: include_str!("templates/long_synth.py"),
    },
    HelperScript {
        name: "extract_se.py",
        description: "timbre extraction",
        contents: include_str!("templates/extract_se.py"),
    },
    HelperScript {
        name: "say.py",
        description: "speech generation from text and embeddings",
        contents: include_str!("templates/say.py"),
    },
];

/// What an install run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Canonical destination directory.
    pub dest: PathBuf,
    /// Written files, in install order.
    pub written: Vec<PathBuf>,
}

/// Write every helper script into `dest`, creating it if needed.
///
/// Existing files of the same name are overwritten.
pub fn install(dest: impl AsRef<Path>) -> Result<InstallReport, InstallError> {
    let dest = expand_home(dest)?;

    fs::create_dir_all(&dest).map_err(|source| InstallError::CreateDir {
        path: dest.clone(),
        source,
    })?;
    let dest = dest.canonicalize().map_err(|source| InstallError::CreateDir {
        path: dest.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(HELPER_SCRIPTS.len());
    for script in &HELPER_SCRIPTS {
        let path = dest.join(script.name);
        write_script(&path, script.contents)?;
        tracing::debug!(path = %path.display(), "helper written");
        written.push(path);
    }

    Ok(InstallReport { dest, written })
}

fn write_script(path: &Path, contents: &str) -> Result<(), InstallError> {
    let write_err = |source| InstallError::Write {
        path: path.to_path_buf(),
        source,
    };

    fs::write(path, contents).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(write_err)?;
    }

    Ok(())
}
