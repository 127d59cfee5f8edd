//! Installer for the OpenVoice helper scripts.
//!
//! Nothing is downloaded: Conda, Git and the OpenVoice checkout are the
//! user's business. The installer only drops the helper scripts the
//! launcher drives into a directory.

mod writer;

pub use writer::{HELPER_SCRIPTS, HelperScript, InstallError, InstallReport, install};
