//! Persisted launcher settings.
//!
//! Settings live as pretty-printed JSON in `~/.openvoice-launcher/config.json`.
//! A missing file means defaults; command-line flags override whatever is
//! loaded.

mod settings;

pub use settings::{ConfigError, ConfigStore, LauncherConfig, expand_home};
