//! Tracing setup
//!
//! CLI runs log to stderr so stdout stays parseable. The TUI owns the
//! terminal, so it logs to a file under the cache directory instead.

use anyhow::Result;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "cinetui=debug"
    } else {
        "cinetui=info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Log to stderr (CLI mode)
pub fn init_cli(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log file used by the TUI (~/.cache/cinetui/cinetui.log)
pub fn log_file_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("cinetui").join("cinetui.log"))
}

/// Log to a file (TUI mode). Returns where the log is written, if anywhere.
pub fn init_tui(verbose: bool) -> Result<Option<PathBuf>> {
    let Some(path) = log_file_path() else {
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let file = File::create(&path)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();

    tracing::info!(log = %path.display(), "tui logging initialized");
    Ok(Some(path))
}
