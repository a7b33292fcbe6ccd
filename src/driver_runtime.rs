//! Process-wide driver runtime preparation and the runtime configuration file.
//!
//! Vendor driver modules ship as a bundle of files that must sit in one
//! directory before the first handle is opened. [`ensure_ready`] puts them
//! there once per process.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{ArgumentError, Result};

static READY: OnceCell<PathBuf> = OnceCell::new();

/// Where the driver files come from and where they must end up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverBundle {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Plain file names, relative to both directories.
    pub files: Vec<String>,
}

/// How often a caller polls a running measurement and when it gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            max_poll_attempts: 200,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub driver_bundle: Option<DriverBundle>,
    #[serde(default)]
    pub poll: PollPolicy,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded runtime configuration from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }
}

/// Extract the driver bundle, once per process.
///
/// Later calls return the directory prepared by the first successful call.
/// A failed extraction leaves the runtime unprepared so it can be retried.
pub fn ensure_ready(bundle: &DriverBundle) -> Result<&'static Path> {
    let target = READY.get_or_try_init(|| extract(bundle))?;
    if target != &bundle.target_dir {
        log::warn!(
            "Driver runtime already prepared in {}, ignoring {}",
            target.display(),
            bundle.target_dir.display()
        );
    }
    Ok(target.as_path())
}

pub fn is_ready() -> bool {
    READY.get().is_some()
}

fn validate_file_name(name: &str) -> Result<()> {
    if Path::new(name).file_name() != Some(OsStr::new(name)) {
        return Err(ArgumentError::InvalidFileName(name.to_string()).into());
    }
    Ok(())
}

/// Copy every bundle file whose target is missing or differs in size.
pub(crate) fn extract(bundle: &DriverBundle) -> Result<PathBuf> {
    if bundle.files.is_empty() {
        return Err(ArgumentError::Empty("driver bundle file list").into());
    }
    for name in &bundle.files {
        validate_file_name(name)?;
    }

    fs::create_dir_all(&bundle.target_dir)?;

    let mut copied = 0;
    for name in &bundle.files {
        let source = bundle.source_dir.join(name);
        let target = bundle.target_dir.join(name);

        let source_len = fs::metadata(&source)?.len();
        let up_to_date = fs::metadata(&target).is_ok_and(|meta| meta.len() == source_len);
        if up_to_date {
            continue;
        }

        log::debug!("Copying {} to {}", source.display(), target.display());
        fs::copy(&source, &target)?;
        copied += 1;
    }

    log::info!(
        "Driver runtime ready in {} ({} of {} files copied)",
        bundle.target_dir.display(),
        copied,
        bundle.files.len()
    );
    Ok(bundle.target_dir.clone())
}
