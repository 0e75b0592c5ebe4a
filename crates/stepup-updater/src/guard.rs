use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::info;

/// Remembers the updater's own modification time so a pull that replaces it can be
/// detected before any migration runs.
#[derive(Debug, Clone)]
pub struct SelfUpdateGuard {
    path: PathBuf,
    baseline: SystemTime,
}

impl SelfUpdateGuard {
    pub fn capture(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let baseline = modified_time(&path)
            .with_context(|| format!("failed to stat updater {}", path.display()))?;
        Ok(Self { path, baseline })
    }

    /// Watches the running binary. A pull only rewrites tracked files, so this fallback
    /// never fires for a compiled updater that lives outside the working copy.
    pub fn for_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("failed to resolve current executable")?;
        Self::capture(exe)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the updater is newer than at capture. A missing updater counts as
    /// changed.
    pub fn updater_changed(&self) -> bool {
        let changed = match modified_time(&self.path) {
            Ok(modified) => modified > self.baseline,
            Err(_) => true,
        };
        if changed {
            info!(path = %self.path.display(), "updater changed on disk");
        }
        changed
    }
}

fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
