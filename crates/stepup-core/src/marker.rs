use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::VersionTag;

/// The single durable record of the installed version.
#[derive(Debug, Clone)]
pub struct VersionMarker {
    path: PathBuf,
    baseline: VersionTag,
}

impl VersionMarker {
    pub fn new(path: impl Into<PathBuf>, baseline: VersionTag) -> Self {
        Self {
            path: path.into(),
            baseline,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn peek(&self) -> Result<Option<VersionTag>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "marker-read-failed: failed reading version marker {}",
                        self.path.display()
                    )
                });
            }
        };

        let version = VersionTag::parse(&raw).with_context(|| {
            format!(
                "marker-invalid: version marker {} does not hold a version",
                self.path.display()
            )
        })?;
        Ok(Some(version))
    }

    /// Reads the marker, persisting the baseline first when it does not exist yet.
    pub fn read_or_init(&self) -> Result<VersionTag> {
        if let Some(version) = self.peek()? {
            return Ok(version);
        }

        info!(
            path = %self.path.display(),
            version = %self.baseline,
            "initialising missing version marker"
        );
        self.write(&self.baseline)?;
        Ok(self.baseline.clone())
    }

    pub fn write(&self, version: &VersionTag) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "marker-write-failed: failed creating {}",
                    parent.display()
                )
            })?;
        }

        let staged = self.path.with_extension("tmp");
        fs::write(&staged, version.as_str()).with_context(|| {
            format!(
                "marker-write-failed: failed writing staged marker {}",
                staged.display()
            )
        })?;
        if let Err(err) = fs::rename(&staged, &self.path) {
            let _ = fs::remove_file(&staged);
            return Err(err).with_context(|| {
                format!(
                    "marker-write-failed: failed replacing version marker {}",
                    self.path.display()
                )
            });
        }
        Ok(())
    }
}
