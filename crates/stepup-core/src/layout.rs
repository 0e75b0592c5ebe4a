use std::path::{Path, PathBuf};

use crate::VersionTag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    home: PathBuf,
}

impl InstallLayout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn configs_dir(&self) -> PathBuf {
        self.home.join("configs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.configs_dir().join("update.toml")
    }

    pub fn update_dir(&self) -> PathBuf {
        self.home.join("update")
    }

    pub fn current_version_path(&self) -> PathBuf {
        self.update_dir().join("current_version")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.update_dir().join(".stepup.lock")
    }

    pub fn version_dir(&self, version: &VersionTag) -> PathBuf {
        self.update_dir().join(version.as_str())
    }

    pub fn version_update_script(&self, version: &VersionTag) -> PathBuf {
        self.version_dir(version).join("Update.sh")
    }

    pub fn additional_update_script(&self, version: &VersionTag) -> PathBuf {
        self.version_dir(version).join("additional_update.sh")
    }

    pub fn default_update_script(&self) -> PathBuf {
        self.update_dir().join("default_update").join("Update.sh")
    }
}
