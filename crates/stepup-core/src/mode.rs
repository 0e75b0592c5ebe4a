use std::fmt;

use serde::{Deserialize, Serialize};

/// Derived from the configured remotes on every run; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryMode {
    Clone,
    Fork,
}

impl RepositoryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Fork => "fork",
        }
    }

    /// Forks own their history, so a failed step is never reverted automatically.
    pub fn supports_rollback(self) -> bool {
        matches!(self, Self::Clone)
    }
}

impl fmt::Display for RepositoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
