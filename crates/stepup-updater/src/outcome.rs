use std::path::PathBuf;

use stepup_core::{RepositoryMode, VersionTag};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    AlreadyCurrent {
        version: VersionTag,
        additional_update_ran: bool,
    },
    Updated {
        from: VersionTag,
        to: VersionTag,
        applied: Vec<VersionTag>,
    },
    /// The pull replaced the updater; the caller must start it again.
    RelaunchRequested { updater: PathBuf },
}

impl UpdateOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AlreadyCurrent { .. } | Self::Updated { .. } => 0,
            Self::RelaunchRequested { .. } => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackResult {
    RolledBack { commit: String },
    Failed { commit: Option<String>, detail: String },
    /// Fork mode leaves the working copy where the failure happened.
    NotAttempted,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("auto-update-disabled: automatic updates are off; rerun with --manual")]
    AutoUpdateDisabled,

    #[error("{0:#}")]
    Locked(anyhow::Error),

    #[error("{0:#}")]
    Config(anyhow::Error),

    #[error("{0:#}")]
    Inspection(anyhow::Error),

    #[error(
        "uncommitted-changes: commit or stash local modifications first: {}",
        .files.join(", ")
    )]
    DirtyWorkingCopy { files: Vec<String> },

    #[error("fork-update-disabled: this installation is a fork; merge the upstream mainline manually or enable update_fork")]
    ForkUpdateDisabled,

    #[error("{0:#}")]
    ForkSync(anyhow::Error),

    #[error("{0:#}")]
    Resolve(anyhow::Error),

    #[error("{0:#}")]
    Fetch(anyhow::Error),

    #[error("additional-update-failed: additional update for {version} failed: {detail}")]
    AdditionalUpdateFailed { version: VersionTag, detail: String },

    #[error("step-failed: migration to {version} failed ({mode} mode, installed version stays {checkpoint}): {detail}")]
    StepFailed {
        version: VersionTag,
        mode: RepositoryMode,
        checkpoint: VersionTag,
        detail: String,
        rollback: RollbackResult,
    },

    #[error("checkpoint-failed: migration to {version} succeeded but the marker was not written: {detail}")]
    Checkpoint { version: VersionTag, detail: String },
}

impl UpdateError {
    /// Failures while applying migrations exit 1; every precondition or repository
    /// failure before the first migration exits 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AdditionalUpdateFailed { .. }
            | Self::StepFailed { .. }
            | Self::Checkpoint { .. } => 1,
            _ => 2,
        }
    }
}
