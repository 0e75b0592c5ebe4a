use stepup_core::UpdateConfig;
use thiserror::Error;
use tracing::info;

use crate::{GitRepository, Vcs};

#[derive(Debug, Error)]
pub enum ForkSyncError {
    #[error("fork auto-update is disabled: merge the mainline manually")]
    Disabled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Brings a fork's mainline up to date with the canonical repository. Nothing is
/// reverted on failure: a fork's history is owned by its operator.
pub fn sync_fork(repo: &GitRepository, config: &UpdateConfig) -> Result<(), ForkSyncError> {
    if !config.update_fork {
        return Err(ForkSyncError::Disabled);
    }

    ensure_upstream(repo, config)?;

    info!(upstream = %config.upstream, "fetching upstream");
    repo.fetch(&config.upstream)?;
    repo.checkout(&config.mainline_branch)?;

    let upstream_mainline = format!("{}/{}", config.upstream, config.mainline_branch);
    info!(revision = %upstream_mainline, "merging upstream mainline");
    repo.merge(&upstream_mainline)?;
    Ok(())
}

fn ensure_upstream(repo: &GitRepository, config: &UpdateConfig) -> anyhow::Result<()> {
    if repo.has_remote(&config.upstream)? {
        return Ok(());
    }

    info!(
        upstream = %config.upstream,
        url = %config.repository_url,
        "creating upstream remote"
    );
    repo.add_remote(&config.upstream, &config.repository_url)?;
    if !repo.has_remote(&config.upstream)? {
        anyhow::bail!(
            "fork-sync-failed: upstream remote '{}' missing after creation",
            config.upstream
        );
    }
    Ok(())
}
