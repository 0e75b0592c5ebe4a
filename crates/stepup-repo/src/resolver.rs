use anyhow::Result;
use stepup_core::{
    RepositoryMode, TagCandidate, UpdateConfig, UpdatePlan, VersionMarker, VersionTag,
};
use tracing::info;

use crate::{select_upper_candidates, GitRepository};

pub struct VersionResolver<'a> {
    repo: &'a GitRepository,
    config: &'a UpdateConfig,
    marker: &'a VersionMarker,
}

impl<'a> VersionResolver<'a> {
    pub fn new(
        repo: &'a GitRepository,
        config: &'a UpdateConfig,
        marker: &'a VersionMarker,
    ) -> Self {
        Self {
            repo,
            config,
            marker,
        }
    }

    pub fn current_version(&self) -> Result<VersionTag> {
        self.marker.read_or_init()
    }

    /// Clone mode reads the remote tag registry and keeps commits for rollback; fork
    /// mode reads the merged local tags and carries no commits.
    pub fn upper_tags(
        &self,
        current: &VersionTag,
        mode: RepositoryMode,
    ) -> Result<Vec<TagCandidate>> {
        match mode {
            RepositoryMode::Clone => {
                let refs = self.repo.remote_tags(&self.config.origin)?;
                select_upper_candidates(
                    current,
                    refs.into_iter().map(|tag| (tag.name, Some(tag.commit))),
                )
            }
            RepositoryMode::Fork => {
                let names = self.repo.local_tags()?;
                select_upper_candidates(current, names.into_iter().map(|name| (name, None)))
            }
        }
    }

    pub fn resolve(&self, mode: RepositoryMode) -> Result<(VersionTag, UpdatePlan)> {
        let current = self.current_version()?;
        let candidates = self.upper_tags(&current, mode)?;
        let plan = UpdatePlan::from_candidates(&current, &candidates);
        info!(
            current = %current,
            latest = %plan.latest(),
            steps = plan.steps().len(),
            mode = %mode,
            "resolved update plan"
        );
        Ok((current, plan))
    }
}
