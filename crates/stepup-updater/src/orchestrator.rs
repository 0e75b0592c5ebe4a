use std::path::PathBuf;

use serde::Serialize;
use stepup_core::{
    InstallLayout, RepositoryMode, UpdateConfig, UpdatePlan, UpdateStep, VersionMarker, VersionTag,
};
use stepup_repo::{
    sync_fork, ForkSyncError, GitRepository, RepositoryInspector, VersionResolver,
};
use tracing::info;

use crate::executor::UpdateExecutor;
use crate::guard::SelfUpdateGuard;
use crate::lock::UpdateLock;
use crate::migration::ScriptRunner;
use crate::outcome::{UpdateError, UpdateOutcome};
use crate::report::{UpdateEvent, UpdateReporter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Operator-initiated; bypasses `auto_update = false`.
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub current: VersionTag,
    pub mode: RepositoryMode,
    pub latest: VersionTag,
    pub steps: Vec<UpdateStep>,
}

pub struct Orchestrator {
    layout: InstallLayout,
    config: UpdateConfig,
}

impl Orchestrator {
    pub fn new(layout: InstallLayout, config: UpdateConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// The configured updater path, relative paths taken from the install home.
    pub fn updater_path(&self) -> Option<PathBuf> {
        self.config
            .updater_path
            .as_ref()
            .map(|path| self.layout.home().join(path))
    }

    /// Reads the installed version, writing the baseline when no marker exists yet.
    pub fn current_version(&self) -> Result<VersionTag, UpdateError> {
        self.marker()?.read_or_init().map_err(UpdateError::Config)
    }

    /// Resolves what a run would do without pulling or syncing.
    pub fn plan(&self) -> Result<PlanReport, UpdateError> {
        let repo = GitRepository::open(self.layout.home());
        let mode = RepositoryInspector::new(&repo, &self.config)
            .classify_origin()
            .map_err(UpdateError::Inspection)?
            .mode();
        let current = self.current_version()?;
        let marker = self.marker()?;
        let candidates = VersionResolver::new(&repo, &self.config, &marker)
            .upper_tags(&current, mode)
            .map_err(UpdateError::Resolve)?;
        let plan = UpdatePlan::from_candidates(&current, &candidates);

        Ok(PlanReport {
            latest: plan.latest().clone(),
            steps: plan.steps().to_vec(),
            current,
            mode,
        })
    }

    pub fn run(
        &self,
        request: UpdateRequest,
        guard: &SelfUpdateGuard,
        reporter: &mut dyn UpdateReporter,
    ) -> Result<UpdateOutcome, UpdateError> {
        if !(self.config.auto_update || request.manual) {
            return Err(UpdateError::AutoUpdateDisabled);
        }

        let _lock = UpdateLock::acquire(&self.layout.lock_path()).map_err(UpdateError::Locked)?;
        let repo = GitRepository::open(self.layout.home());
        let inspector = RepositoryInspector::new(&repo, &self.config);

        let files = inspector
            .uncommitted_changes()
            .map_err(UpdateError::Inspection)?;
        if !files.is_empty() {
            return Err(UpdateError::DirtyWorkingCopy { files });
        }

        let mode = inspector.detect_mode().map_err(UpdateError::Inspection)?;
        reporter.report(&UpdateEvent::ModeDetected(mode));
        if mode == RepositoryMode::Fork {
            sync_fork(&repo, &self.config).map_err(|err| match err {
                ForkSyncError::Disabled => UpdateError::ForkUpdateDisabled,
                ForkSyncError::Failed(err) => UpdateError::ForkSync(err),
            })?;
        }

        let marker = self.marker()?;
        let (current, plan) = VersionResolver::new(&repo, &self.config, &marker)
            .resolve(mode)
            .map_err(UpdateError::Resolve)?;
        reporter.report(&UpdateEvent::PlanResolved {
            current,
            plan: plan.clone(),
        });

        let scripts = ScriptRunner::new(self.layout.clone(), self.config.step_timeout());
        let outcome = UpdateExecutor::new(&repo, &self.config, &marker, guard, &scripts, mode)
            .run(&plan, reporter)?;
        info!(exit_code = outcome.exit_code(), "update run finished");
        Ok(outcome)
    }

    fn marker(&self) -> Result<VersionMarker, UpdateError> {
        let baseline = self.config.baseline().map_err(UpdateError::Config)?;
        Ok(VersionMarker::new(
            self.layout.current_version_path(),
            baseline,
        ))
    }
}
