use std::fmt;

use stepup_core::{RepositoryMode, UpdateConfig, UpdatePlan, UpdateStep, VersionMarker, VersionTag};
use stepup_repo::Vcs;
use tracing::{error, info, warn};

use crate::guard::SelfUpdateGuard;
use crate::migration::{MigrationInvocation, ScriptRunner};
use crate::outcome::{RollbackResult, UpdateError, UpdateOutcome};
use crate::process::OutputStream;
use crate::report::{UpdateEvent, UpdateReporter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    FetchingLatest,
    ApplyingStep { index: usize, version: VersionTag },
    Checkpointed { index: usize, version: VersionTag },
    Aborting,
    Done,
    RelaunchRequested,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::FetchingLatest => f.write_str("fetching-latest"),
            Self::ApplyingStep { index, version } => write!(f, "applying-step[{index}] {version}"),
            Self::Checkpointed { index, version } => write!(f, "checkpointed[{index}] {version}"),
            Self::Aborting => f.write_str("aborting"),
            Self::Done => f.write_str("done"),
            Self::RelaunchRequested => f.write_str("relaunch-requested"),
        }
    }
}

/// Brings the working copy to the latest mainline and applies an [`UpdatePlan`] one
/// version at a time. The marker is rewritten after every successful step, so a failed
/// run leaves it at the last version whose migration completed.
pub struct UpdateExecutor<'a, V: Vcs> {
    vcs: &'a V,
    config: &'a UpdateConfig,
    marker: &'a VersionMarker,
    guard: &'a SelfUpdateGuard,
    scripts: &'a ScriptRunner,
    mode: RepositoryMode,
    state: ExecutorState,
}

impl<'a, V: Vcs> UpdateExecutor<'a, V> {
    pub fn new(
        vcs: &'a V,
        config: &'a UpdateConfig,
        marker: &'a VersionMarker,
        guard: &'a SelfUpdateGuard,
        scripts: &'a ScriptRunner,
        mode: RepositoryMode,
    ) -> Self {
        Self {
            vcs,
            config,
            marker,
            guard,
            scripts,
            mode,
            state: ExecutorState::Idle,
        }
    }

    pub fn state(&self) -> &ExecutorState {
        &self.state
    }

    pub fn run(
        &mut self,
        plan: &UpdatePlan,
        reporter: &mut dyn UpdateReporter,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.transition(ExecutorState::FetchingLatest, reporter);
        let pre_pull_head = match self.fetch_latest(reporter) {
            Ok(head) => head,
            Err(err) => {
                self.transition(ExecutorState::Aborting, reporter);
                return Err(UpdateError::Fetch(err));
            }
        };

        if self.guard.updater_changed() {
            self.transition(ExecutorState::RelaunchRequested, reporter);
            return Ok(UpdateOutcome::RelaunchRequested {
                updater: self.guard.path().to_path_buf(),
            });
        }

        let outcome = match plan {
            UpdatePlan::Current { version, .. } => self.finish_current(version, reporter)?,
            UpdatePlan::Upgrade { from, steps } => {
                self.apply_steps(from, steps, pre_pull_head, reporter)?
            }
        };
        self.transition(ExecutorState::Done, reporter);
        Ok(outcome)
    }

    /// Returns the HEAD commit from before the pull, used as the rollback target when
    /// the installed version has no tag of its own.
    fn fetch_latest(&self, reporter: &mut dyn UpdateReporter) -> anyhow::Result<Option<String>> {
        self.vcs.checkout(&self.config.mainline_branch)?;
        let head = match self.vcs.head_commit() {
            Ok(commit) => Some(commit),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "could not record HEAD before pulling");
                None
            }
        };

        if let Err(err) = self.vcs.submodule_update() {
            let detail = format!("{err:#}");
            warn!(error = %detail, "submodule update failed, continuing");
            reporter.report(&UpdateEvent::SubmoduleUpdateFailed { detail });
        }

        self.vcs.pull()?;
        Ok(head)
    }

    fn finish_current(
        &mut self,
        version: &VersionTag,
        reporter: &mut dyn UpdateReporter,
    ) -> Result<UpdateOutcome, UpdateError> {
        let Some(invocation) = self.scripts.additional_invocation(version) else {
            info!(version = %version, "already on the latest version");
            return Ok(UpdateOutcome::AlreadyCurrent {
                version: version.clone(),
                additional_update_ran: false,
            });
        };

        reporter.report(&UpdateEvent::AdditionalUpdate {
            version: version.clone(),
        });
        if let Err(detail) = self.run_script(&invocation, version, reporter) {
            self.transition(ExecutorState::Aborting, reporter);
            error!(version = %version, error = %detail, "additional update failed");
            return Err(UpdateError::AdditionalUpdateFailed {
                version: version.clone(),
                detail,
            });
        }

        Ok(UpdateOutcome::AlreadyCurrent {
            version: version.clone(),
            additional_update_ran: true,
        })
    }

    fn apply_steps(
        &mut self,
        from: &VersionTag,
        steps: &[UpdateStep],
        pre_pull_head: Option<String>,
        reporter: &mut dyn UpdateReporter,
    ) -> Result<UpdateOutcome, UpdateError> {
        let mut checkpoint = from.clone();
        let mut applied = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let version = step.target.clone();
            self.transition(
                ExecutorState::ApplyingStep {
                    index,
                    version: version.clone(),
                },
                reporter,
            );

            let invocation = self.scripts.step_invocation(&version);
            if let Err(detail) = self.run_script(&invocation, &version, reporter) {
                self.transition(ExecutorState::Aborting, reporter);
                error!(version = %version, mode = %self.mode, error = %detail, "migration failed");

                let rollback = if self.mode.supports_rollback() {
                    let anchor = match (&step.rollback_anchor, index) {
                        (Some(commit), _) => Some(commit.clone()),
                        (None, 0) => pre_pull_head.clone(),
                        (None, _) => None,
                    };
                    self.roll_back(&version, anchor, reporter)
                } else {
                    RollbackResult::NotAttempted
                };

                return Err(UpdateError::StepFailed {
                    version,
                    mode: self.mode,
                    checkpoint,
                    detail,
                    rollback,
                });
            }

            if let Err(err) = self.marker.write(&version) {
                self.transition(ExecutorState::Aborting, reporter);
                return Err(UpdateError::Checkpoint {
                    version,
                    detail: format!("{err:#}"),
                });
            }
            checkpoint = version.clone();
            applied.push(version.clone());
            self.transition(ExecutorState::Checkpointed { index, version }, reporter);
        }

        Ok(UpdateOutcome::Updated {
            from: from.clone(),
            to: checkpoint,
            applied,
        })
    }

    fn roll_back(
        &self,
        version: &VersionTag,
        anchor: Option<String>,
        reporter: &mut dyn UpdateReporter,
    ) -> RollbackResult {
        let Some(commit) = anchor else {
            warn!(
                version = %version,
                "no commit recorded for the previous version, cannot roll back"
            );
            return RollbackResult::Failed {
                commit: None,
                detail: "no commit is recorded for the previous version".to_string(),
            };
        };

        info!(version = %version, commit = %commit, "rolling back working copy");
        reporter.report(&UpdateEvent::RollingBack {
            version: version.clone(),
            commit: commit.clone(),
        });
        match self.vcs.checkout(&commit) {
            Ok(()) => RollbackResult::RolledBack { commit },
            Err(err) => {
                let detail = format!("{err:#}");
                error!(commit = %commit, error = %detail, "rollback failed");
                RollbackResult::Failed {
                    commit: Some(commit),
                    detail,
                }
            }
        }
    }

    fn run_script(
        &self,
        invocation: &MigrationInvocation,
        version: &VersionTag,
        reporter: &mut dyn UpdateReporter,
    ) -> Result<(), String> {
        let mut forward = |stream: OutputStream, line: &str| {
            reporter.report(&UpdateEvent::ScriptOutput {
                version: version.clone(),
                stream,
                line: line.to_string(),
            });
        };
        match self.scripts.run(invocation, version, &mut forward) {
            Ok(report) if report.exit.success() => Ok(()),
            Ok(report) => Err(report.describe_failure()),
            Err(err) => Err(format!("{err:#}")),
        }
    }

    fn transition(&mut self, next: ExecutorState, reporter: &mut dyn UpdateReporter) {
        info!(from = %self.state, to = %next, "update state changed");
        self.state = next.clone();
        reporter.report(&UpdateEvent::StateChanged(next));
    }
}
