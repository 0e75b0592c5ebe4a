use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use stepup_core::{InstallLayout, VersionTag};
use tracing::info;

use crate::process::{run_streaming, OutputStream, ProcessReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// `update/<version>/Update.sh`
    VersionSpecific,
    /// `update/default_update/Update.sh`, called with the target version.
    Default,
    /// `update/<version>/additional_update.sh`
    Additional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInvocation {
    pub kind: MigrationKind,
    pub script: PathBuf,
    pub args: Vec<String>,
}

/// Runs migration scripts under `bash` from the install home.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    layout: InstallLayout,
    timeout: Option<Duration>,
}

impl ScriptRunner {
    pub fn new(layout: InstallLayout, timeout: Option<Duration>) -> Self {
        Self { layout, timeout }
    }

    pub fn step_invocation(&self, target: &VersionTag) -> MigrationInvocation {
        let script = self.layout.version_update_script(target);
        if script.is_file() {
            return MigrationInvocation {
                kind: MigrationKind::VersionSpecific,
                script,
                args: Vec::new(),
            };
        }
        MigrationInvocation {
            kind: MigrationKind::Default,
            script: self.layout.default_update_script(),
            args: vec![target.to_string()],
        }
    }

    pub fn additional_invocation(&self, version: &VersionTag) -> Option<MigrationInvocation> {
        let script = self.layout.additional_update_script(version);
        script.is_file().then(|| MigrationInvocation {
            kind: MigrationKind::Additional,
            script,
            args: Vec::new(),
        })
    }

    pub fn run(
        &self,
        invocation: &MigrationInvocation,
        target: &VersionTag,
        on_line: &mut dyn FnMut(OutputStream, &str),
    ) -> Result<ProcessReport> {
        info!(
            script = %invocation.script.display(),
            kind = ?invocation.kind,
            version = %target,
            "running migration script"
        );
        let mut command = Command::new("bash");
        command
            .arg(&invocation.script)
            .args(&invocation.args)
            .current_dir(self.layout.home())
            .env("STEPUP_HOME", self.layout.home())
            .env("STEPUP_TARGET_VERSION", target.as_str());
        run_streaming(&mut command, self.timeout, on_line)
    }
}
