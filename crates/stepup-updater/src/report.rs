use stepup_core::{RepositoryMode, UpdatePlan, VersionTag};

use crate::executor::ExecutorState;
use crate::process::OutputStream;

/// Progress notifications for whoever is watching an update run.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    ModeDetected(RepositoryMode),
    PlanResolved { current: VersionTag, plan: UpdatePlan },
    StateChanged(ExecutorState),
    SubmoduleUpdateFailed { detail: String },
    ScriptOutput {
        version: VersionTag,
        stream: OutputStream,
        line: String,
    },
    AdditionalUpdate { version: VersionTag },
    RollingBack { version: VersionTag, commit: String },
}

pub trait UpdateReporter {
    fn report(&mut self, event: &UpdateEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl UpdateReporter for SilentReporter {
    fn report(&mut self, _event: &UpdateEvent) {}
}

impl UpdateReporter for Vec<UpdateEvent> {
    fn report(&mut self, event: &UpdateEvent) {
        self.push(event.clone());
    }
}
