mod executor;
mod guard;
mod lock;
mod migration;
mod orchestrator;
mod outcome;
mod process;
mod report;

pub use executor::{ExecutorState, UpdateExecutor};
pub use guard::SelfUpdateGuard;
pub use lock::UpdateLock;
pub use migration::{MigrationInvocation, MigrationKind, ScriptRunner};
pub use orchestrator::{Orchestrator, PlanReport, UpdateRequest};
pub use outcome::{RollbackResult, UpdateError, UpdateOutcome};
pub use process::{run_streaming, OutputStream, ProcessExit, ProcessReport};
pub use report::{SilentReporter, UpdateEvent, UpdateReporter};
