mod config;
mod layout;
mod marker;
mod mode;
mod plan;
mod version;

pub use config::{Settings, UpdateConfig, DEFAULT_REPOSITORY_URL};
pub use layout::InstallLayout;
pub use marker::VersionMarker;
pub use mode::RepositoryMode;
pub use plan::{TagCandidate, UpdatePlan, UpdateStep};
pub use version::{ReleaseTag, VersionTag, DEFAULT_BASELINE_VERSION};
