mod fork_sync;
mod git_ops;
mod inspector;
mod repository;
mod resolver;
mod tags;

pub use fork_sync::{sync_fork, ForkSyncError};
pub use git_ops::validate_commit_id;
pub use inspector::{
    parse_remote_listing, urls_match, OriginKind, RemoteEntry, RepositoryInspector,
};
pub use repository::{GitRepository, Vcs};
pub use resolver::VersionResolver;
pub use tags::{parse_local_tags, parse_ls_remote_tags, select_upper_candidates, TagRef};
