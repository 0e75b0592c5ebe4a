use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::git_ops::{run_git, validate_commit_id, GitOutput};
use crate::inspector::{parse_remote_listing, RemoteEntry};
use crate::tags::{parse_local_tags, parse_ls_remote_tags, TagRef};

/// Working-copy operations the update executor needs.
pub trait Vcs {
    fn checkout(&self, revision: &str) -> Result<()>;
    fn submodule_update(&self) -> Result<()>;
    fn pull(&self) -> Result<()>;
    fn head_commit(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modified_files(&self) -> Result<Vec<String>> {
        let output = self.git(&["ls-files", "-m"], "repo-inspect-failed")?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }

    pub fn remotes(&self) -> Result<Vec<RemoteEntry>> {
        let output = self.git(&["remote", "-v"], "repo-inspect-failed")?;
        Ok(parse_remote_listing(&output.stdout))
    }

    pub fn has_remote(&self, name: &str) -> Result<bool> {
        Ok(self.remotes()?.iter().any(|remote| remote.name == name))
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.git(&["remote", "add", name, url], "fork-sync-failed")?;
        Ok(())
    }

    pub fn set_remote_url(&self, name: &str, url: &str) -> Result<()> {
        self.git(&["remote", "set-url", name, url], "remote-migrate-failed")?;
        Ok(())
    }

    pub fn fetch(&self, remote: &str) -> Result<()> {
        self.git_logged(&["fetch", remote], "fork-sync-failed")
    }

    pub fn merge(&self, revision: &str) -> Result<()> {
        self.git_logged(&["merge", revision], "fork-sync-failed")
    }

    pub fn local_tags(&self) -> Result<Vec<String>> {
        let output = self.git(&["tag"], "tag-query-failed")?;
        Ok(parse_local_tags(&output.stdout))
    }

    pub fn remote_tags(&self, remote: &str) -> Result<Vec<TagRef>> {
        let output = self.git(&["ls-remote", "--tags", remote], "tag-query-failed")?;
        parse_ls_remote_tags(&output.stdout)
            .with_context(|| format!("tag-query-failed: unreadable tag listing from '{remote}'"))
    }

    fn git(&self, args: &[&str], reason_code: &str) -> Result<GitOutput> {
        run_git(&self.root, args, reason_code)
    }

    fn git_logged(&self, args: &[&str], reason_code: &str) -> Result<()> {
        let output = self.git(args, reason_code)?;
        log_git_output(args, &output);
        Ok(())
    }
}

impl Vcs for GitRepository {
    fn checkout(&self, revision: &str) -> Result<()> {
        self.git_logged(&["checkout", revision], "checkout-failed")
    }

    fn submodule_update(&self) -> Result<()> {
        self.git_logged(&["submodule", "update"], "submodule-update-failed")
    }

    fn pull(&self) -> Result<()> {
        self.git_logged(&["pull"], "pull-failed")
    }

    fn head_commit(&self) -> Result<String> {
        let output = self.git(&["rev-parse", "HEAD"], "repo-inspect-failed")?;
        validate_commit_id(&output.stdout)
            .context("repo-inspect-failed: git rev-parse returned an invalid HEAD id")
    }
}

fn log_git_output(args: &[&str], output: &GitOutput) {
    let command = args.join(" ");
    for line in output.stdout.lines().chain(output.stderr.lines()) {
        let line = line.trim_end();
        if !line.is_empty() {
            info!(git = %command, "{line}");
        }
    }
}
