use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

pub(crate) fn base_git_command() -> Command {
    let mut command = Command::new("git");
    command
        .arg("-c")
        .arg("core.autocrlf=false")
        .arg("-c")
        .arg("core.eol=lf");
    if cfg!(windows) {
        command.arg("-c").arg("core.longpaths=true");
    }
    command
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GitOutput {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

pub(crate) fn run_git(repo_root: &Path, args: &[&str], reason_code: &str) -> Result<GitOutput> {
    debug!(repo = %repo_root.display(), "git {}", args.join(" "));
    let output = base_git_command()
        .args(args)
        .current_dir(repo_root)
        .output()
        .with_context(|| format!("{reason_code}: failed launching git {}", args.join(" ")))?;
    if !output.status.success() {
        anyhow::bail!(
            "{reason_code}: git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(GitOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Accepts abbreviated or full hex object ids.
pub fn validate_commit_id(commit: &str) -> Result<String> {
    let normalized = commit.trim();
    if normalized.len() < 7 {
        anyhow::bail!("git commit id too short: '{normalized}'");
    }
    if !normalized.chars().all(|ch| ch.is_ascii_hexdigit()) {
        anyhow::bail!("git commit id contains non-hex characters: '{normalized}'");
    }

    Ok(normalized.to_ascii_lowercase())
}
