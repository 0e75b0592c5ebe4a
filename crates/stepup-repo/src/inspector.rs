use anyhow::Result;
use stepup_core::{RepositoryMode, UpdateConfig};
use tracing::{info, warn};

use crate::GitRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub url: String,
}

/// Parses `git remote -v`; fetch and push lines for the same remote collapse into one entry.
pub fn parse_remote_listing(output: &str) -> Vec<RemoteEntry> {
    let mut entries: Vec<RemoteEntry> = Vec::new();
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let (Some(name), Some(url)) = (fields.next(), fields.next()) else {
            continue;
        };
        if entries
            .iter()
            .any(|entry| entry.name == name && entry.url == url)
        {
            continue;
        }
        entries.push(RemoteEntry {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    entries
}

/// Compares remote URLs ignoring a trailing slash or `.git` suffix.
pub fn urls_match(left: &str, right: &str) -> bool {
    normalize_url(left) == normalize_url(right)
}

fn normalize_url(url: &str) -> &str {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed.strip_suffix(".git").unwrap_or(trimmed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    Canonical,
    /// Points at a retired repository location.
    Legacy,
    Other,
}

impl OriginKind {
    pub fn mode(self) -> RepositoryMode {
        match self {
            Self::Canonical | Self::Legacy => RepositoryMode::Clone,
            Self::Other => RepositoryMode::Fork,
        }
    }
}

pub struct RepositoryInspector<'a> {
    repo: &'a GitRepository,
    config: &'a UpdateConfig,
}

impl<'a> RepositoryInspector<'a> {
    pub fn new(repo: &'a GitRepository, config: &'a UpdateConfig) -> Self {
        Self { repo, config }
    }

    /// Modified tracked files outside the exempt top-level directories.
    pub fn uncommitted_changes(&self) -> Result<Vec<String>> {
        let modified = self.repo.modified_files()?;
        Ok(modified
            .into_iter()
            .filter(|path| !self.is_exempt(path))
            .collect())
    }

    pub fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(!self.uncommitted_changes()?.is_empty())
    }

    /// Classifies the origin remote without touching the repository.
    pub fn classify_origin(&self) -> Result<OriginKind> {
        let remotes = self.repo.remotes()?;
        let origin_urls: Vec<&str> = remotes
            .iter()
            .filter(|remote| remote.name == self.config.origin)
            .map(|remote| remote.url.as_str())
            .collect();

        if origin_urls
            .iter()
            .any(|url| urls_match(url, &self.config.repository_url))
        {
            return Ok(OriginKind::Canonical);
        }

        let points_at_legacy = origin_urls.iter().any(|url| {
            self.config
                .legacy_repository_urls
                .iter()
                .any(|legacy| urls_match(url, legacy))
        });
        if points_at_legacy {
            return Ok(OriginKind::Legacy);
        }
        Ok(OriginKind::Other)
    }

    /// Like [`Self::classify_origin`], but rewrites a legacy origin to the canonical
    /// URL. A clone whose remote cannot be rewritten is handled as a fork.
    pub fn detect_mode(&self) -> Result<RepositoryMode> {
        match self.classify_origin()? {
            OriginKind::Canonical => {
                info!(mode = "clone", url = %self.config.repository_url, "repository is a clone");
                Ok(RepositoryMode::Clone)
            }
            OriginKind::Legacy => {
                info!(
                    remote = %self.config.origin,
                    url = %self.config.repository_url,
                    "migrating legacy remote url"
                );
                match self
                    .repo
                    .set_remote_url(&self.config.origin, &self.config.repository_url)
                {
                    Ok(()) => Ok(RepositoryMode::Clone),
                    Err(err) => {
                        warn!(
                            error = %format!("{err:#}"),
                            "legacy remote migration failed, treating repository as a fork"
                        );
                        Ok(RepositoryMode::Fork)
                    }
                }
            }
            OriginKind::Other => {
                info!(mode = "fork", "repository is a fork");
                Ok(RepositoryMode::Fork)
            }
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        let top_level = path.split('/').next().unwrap_or_default();
        self.config
            .exempt_paths
            .iter()
            .any(|exempt| exempt.trim_matches('/') == top_level)
    }
}
