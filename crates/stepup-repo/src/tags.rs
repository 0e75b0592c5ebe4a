use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use stepup_core::{ReleaseTag, TagCandidate, VersionTag};
use tracing::{debug, warn};

use crate::validate_commit_id;

const TAG_REF_PREFIX: &str = "refs/tags/";
const PEELED_SUFFIX: &str = "^{}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub commit: String,
}

/// Parses `git ls-remote --tags` output. For annotated tags the peeled `^{}` entry
/// names the tagged commit and replaces the tag object id.
pub fn parse_ls_remote_tags(output: &str) -> Result<Vec<TagRef>> {
    let mut commits: BTreeMap<String, (String, bool)> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let (object_id, reference) = line
            .split_once('\t')
            .with_context(|| format!("malformed ls-remote line: '{line}'"))?;
        let Some(name) = reference.trim().strip_prefix(TAG_REF_PREFIX) else {
            continue;
        };
        let commit = validate_commit_id(object_id)?;
        let (name, peeled) = match name.strip_suffix(PEELED_SUFFIX) {
            Some(name) => (name.to_string(), true),
            None => (name.to_string(), false),
        };

        match commits.get(&name) {
            Some((_, true)) if !peeled => {}
            Some(_) => {
                commits.insert(name, (commit, peeled));
            }
            None => {
                order.push(name.clone());
                commits.insert(name, (commit, peeled));
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|name| {
            let (commit, _) = commits.remove(&name)?;
            Some(TagRef { name, commit })
        })
        .collect())
}

pub fn parse_local_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Keeps tags at or above `current`, ascending. When the newest tag is the current
/// version the result holds that single tag. When `current` is not itself a tag but
/// newer tags exist, `current` is prepended without a commit so that every newer tag
/// becomes an update step.
///
/// Tags are ordered by comparison key unless the key order contradicts the numeric
/// segment order (`v1.9` before `v1.10`); then the whole set is ordered numerically.
pub fn select_upper_candidates<I>(current: &VersionTag, tags: I) -> Result<Vec<TagCandidate>>
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let current_release = ReleaseTag::new(current.clone()).with_context(|| {
        format!("tag-query-failed: installed version '{current}' is not a release version")
    })?;

    let mut by_tag: BTreeMap<VersionTag, Option<String>> = BTreeMap::new();
    for (name, commit) in tags {
        let Ok(tag) = VersionTag::parse(&name) else {
            continue;
        };
        if tag.comparison_key().is_none() {
            debug!(tag = %name, "skipping tag without a release comparison key");
            continue;
        }
        by_tag.insert(tag, commit);
    }

    let mut releases: Vec<TagCandidate> = by_tag
        .into_iter()
        .filter_map(|(tag, commit)| Some(TagCandidate::new(ReleaseTag::new(tag)?, commit)))
        .collect();
    releases.sort_by(|left, right| left.release.cmp(&right.release));

    let numeric = key_order_is_misleading(&releases, &current_release);
    if numeric {
        releases.sort_by(|left, right| left.release.numeric_cmp(&right.release));
    }
    let at_or_above = |release: &ReleaseTag| {
        let ordering = if numeric {
            release.numeric_cmp(&current_release)
        } else {
            release.cmp(&current_release)
        };
        ordering != Ordering::Less
    };

    if let Some(newest) = releases.last() {
        if newest.tag() == current {
            return Ok(vec![newest.clone()]);
        }
    }

    let mut upper: Vec<TagCandidate> = releases
        .into_iter()
        .filter(|candidate| at_or_above(&candidate.release))
        .collect();

    for pair in upper.windows(2) {
        if pair[0].release.collides_with(&pair[1].release) {
            warn!(
                first = %pair[0].tag(),
                second = %pair[1].tag(),
                "release tags share a comparison key; ordering by numeric segments"
            );
        }
    }

    if !upper.is_empty() && !upper.iter().any(|candidate| candidate.tag() == current) {
        upper.insert(0, TagCandidate::new(current_release, None));
    }

    Ok(upper)
}

/// Warns for every adjacent pair, installed version included, whose comparison keys
/// order them against their numeric segments. Returns whether any pair did.
fn key_order_is_misleading(releases: &[TagCandidate], current: &ReleaseTag) -> bool {
    let mut ordered: Vec<&ReleaseTag> =
        releases.iter().map(|candidate| &candidate.release).collect();
    if !ordered.iter().any(|release| release.tag() == current.tag()) {
        ordered.push(current);
        ordered.sort();
    }

    let mut misleading = false;
    for pair in ordered.windows(2) {
        if pair[0].numeric_cmp(pair[1]) == Ordering::Greater {
            warn!(
                lower_key = %pair[0].tag(),
                higher_key = %pair[1].tag(),
                "comparison keys contradict release order; ordering tags by numeric segments"
            );
            misleading = true;
        }
    }
    misleading
}
