use std::cmp::Ordering;
use std::fmt;

use anyhow::Result;
use semver::Version;
use serde::{Serialize, Serializer};

pub const DEFAULT_BASELINE_VERSION: &str = "v1.4";

/// A released version label, always stored with its `v` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionTag {
    raw: String,
}

impl VersionTag {
    /// Parses marker or tag text: spaces are dropped, only the first line is kept and
    /// the `v` prefix is enforced.
    pub fn parse(input: &str) -> Result<Self> {
        let compact: String = input.chars().filter(|ch| *ch != ' ').collect();
        let first_line = compact.lines().next().unwrap_or_default().trim();
        if first_line.is_empty() {
            anyhow::bail!("invalid version tag: must not be empty");
        }

        let bare = first_line.strip_prefix('v').unwrap_or(first_line);
        if bare.is_empty() {
            anyhow::bail!("invalid version tag: '{first_line}'");
        }

        Ok(Self {
            raw: format!("v{bare}"),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn bare(&self) -> &str {
        &self.raw[1..]
    }

    /// Legacy comparison key: everything after the first dot is collapsed into one
    /// trailing group and the result is read as a decimal (`v1.4.2` -> `1.42`).
    /// Returns `None` for pre-release or malformed tags.
    pub fn comparison_key(&self) -> Option<f64> {
        let collapsed = collapse_minor_segments(self.bare());
        if !collapsed.chars().any(|ch| ch.is_ascii_digit()) {
            return None;
        }

        let mut seen_dot = false;
        for ch in collapsed.chars() {
            match ch {
                '0'..='9' => {}
                '.' if !seen_dot => seen_dot = true,
                _ => return None,
            }
        }

        collapsed.parse::<f64>().ok()
    }

    pub fn segments(&self) -> Option<Vec<u64>> {
        self.bare()
            .split('.')
            .map(|segment| segment.parse::<u64>().ok())
            .collect()
    }

    /// `major.minor[.patch]` tags padded into a semver value.
    pub fn precise_version(&self) -> Option<Version> {
        let segments = self.segments()?;
        match segments.as_slice() {
            [major] => Some(Version::new(*major, 0, 0)),
            [major, minor] => Some(Version::new(*major, *minor, 0)),
            [major, minor, patch] => Some(Version::new(*major, *minor, *patch)),
            _ => None,
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for VersionTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

fn collapse_minor_segments(bare: &str) -> String {
    match bare.split_once('.') {
        Some((major, rest)) => format!("{major}.{}", rest.replace('.', "")),
        None => bare.to_string(),
    }
}

/// A tag whose comparison key parsed; ordered by key, then by its full numeric segments.
#[derive(Debug, Clone)]
pub struct ReleaseTag {
    tag: VersionTag,
    key: f64,
}

impl ReleaseTag {
    pub fn new(tag: VersionTag) -> Option<Self> {
        let key = tag.comparison_key()?;
        Some(Self { tag, key })
    }

    pub fn tag(&self) -> &VersionTag {
        &self.tag
    }

    pub fn into_tag(self) -> VersionTag {
        self.tag
    }

    pub fn key(&self) -> f64 {
        self.key
    }

    /// Release order by numeric segments alone, ignoring the comparison key.
    pub fn numeric_cmp(&self, other: &ReleaseTag) -> Ordering {
        tie_break(&self.tag, &other.tag)
    }

    /// Two distinct tags sharing a comparison key, e.g. `v1.10` and `v1.1.0`.
    pub fn collides_with(&self, other: &ReleaseTag) -> bool {
        self.key.total_cmp(&other.key) == Ordering::Equal && self.tag != other.tag
    }
}

impl PartialEq for ReleaseTag {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseTag {}

impl PartialOrd for ReleaseTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| tie_break(&self.tag, &other.tag))
    }
}

fn tie_break(left: &VersionTag, right: &VersionTag) -> Ordering {
    if let (Some(left), Some(right)) = (left.precise_version(), right.precise_version()) {
        let ordering = left.cmp(&right);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    if let (Some(left), Some(right)) = (left.segments(), right.segments()) {
        let ordering = left.cmp(&right);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.as_str().cmp(right.as_str())
}
