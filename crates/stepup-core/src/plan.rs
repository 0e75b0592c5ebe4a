use serde::Serialize;

use crate::{ReleaseTag, VersionTag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCandidate {
    pub release: ReleaseTag,
    pub commit: Option<String>,
}

impl TagCandidate {
    pub fn new(release: ReleaseTag, commit: Option<String>) -> Self {
        Self { release, commit }
    }

    pub fn tag(&self) -> &VersionTag {
        self.release.tag()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStep {
    pub target: VersionTag,
    pub rollback_anchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Nothing newer than the installed version.
    Current {
        version: VersionTag,
        commit: Option<String>,
    },
    Upgrade {
        from: VersionTag,
        steps: Vec<UpdateStep>,
    },
}

impl UpdatePlan {
    /// Pairs each candidate after the first with the previous candidate's commit.
    /// `candidates` must already be in ascending release order.
    pub fn from_candidates(current: &VersionTag, candidates: &[TagCandidate]) -> Self {
        match candidates {
            [] => Self::Current {
                version: current.clone(),
                commit: None,
            },
            [only] => Self::Current {
                version: only.tag().clone(),
                commit: only.commit.clone(),
            },
            [first, rest @ ..] => {
                let mut previous_commit = first.commit.clone();
                let steps = rest
                    .iter()
                    .map(|candidate| {
                        let step = UpdateStep {
                            target: candidate.tag().clone(),
                            rollback_anchor: previous_commit.take(),
                        };
                        previous_commit = candidate.commit.clone();
                        step
                    })
                    .collect();
                Self::Upgrade {
                    from: first.tag().clone(),
                    steps,
                }
            }
        }
    }

    pub fn is_current(&self) -> bool {
        matches!(self, Self::Current { .. })
    }

    pub fn steps(&self) -> &[UpdateStep] {
        match self {
            Self::Current { .. } => &[],
            Self::Upgrade { steps, .. } => steps,
        }
    }

    pub fn latest(&self) -> &VersionTag {
        match self {
            Self::Current { version, .. } => version,
            Self::Upgrade { from, steps } => steps.last().map(|step| &step.target).unwrap_or(from),
        }
    }
}
