use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Repository identifier
// ---------------------------------------------------------------------------

/// A repository to watch, written `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    owner: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoIdError {
    #[error("empty repository identifier")]
    Empty,
    #[error("repository identifier {0:?} is not of the form owner/name")]
    Malformed(String),
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoIdError> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() || owner.contains('/') || name.contains('/') {
            return Err(RepoIdError::Malformed(format!("{owner}/{name}")));
        }
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Web URL of the repository on github.com.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RepoIdError::Empty);
        }
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| RepoIdError::Malformed(s.to_owned()))?;
        Self::new(owner.trim(), name.trim()).map_err(|_| RepoIdError::Malformed(s.to_owned()))
    }
}

impl TryFrom<String> for RepoId {
    type Error = RepoIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoId> for String {
    fn from(value: RepoId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The fixed, ordered set of repositories watched for the process lifetime.
///
/// Duplicates keep the position of their first occurrence.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    repos: IndexSet<RepoId>,
}

impl Registry {
    pub fn new(repos: impl IntoIterator<Item = RepoId>) -> Self {
        Self {
            repos: repos.into_iter().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepoId> {
        self.repos.iter()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn contains(&self, repo: &RepoId) -> bool {
        self.repos.contains(repo)
    }
}

impl FromIterator<RepoId> for Registry {
    fn from_iter<T: IntoIterator<Item = RepoId>>(iter: T) -> Self {
        Self::new(iter)
    }
}
