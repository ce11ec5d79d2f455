use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::engine::{QueryError, ReleaseSource};
use crate::github::rate_limit::is_rate_limited;
use crate::types::{Release, RepoId};

// ---------------------------------------------------------------------------
// REST payload
// ---------------------------------------------------------------------------

/// The subset of `GET /repos/{owner}/{repo}/releases` items we use.
#[derive(Debug, Deserialize)]
struct ApiRelease {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    login: String,
}

#[derive(Serialize)]
struct ListParams {
    per_page: u8,
}

/// Convert a REST release into the domain type. Drafts and releases without
/// any timestamp are dropped.
fn into_domain(repo: &RepoId, r: ApiRelease) -> Option<Release> {
    if r.draft {
        return None;
    }
    let Some(published_at) = r.published_at.or(r.created_at) else {
        tracing::debug!(%repo, tag = %r.tag_name, "skipping release without timestamp");
        return None;
    };
    Some(Release {
        repo: repo.clone(),
        tag: r.tag_name,
        name: r.name.unwrap_or_default(),
        body: r.body.unwrap_or_default(),
        url: r.html_url,
        author: r.author.map(|a| a.login),
        prerelease: r.prerelease,
        published_at,
    })
}

fn into_query_error(repo: &RepoId, err: octocrab::Error) -> QueryError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            if source.status_code == StatusCode::NOT_FOUND {
                QueryError::NotFound(repo.clone())
            } else if is_rate_limited(source.status_code, &source.message) {
                QueryError::RateLimited {
                    repo: repo.clone(),
                    message: source.message.clone(),
                }
            } else {
                QueryError::Api {
                    repo: repo.clone(),
                    message: format!("{} ({})", source.message, source.status_code),
                }
            }
        }
        other => QueryError::Api {
            repo: repo.clone(),
            message: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Release source
// ---------------------------------------------------------------------------

/// Lists releases through the GitHub REST API.
#[derive(Clone)]
pub struct GitHubReleases {
    octocrab: Arc<Octocrab>,
    per_page: u8,
}

impl GitHubReleases {
    pub fn new(octocrab: Octocrab, per_page: u8) -> Self {
        Self {
            octocrab: Arc::new(octocrab),
            per_page: per_page.clamp(1, 100),
        }
    }
}

impl ReleaseSource for GitHubReleases {
    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>, QueryError> {
        let route = format!("/repos/{}/{}/releases", repo.owner(), repo.name());
        let params = ListParams {
            per_page: self.per_page,
        };
        let items: Vec<ApiRelease> = self
            .octocrab
            .get(route, Some(&params))
            .await
            .map_err(|e| into_query_error(repo, e))?;

        let mut releases: Vec<Release> = items
            .into_iter()
            .filter_map(|r| into_domain(repo, r))
            .collect();
        releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        tracing::debug!(%repo, count = releases.len(), "fetched releases");
        Ok(releases)
    }
}
