use anyhow::{Context, Result};
use octocrab::Octocrab;

use crate::config::types::GitHubSettings;

/// Build an Octocrab instance from the configured token and API base.
///
/// Without a token the client queries anonymously, which GitHub allows at a
/// much lower rate limit.
pub fn build_octocrab(settings: &GitHubSettings) -> Result<Octocrab> {
    let mut builder = Octocrab::builder();

    if let Some(token) = settings.token.clone() {
        builder = builder.personal_token(token);
    } else {
        tracing::warn!("no GitHub token configured; querying anonymously");
    }

    if let Some(api_url) = settings.api_url.as_deref() {
        builder = builder
            .base_uri(api_url)
            .with_context(|| format!("setting GitHub API base URI {api_url}"))?;
    }

    builder.build().context("building octocrab instance")
}
