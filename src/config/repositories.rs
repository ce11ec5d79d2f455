use std::io::ErrorKind;
use std::path::Path;

use crate::types::{Registry, RepoId};

use super::types::Settings;

/// Parse a repository list: one `owner/name` per line.
///
/// Blank lines and `#` comments are skipped. Malformed lines are logged and
/// skipped.
pub fn parse_repository_list(contents: &str) -> Vec<RepoId> {
    contents
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match line.parse::<RepoId>() {
                Ok(repo) => Some(repo),
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "skipping invalid repository entry");
                    None
                }
            }
        })
        .collect()
}

/// Read the repository file at `path`.
///
/// A missing file yields no repositories. A file that exists but cannot be
/// read is logged as an error and also yields none.
pub fn load_repository_file(path: &Path) -> Vec<RepoId> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let repos = parse_repository_list(&contents);
            tracing::info!(
                path = %path.display(),
                count = repos.len(),
                "read repository configuration file"
            );
            repos
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(
                path = %path.display(),
                "no repository file found, using only configured repositories"
            );
            Vec::new()
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "failed to read repository file, ignoring it"
            );
            Vec::new()
        }
    }
}

/// Build the registry: configured repositories first, then the file's.
pub fn build_registry(settings: &Settings) -> Registry {
    let from_file = load_repository_file(&settings.repository_file);
    settings.repositories.iter().cloned().chain(from_file).collect()
}
