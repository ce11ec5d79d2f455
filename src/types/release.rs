use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repo::RepoId;

/// One published release of a watched repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub repo: RepoId,
    /// Tag name, unique within a repository.
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    pub published_at: DateTime<Utc>,
}

impl Release {
    /// Human-readable title, falling back to the tag when the release is unnamed.
    pub fn title(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { self.tag.as_str() } else { name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(name: &str) -> Release {
        Release {
            repo: "acme/widget".parse().unwrap(),
            tag: "v1.0.0".into(),
            name: name.into(),
            body: String::new(),
            url: "https://github.com/acme/widget/releases/tag/v1.0.0".into(),
            author: None,
            prerelease: false,
            published_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn title_prefers_name() {
        assert_eq!(release("Widget 1.0").title(), "Widget 1.0");
    }

    #[test]
    fn title_falls_back_to_tag() {
        assert_eq!(release("").title(), "v1.0.0");
        assert_eq!(release("   ").title(), "v1.0.0");
    }
}
