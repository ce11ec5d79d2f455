use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::interval::parse_interval;
use crate::engine::FirstObservation;
use crate::engine::emitter::DEFAULT_CAPACITY;
use crate::types::RepoId;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_REPOSITORY_FILE: &str = "repositories.txt";
pub const DEFAULT_PER_PAGE: u8 = 10;

// ---------------------------------------------------------------------------
// TOML config file
// ---------------------------------------------------------------------------

/// Contents of the optional TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub repositories: Vec<String>,
    pub repository_file: Option<PathBuf>,
    pub interval: Option<String>,
    pub first_observation: Option<FirstObservation>,
    pub include_prereleases: Option<bool>,
    pub channel_capacity: Option<usize>,
    pub github: GitHubSection,
    pub slack: SlackSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub per_page: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlackSection {
    pub hook: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    #[default]
    Json,
}

// ---------------------------------------------------------------------------
// Command-line / environment overrides
// ---------------------------------------------------------------------------

/// Values taken from flags or environment variables. They win over the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub repositories: Vec<String>,
    pub repository_file: Option<PathBuf>,
    pub github_token: Option<String>,
    pub github_api: Option<String>,
    pub interval: Option<String>,
    pub slack_hook: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub first_observation: Option<FirstObservation>,
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Settings {
    /// Repositories named on the command line, then in the config file.
    pub repositories: Vec<RepoId>,
    pub repository_file: PathBuf,
    pub interval: Duration,
    pub first_observation: FirstObservation,
    pub include_prereleases: bool,
    pub channel_capacity: usize,
    pub github: GitHubSettings,
    pub slack_hook: Option<String>,
    pub log: LogSettings,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub per_page: u8,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// One of [`LOG_LEVELS`].
    pub level: String,
    pub format: LogFormat,
    /// A configured level that was not recognised and replaced by `info`.
    pub rejected_level: Option<String>,
}

/// Levels accepted for `log.level`, lowest first.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LogSettings {
    /// Accept one of [`LOG_LEVELS`] (case-insensitive); anything else falls
    /// back to `info` and is kept in `rejected_level` for a startup warning.
    pub fn new(level: Option<String>, format: LogFormat) -> Self {
        let Some(raw) = level else {
            return Self {
                level: "info".to_owned(),
                format,
                rejected_level: None,
            };
        };
        let lowered = raw.trim().to_lowercase();
        if LOG_LEVELS.contains(&lowered.as_str()) {
            Self {
                level: lowered,
                format,
                rejected_level: None,
            }
        } else {
            Self {
                level: "info".to_owned(),
                format,
                rejected_level: Some(raw),
            }
        }
    }
}

impl Settings {
    /// Layer `overrides` on top of `file` on top of the built-in defaults.
    ///
    /// Empty strings count as unset. Malformed repository identifiers or
    /// intervals are startup errors.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self> {
        let repositories = overrides
            .repositories
            .iter()
            .chain(file.repositories.iter())
            .map(|s| {
                s.parse::<RepoId>()
                    .with_context(|| format!("invalid repository {s:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let interval = match non_empty(overrides.interval).or(non_empty(file.interval)) {
            Some(raw) => parse_interval(&raw).with_context(|| format!("invalid interval {raw:?}"))?,
            None => DEFAULT_INTERVAL,
        };

        Ok(Self {
            repositories,
            repository_file: overrides
                .repository_file
                .or(file.repository_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPOSITORY_FILE)),
            interval,
            first_observation: overrides
                .first_observation
                .or(file.first_observation)
                .unwrap_or_default(),
            include_prereleases: file.include_prereleases.unwrap_or(true),
            channel_capacity: file.channel_capacity.unwrap_or(DEFAULT_CAPACITY).max(1),
            github: GitHubSettings {
                token: non_empty(overrides.github_token).or(non_empty(file.github.token)),
                api_url: non_empty(overrides.github_api).or(non_empty(file.github.api_url)),
                per_page: file.github.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, 100),
            },
            slack_hook: non_empty(overrides.slack_hook).or(non_empty(file.slack.hook)),
            log: LogSettings::new(
                non_empty(overrides.log_level).or(non_empty(file.log.level)),
                overrides.log_format.or(file.log.format).unwrap_or_default(),
            ),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
