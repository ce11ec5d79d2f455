use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::FileConfig;

/// Discover and load the TOML config file.
///
/// Priority:
/// 1. `--config` flag / `$RELEASE_NOTIFIER_CONFIG` (explicit path, must exist)
/// 2. `$XDG_CONFIG_HOME/release-notifier/config.toml`
/// 3. `~/.config/release-notifier/config.toml`
///
/// No file at all is fine: every setting has a default or comes from flags
/// and the environment.
pub fn load_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => match find_global_config() {
            Some(path) => path,
            None => return Ok(FileConfig::default()),
        },
    };
    parse_config_file(&path)
}

fn parse_config_file(path: &Path) -> Result<FileConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing TOML from {}", path.display()))
}

fn find_global_config() -> Option<PathBuf> {
    // $XDG_CONFIG_HOME/release-notifier/config.toml
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let p = PathBuf::from(xdg).join("release-notifier/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // ~/.config/release-notifier/config.toml
    if let Ok(home) = std::env::var("HOME") {
        let p = PathBuf::from(home).join(".config/release-notifier/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    None
}
