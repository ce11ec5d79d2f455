// github module: release metadata source backed by the GitHub REST API

pub mod client;
pub(crate) mod rate_limit;
pub mod releases;

pub use client::build_octocrab;
pub use releases::GitHubReleases;
