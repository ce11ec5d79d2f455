//! Change detection: turns a newest-first release listing into the releases
//! that have not been reported yet.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::{Release, RepoId};

/// What to do the first time a repository is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FirstObservation {
    /// Emit nothing; remember the newest release as the starting point.
    #[default]
    Baseline,
    /// Emit only the newest release.
    Latest,
    /// Emit every listed release, oldest first.
    All,
}

/// Marker of the newest release already reported for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub tag: String,
    pub published_at: DateTime<Utc>,
}

impl Watermark {
    fn of(release: &Release) -> Self {
        Self {
            tag: release.tag.clone(),
            published_at: release.published_at,
        }
    }
}

/// Result of [`ChangeDetector::detect`], not yet applied.
///
/// The watermark only moves once the detection is passed back to
/// [`ChangeDetector::commit`], which the scheduler does after every release
/// in it has been handed to the emitter.
#[derive(Debug)]
#[must_use = "a detection does nothing until committed"]
pub struct Detection {
    repo: RepoId,
    releases: Vec<Release>,
    watermark: Option<Watermark>,
}

impl Detection {
    /// Newly detected releases, oldest first.
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Watermark that committing this detection will record, if any.
    pub fn watermark(&self) -> Option<&Watermark> {
        self.watermark.as_ref()
    }
}

/// Per-repository memory of what has been reported.
#[derive(Debug)]
pub struct ChangeDetector {
    watermarks: HashMap<RepoId, Watermark>,
    first_observation: FirstObservation,
    include_prereleases: bool,
}

impl ChangeDetector {
    pub fn new(first_observation: FirstObservation, include_prereleases: bool) -> Self {
        Self {
            watermarks: HashMap::new(),
            first_observation,
            include_prereleases,
        }
    }

    pub fn watermark(&self, repo: &RepoId) -> Option<&Watermark> {
        self.watermarks.get(repo)
    }

    /// Compute the releases in `releases` (newest first) that are strictly
    /// newer than the repository's watermark.
    pub fn detect(&self, repo: &RepoId, mut releases: Vec<Release>) -> Detection {
        if !self.include_prereleases {
            releases.retain(|r| !r.prerelease);
        }

        let Some(newest) = releases.first() else {
            return Detection {
                repo: repo.clone(),
                releases: Vec::new(),
                watermark: None,
            };
        };

        let Some(mark) = self.watermarks.get(repo) else {
            let watermark = Some(Watermark::of(newest));
            let mut fresh = match self.first_observation {
                FirstObservation::Baseline => Vec::new(),
                FirstObservation::Latest => vec![newest.clone()],
                FirstObservation::All => releases,
            };
            fresh.reverse();
            return Detection {
                repo: repo.clone(),
                releases: fresh,
                watermark,
            };
        };

        let mut fresh = match releases.iter().position(|r| r.tag == mark.tag) {
            Some(idx) => {
                releases.truncate(idx);
                releases
            }
            // The marked release is gone from the listing (deleted, or paged
            // out); fall back to publication time. A release published in the
            // same instant as the mark counts as new.
            None => releases
                .into_iter()
                .filter(|r| r.published_at >= mark.published_at && r.tag != mark.tag)
                .collect(),
        };
        fresh.reverse();

        let watermark = fresh.last().map(Watermark::of);
        Detection {
            repo: repo.clone(),
            releases: fresh,
            watermark,
        }
    }

    /// Record the detection's watermark. Call only after hand-off.
    pub fn commit(&mut self, detection: Detection) {
        if let Some(watermark) = detection.watermark {
            tracing::debug!(repo = %detection.repo, tag = %watermark.tag, "watermark advanced");
            self.watermarks.insert(detection.repo, watermark);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn repo() -> RepoId {
        "acme/widget".parse().unwrap()
    }

    fn rel(tag: &str, day: u32) -> Release {
        Release {
            repo: repo(),
            tag: tag.into(),
            name: String::new(),
            body: String::new(),
            url: format!("https://github.com/acme/widget/releases/tag/{tag}"),
            author: None,
            prerelease: false,
            published_at: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        }
    }

    fn tags(detection: &Detection) -> Vec<&str> {
        detection.releases().iter().map(|r| r.tag.as_str()).collect()
    }

    #[test]
    fn baseline_then_new_releases_in_chronological_order() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, true);

        let first = detector.detect(&repo(), vec![rel("r3", 3), rel("r2", 2), rel("r1", 1)]);
        assert!(first.is_empty());
        detector.commit(first);
        assert_eq!(detector.watermark(&repo()).unwrap().tag, "r3");

        let second = detector.detect(
            &repo(),
            vec![rel("r5", 5), rel("r4", 4), rel("r3", 3), rel("r2", 2), rel("r1", 1)],
        );
        assert_eq!(tags(&second), vec!["r4", "r5"]);
        detector.commit(second);
        assert_eq!(detector.watermark(&repo()).unwrap().tag, "r5");
    }

    #[test]
    fn repeated_listing_emits_nothing() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, true);
        let listing = vec![rel("r2", 2), rel("r1", 1)];
        let first = detector.detect(&repo(), listing.clone());
        detector.commit(first);

        for _ in 0..3 {
            let again = detector.detect(&repo(), listing.clone());
            assert!(again.is_empty());
            assert!(again.watermark().is_none());
            detector.commit(again);
        }
        assert_eq!(detector.watermark(&repo()).unwrap().tag, "r2");
    }

    #[test]
    fn empty_listing_changes_nothing() {
        let mut detector = ChangeDetector::new(FirstObservation::All, true);
        let detection = detector.detect(&repo(), Vec::new());
        assert!(detection.is_empty());
        detector.commit(detection);
        assert!(detector.watermark(&repo()).is_none());
    }

    #[test]
    fn watermark_untouched_until_commit() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, true);
        let first = detector.detect(&repo(), vec![rel("r1", 1)]);
        detector.commit(first);

        let pending = detector.detect(&repo(), vec![rel("r2", 2), rel("r1", 1)]);
        assert_eq!(pending.watermark().unwrap().tag, "r2");
        assert_eq!(detector.watermark(&repo()).unwrap().tag, "r1");
        drop(pending);

        // Not committed, so the same release is detected again.
        let retry = detector.detect(&repo(), vec![rel("r2", 2), rel("r1", 1)]);
        assert_eq!(tags(&retry), vec!["r2"]);
    }

    #[test]
    fn first_observation_latest_emits_newest_only() {
        let detector = ChangeDetector::new(FirstObservation::Latest, true);
        let detection = detector.detect(&repo(), vec![rel("r3", 3), rel("r2", 2)]);
        assert_eq!(tags(&detection), vec!["r3"]);
        assert_eq!(detection.watermark().unwrap().tag, "r3");
    }

    #[test]
    fn first_observation_all_emits_history_oldest_first() {
        let detector = ChangeDetector::new(FirstObservation::All, true);
        let detection = detector.detect(&repo(), vec![rel("r3", 3), rel("r2", 2), rel("r1", 1)]);
        assert_eq!(tags(&detection), vec!["r1", "r2", "r3"]);
        assert_eq!(detection.watermark().unwrap().tag, "r3");
    }

    #[test]
    fn missing_watermark_tag_falls_back_to_publication_time() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, true);
        let first = detector.detect(&repo(), vec![rel("r3", 3), rel("r2", 2)]);
        detector.commit(first);

        // r3 was deleted upstream; r4 is new, r2 is old.
        let detection = detector.detect(&repo(), vec![rel("r4", 4), rel("r2", 2)]);
        assert_eq!(tags(&detection), vec!["r4"]);
    }

    #[test]
    fn release_sharing_deleted_marks_timestamp_is_new() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, true);
        let first = detector.detect(&repo(), vec![rel("r3", 3), rel("r2", 2)]);
        detector.commit(first);

        // r3 was replaced by r3-fix, published in the same second.
        let detection = detector.detect(&repo(), vec![rel("r3-fix", 3), rel("r2", 2)]);
        assert_eq!(tags(&detection), vec!["r3-fix"]);
        detector.commit(detection);
        assert_eq!(detector.watermark(&repo()).unwrap().tag, "r3-fix");

        let again = detector.detect(&repo(), vec![rel("r3-fix", 3), rel("r2", 2)]);
        assert!(again.is_empty());
    }

    #[test]
    fn prereleases_filtered_when_disabled() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, false);
        let first = detector.detect(&repo(), vec![rel("v1", 1)]);
        detector.commit(first);

        let mut beta = rel("v2-beta", 2);
        beta.prerelease = true;
        let detection = detector.detect(&repo(), vec![beta, rel("v1", 1)]);
        assert!(detection.is_empty());
    }

    #[test]
    fn repositories_are_tracked_independently() {
        let mut detector = ChangeDetector::new(FirstObservation::Baseline, true);
        let other: RepoId = "acme/gadget".parse().unwrap();

        let first = detector.detect(&repo(), vec![rel("r1", 1)]);
        detector.commit(first);
        assert!(detector.watermark(&other).is_none());

        let detection = detector.detect(&other, vec![rel("r9", 9)]);
        assert!(detection.is_empty());
        detector.commit(detection);
        assert_eq!(detector.watermark(&other).unwrap().tag, "r9");
        assert_eq!(detector.watermark(&repo()).unwrap().tag, "r1");
    }
}
