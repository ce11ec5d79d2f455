use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::types::{Release, RepoId};

use super::interface::{DeliveryError, DeliverySink, QueryError, ReleaseSource};

/// A scripted release source that answers from pre-loaded listings without
/// any network calls.
///
/// Each repository has a queue of responses; every query pops the front one
/// until a single response is left, which is then repeated forever.
/// Repositories with no script answer `QueryError::NotFound`.
///
/// Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct StubSource {
    inner: Arc<Mutex<StubState>>,
    latency: Duration,
}

#[derive(Default)]
struct StubState {
    scripts: HashMap<RepoId, VecDeque<Result<Vec<Release>, QueryError>>>,
    calls: Vec<(RepoId, Instant)>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency` (measured on the tokio clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a successful listing (newest first) for `repo`.
    pub fn respond(&self, repo: RepoId, releases: Vec<Release>) {
        self.state().scripts.entry(repo).or_default().push_back(Ok(releases));
    }

    /// Queue a failed query for `repo`.
    pub fn fail(&self, repo: RepoId, message: &str) {
        let err = QueryError::Api {
            repo: repo.clone(),
            message: message.to_owned(),
        };
        self.state().scripts.entry(repo).or_default().push_back(Err(err));
    }

    /// Every query received so far, with the time it started.
    pub fn calls(&self) -> Vec<(RepoId, Instant)> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_response(&self, repo: &RepoId) -> Result<Vec<Release>, QueryError> {
        let mut state = self.state();
        state.calls.push((repo.clone(), Instant::now()));
        let Some(queue) = state.scripts.get_mut(repo) else {
            return Err(QueryError::NotFound(repo.clone()));
        };
        match queue.len() {
            0 => Ok(Vec::new()),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap_or_else(|| Ok(Vec::new())),
        }
    }
}

impl ReleaseSource for StubSource {
    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>, QueryError> {
        let response = self.next_response(repo);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        response
    }
}

/// A delivery sink that records every attempt and fails for chosen tags.
#[derive(Clone, Default)]
pub struct RecordingSink {
    attempts: Arc<Mutex<Vec<Release>>>,
    failing_tags: Arc<HashSet<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make delivery of releases with these tags fail.
    pub fn failing<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            attempts: Arc::default(),
            failing_tags: Arc::new(tags.into_iter().map(Into::into).collect()),
        }
    }

    /// Every release delivery was attempted for, in order.
    pub fn attempts(&self) -> Vec<Release> {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl DeliverySink for RecordingSink {
    async fn deliver(&self, release: &Release) -> Result<(), DeliveryError> {
        self.attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(release.clone());
        if self.failing_tags.contains(&release.tag) {
            return Err(DeliveryError::Status {
                status: 500,
                body: "stub failure".into(),
            });
        }
        Ok(())
    }
}
