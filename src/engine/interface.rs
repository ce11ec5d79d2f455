use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;

use crate::types::{Release, RepoId};

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Anything that can list the releases of a repository, newest first.
///
/// Implemented by `GitHubReleases` and, for tests, `StubSource`.
pub trait ReleaseSource: Send + Sync + 'static {
    fn releases(
        &self,
        repo: &RepoId,
    ) -> impl Future<Output = Result<Vec<Release>, QueryError>> + Send;
}

/// Anything that can attempt delivery of one release notification.
///
/// Implemented by `SlackSink` and, for tests, `RecordingSink`.
pub trait DeliverySink: Send + Sync {
    fn deliver(&self, release: &Release) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed release query. Never fatal: the repository is retried next pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("repository {0} not found or not accessible")]
    NotFound(RepoId),

    #[error("rate limited while querying {repo}: {message}")]
    RateLimited { repo: RepoId, message: String },

    #[error("querying releases of {repo}: {message}")]
    Api { repo: RepoId, message: String },
}

impl QueryError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// A failed delivery. The release counts as attempted and is not re-queued.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no webhook configured; cannot deliver notifications")]
    NotConfigured,

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// The consumer side of the release conduit has gone away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("release conduit closed before {tag} of {repo} could be handed off")]
pub struct EmitError {
    pub repo: RepoId,
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Shutdown signal
// ---------------------------------------------------------------------------

/// Fires the shutdown signal. Dropping the trigger fires it as well.
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace never fails, even with no receivers left.
        self.tx.send_replace(true);
    }
}

/// Cheaply cloneable view of the shutdown signal handed to long-running loops.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once shutdown has been requested or the trigger was dropped.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}
