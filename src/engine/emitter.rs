use tokio::sync::mpsc;

use crate::types::Release;

use super::interface::EmitError;

/// Default number of releases buffered between detection and delivery.
pub const DEFAULT_CAPACITY: usize = 64;

/// Producer side of the release conduit. Cheap to clone.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<Release>,
}

/// Consumer side of the release conduit.
pub struct ReleaseStream {
    rx: mpsc::Receiver<Release>,
}

/// Create a bounded, ordered conduit. Emitting waits while the buffer is full.
pub fn channel(capacity: usize) -> (Emitter, ReleaseStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Emitter { tx }, ReleaseStream { rx })
}

impl Emitter {
    /// Hand a release to the consumer, waiting for buffer space if needed.
    pub async fn emit(&self, release: Release) -> Result<(), EmitError> {
        self.tx.send(release).await.map_err(|err| EmitError {
            repo: err.0.repo,
            tag: err.0.tag,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ReleaseStream {
    /// Next emitted release, or `None` once every emitter is dropped and the
    /// buffer is drained.
    pub async fn next(&mut self) -> Option<Release> {
        self.rx.recv().await
    }
}
