use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::config::interval::MIN_INTERVAL;
use crate::types::Registry;

use super::detector::ChangeDetector;
use super::emitter::Emitter;
use super::interface::{EmitError, ReleaseSource, Shutdown};

/// Counters for one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub queried: usize,
    pub failed: usize,
    pub emitted: usize,
}

/// Drives query + detect + emit for every watched repository on a fixed
/// interval.
pub struct PollScheduler<S> {
    source: S,
    registry: Registry,
    interval: Duration,
    detector: ChangeDetector,
    emitter: Emitter,
}

impl<S: ReleaseSource> PollScheduler<S> {
    pub fn new(
        source: S,
        registry: Registry,
        interval: Duration,
        detector: ChangeDetector,
        emitter: Emitter,
    ) -> Self {
        if interval < MIN_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                interval_ms = MIN_INTERVAL.as_millis() as u64,
                "scheduler: interval raised to the minimum"
            );
        }
        Self {
            source,
            registry,
            interval: interval.max(MIN_INTERVAL),
            detector,
            emitter,
        }
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Run passes until shutdown is signalled or the consumer goes away.
    ///
    /// The first pass starts immediately. Later passes start on a steady
    /// period measured from the start of the first one; ticks missed while a
    /// slow pass is running are skipped, not queued. A running pass is never
    /// interrupted. Returning drops the emitter, which lets the consumer
    /// drain and finish.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        tracing::info!(
            repositories = self.registry.len(),
            interval_ms = self.interval.as_millis() as u64,
            "scheduler: started"
        );

        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = shutdown.wait() => {
                    tracing::info!("scheduler: shutdown requested");
                    break;
                }
                _ = tick.tick() => {
                    match self.run_pass().await {
                        Ok(summary) => {
                            tracing::debug!(
                                queried = summary.queried,
                                failed = summary.failed,
                                emitted = summary.emitted,
                                "scheduler: pass complete"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "scheduler: consumer gone, stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Evaluate every repository once.
    ///
    /// A failed query skips that repository for this pass only. Fails only
    /// when the conduit is closed, in which case the repository being
    /// processed keeps its old watermark.
    pub async fn run_pass(&mut self) -> Result<PassSummary, EmitError> {
        let mut summary = PassSummary::default();

        for repo in self.registry.iter() {
            summary.queried += 1;
            let releases = match self.source.releases(repo).await {
                Ok(releases) => releases,
                Err(e) => {
                    summary.failed += 1;
                    if e.is_rate_limit() {
                        tracing::warn!(
                            %repo,
                            error = %e,
                            "rate limited by the release source; will retry next pass"
                        );
                    } else {
                        tracing::warn!(%repo, error = %e, "failed to query releases");
                    }
                    continue;
                }
            };

            let detection = self.detector.detect(repo, releases);
            for release in detection.releases() {
                tracing::info!(%repo, tag = %release.tag, "new release detected");
                self.emitter.emit(release.clone()).await?;
                summary.emitted += 1;
            }
            self.detector.commit(detection);
        }

        Ok(summary)
    }
}
