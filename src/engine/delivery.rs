use super::emitter::ReleaseStream;
use super::interface::DeliverySink;

/// Outcome counters of a finished delivery loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Consume emitted releases and hand each to `sink`, one at a time, in
/// emission order.
///
/// A failed delivery is logged and not retried. Returns once every emitter
/// is gone and the conduit is drained.
pub async fn run_delivery_loop<K: DeliverySink>(mut releases: ReleaseStream, sink: &K) -> DeliveryStats {
    let mut stats = DeliveryStats::default();

    while let Some(release) = releases.next().await {
        match sink.deliver(&release).await {
            Ok(()) => {
                stats.delivered += 1;
                tracing::info!(
                    repo = %release.repo,
                    tag = %release.tag,
                    "release notification sent"
                );
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    repo = %release.repo,
                    tag = %release.tag,
                    error = %e,
                    "failed to send release to messenger"
                );
            }
        }
    }

    tracing::debug!(
        delivered = stats.delivered,
        failed = stats.failed,
        "delivery loop drained"
    );
    stats
}
