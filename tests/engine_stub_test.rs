use std::time::Duration;

use chrono::{TimeZone, Utc};

use release_notifier::engine::{
    ChangeDetector, FirstObservation, PollScheduler, RecordingSink, StubSource, emitter,
    run_delivery_loop, shutdown_channel,
};
use release_notifier::types::{Registry, Release, RepoId};

fn repo(s: &str) -> RepoId {
    s.parse().expect("valid repository id")
}

fn rel(repo_id: &str, tag: &str, day: u32) -> Release {
    Release {
        repo: repo(repo_id),
        tag: tag.into(),
        name: format!("{repo_id} {tag}"),
        body: String::new(),
        url: format!("https://github.com/{repo_id}/releases/tag/{tag}"),
        author: None,
        prerelease: false,
        published_at: Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap(),
    }
}

fn tags(releases: &[Release]) -> Vec<String> {
    releases.iter().map(|r| format!("{}@{}", r.repo, r.tag)).collect()
}

/// Wait on the paused tokio clock until `sink` has seen `n` attempts.
async fn wait_for_attempts(sink: &RecordingSink, n: usize) {
    for _ in 0..10_000 {
        if sink.attempts().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    panic!("sink saw {} attempts, expected {n}", sink.attempts().len());
}

#[tokio::test(start_paused = true)]
async fn scheduler_and_delivery_loop_end_to_end() {
    let source = StubSource::new();
    source.respond(repo("acme/widget"), vec![rel("acme/widget", "v1", 1)]);
    source.respond(
        repo("acme/widget"),
        vec![rel("acme/widget", "v2", 2), rel("acme/widget", "v1", 1)],
    );
    source.respond(
        repo("acme/widget"),
        vec![
            rel("acme/widget", "v4", 4),
            rel("acme/widget", "v3", 3),
            rel("acme/widget", "v2", 2),
            rel("acme/widget", "v1", 1),
        ],
    );
    source.respond(repo("acme/gadget"), vec![]);
    source.respond(repo("acme/gadget"), vec![rel("acme/gadget", "g1", 5)]);
    source.respond(
        repo("acme/gadget"),
        vec![rel("acme/gadget", "g2", 6), rel("acme/gadget", "g1", 5)],
    );

    let registry = Registry::new([repo("acme/widget"), repo("acme/gadget")]);
    let (tx, rx) = emitter::channel(8);
    let detector = ChangeDetector::new(FirstObservation::Baseline, true);
    let scheduler = PollScheduler::new(
        source.clone(),
        registry,
        Duration::from_secs(3600),
        detector,
        tx,
    );

    let sink = RecordingSink::new();
    let consumer_sink = sink.clone();
    let consumer = tokio::spawn(async move { run_delivery_loop(rx, &consumer_sink).await });

    let (trigger, shutdown) = shutdown_channel();
    let poller = tokio::spawn(scheduler.run(shutdown));

    wait_for_attempts(&sink, 4).await;
    trigger.trigger();
    poller.await.unwrap();
    let stats = consumer.await.unwrap();

    // Pass 1: both baseline (gadget is empty, so it stays unobserved).
    // Pass 2: widget v2; gadget g1 is its baseline.
    // Pass 3: widget v3, v4; gadget g2.
    assert_eq!(
        tags(&sink.attempts()),
        vec![
            "acme/widget@v2",
            "acme/widget@v3",
            "acme/widget@v4",
            "acme/gadget@g2",
        ]
    );
    assert_eq!(stats.delivered, 4);
    assert_eq!(stats.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_passes_never_duplicate() {
    let source = StubSource::new();
    source.respond(repo("acme/widget"), vec![rel("acme/widget", "v1", 1)]);
    source.respond(
        repo("acme/widget"),
        vec![rel("acme/widget", "v2", 2), rel("acme/widget", "v1", 1)],
    );

    let (tx, rx) = emitter::channel(8);
    let scheduler = PollScheduler::new(
        source.clone(),
        Registry::new([repo("acme/widget")]),
        Duration::from_secs(60),
        ChangeDetector::new(FirstObservation::Baseline, true),
        tx,
    );
    let sink = RecordingSink::new();
    let consumer_sink = sink.clone();
    let consumer = tokio::spawn(async move { run_delivery_loop(rx, &consumer_sink).await });

    let (trigger, shutdown) = shutdown_channel();
    let poller = tokio::spawn(scheduler.run(shutdown));

    // Twenty passes, all but the first re-observing v2.
    while source.calls().len() < 20 {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    trigger.trigger();
    poller.await.unwrap();
    consumer.await.unwrap();

    assert_eq!(tags(&sink.attempts()), vec!["acme/widget@v2"]);
}

#[tokio::test(start_paused = true)]
async fn delivery_failure_does_not_block_later_releases() {
    let source = StubSource::new();
    source.respond(repo("acme/widget"), vec![rel("acme/widget", "v1", 1)]);
    source.respond(
        repo("acme/widget"),
        vec![
            rel("acme/widget", "v3", 3),
            rel("acme/widget", "v2", 2),
            rel("acme/widget", "v1", 1),
        ],
    );

    let (tx, rx) = emitter::channel(8);
    let scheduler = PollScheduler::new(
        source,
        Registry::new([repo("acme/widget")]),
        Duration::from_secs(60),
        ChangeDetector::new(FirstObservation::Baseline, true),
        tx,
    );
    let sink = RecordingSink::failing(["v2"]);
    let consumer_sink = sink.clone();
    let consumer = tokio::spawn(async move { run_delivery_loop(rx, &consumer_sink).await });

    let (trigger, shutdown) = shutdown_channel();
    let poller = tokio::spawn(scheduler.run(shutdown));

    wait_for_attempts(&sink, 2).await;
    // A few more passes: the failed v2 is not retried.
    tokio::time::sleep(Duration::from_secs(300)).await;
    trigger.trigger();
    poller.await.unwrap();
    let stats = consumer.await.unwrap();

    assert_eq!(tags(&sink.attempts()), vec!["acme/widget@v2", "acme/widget@v3"]);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn consumer_drains_after_shutdown() {
    let source = StubSource::new();
    source.respond(
        repo("acme/widget"),
        vec![
            rel("acme/widget", "v3", 3),
            rel("acme/widget", "v2", 2),
            rel("acme/widget", "v1", 1),
        ],
    );

    let (tx, rx) = emitter::channel(8);
    let scheduler = PollScheduler::new(
        source.clone(),
        Registry::new([repo("acme/widget")]),
        Duration::from_secs(60),
        ChangeDetector::new(FirstObservation::All, true),
        tx,
    );

    let (trigger, shutdown) = shutdown_channel();
    let poller = tokio::spawn(scheduler.run(shutdown));
    while source.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    trigger.trigger();
    poller.await.unwrap();

    // The consumer starts only after the producer is gone and still gets
    // everything that was emitted.
    let sink = RecordingSink::new();
    let stats = run_delivery_loop(rx, &sink).await;
    assert_eq!(stats.delivered, 3);
    assert_eq!(
        tags(&sink.attempts()),
        vec!["acme/widget@v1", "acme/widget@v2", "acme/widget@v3"]
    );
}
