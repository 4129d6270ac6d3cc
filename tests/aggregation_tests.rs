use std::{sync::Arc, time::Duration};

use minecraft_status::{Classification, StatusAggregator};

mod helpers;
use helpers::{addr, report, ScriptedProbe};

#[tokio::test]
async fn test_both_absent_is_offline() {
    let probe = Arc::new(ScriptedProbe::new());
    let aggregator = StatusAggregator::new(probe.clone());

    let status = aggregator.aggregate(&addr("down.example.com")).await;

    assert_eq!(status.classification, Classification::Offline);
    assert_eq!(status.rendered_lines.len(), 1);
    assert!(status.rendered_lines[0].contains("down.example.com"));
    assert_eq!(probe.java_calls(), 1);
    assert_eq!(probe.bedrock_calls(), 1);
}

#[tokio::test]
async fn test_java_only_scenario() {
    let probe = Arc::new(ScriptedProbe::new());
    probe.set_java(
        "play.example.com",
        report(3, 20, "1.20.1", &["Alice", "Bob"]),
        Duration::ZERO,
    );
    let aggregator = StatusAggregator::new(probe);

    let status = aggregator.aggregate(&addr("play.example.com")).await;

    assert!(matches!(status.classification, Classification::JavaOnly(_)));
    assert_eq!(status.rendered_lines.len(), 1);
    let line = &status.rendered_lines[0];
    assert!(line.contains('3'));
    assert!(line.contains("20"));
    assert!(line.contains("1.20.1"));
    assert!(line.contains("Alice, Bob"));
}

#[tokio::test]
async fn test_bedrock_only_hides_java_data() {
    let probe = Arc::new(ScriptedProbe::new());
    probe.set_bedrock("be.example.com", report(7, 30, "1.20.10", &[]), Duration::ZERO);
    let aggregator = StatusAggregator::new(probe);

    let status = aggregator.aggregate(&addr("be.example.com")).await;

    match &status.classification {
        Classification::BedrockOnly(bedrock) => assert_eq!(bedrock.players_online, 7),
        other => panic!("expected BedrockOnly, got {other:?}"),
    }
    assert!(!status.rendered_lines[0].contains("Java"));
}

#[tokio::test]
async fn test_dual_waits_for_slow_probe_and_uses_bedrock_count() {
    let probe = Arc::new(ScriptedProbe::new());
    probe.set_java(
        "both.example.com",
        report(3, 20, "1.20.1", &[]),
        Duration::from_millis(150),
    );
    probe.set_bedrock("both.example.com", report(9, 20, "1.20.10", &[]), Duration::ZERO);
    let aggregator = StatusAggregator::new(probe);

    let status = aggregator.aggregate(&addr("both.example.com")).await;

    assert!(matches!(status.classification, Classification::Dual { .. }));
    let line = &status.rendered_lines[0];
    assert!(line.contains("9/20"), "line was {line}");
    assert!(!line.contains("3/20"));
    assert!(line.contains("1.20.1"));
    assert!(line.contains("1.20.10"));
}

#[tokio::test]
async fn test_aggregate_many_preserves_order_when_java_is_slower() {
    let probe = Arc::new(ScriptedProbe::new());
    probe.set_java("a.com", report(1, 10, "1.20", &[]), Duration::from_millis(200));
    probe.set_bedrock("b.com", report(2, 10, "1.20", &[]), Duration::from_millis(10));
    probe.set_java("c.com", report(3, 10, "1.20", &[]), Duration::ZERO);
    let aggregator = StatusAggregator::new(probe);

    let input = vec![addr("a.com"), addr("b.com"), addr("c.com")];
    let statuses = aggregator.aggregate_many(&input).await;

    let order: Vec<_> = statuses.iter().map(|s| s.address.clone()).collect();
    assert_eq!(order, input);
}

#[tokio::test]
async fn test_aggregate_many_preserves_order_when_bedrock_is_slower() {
    let probe = Arc::new(ScriptedProbe::new());
    probe.set_bedrock("a.com", report(1, 10, "1.20", &[]), Duration::from_millis(200));
    probe.set_java("b.com", report(2, 10, "1.20", &[]), Duration::from_millis(10));
    probe.set_bedrock("c.com", report(3, 10, "1.20", &[]), Duration::ZERO);
    let aggregator = StatusAggregator::new(probe);

    let input = vec![addr("a.com"), addr("b.com"), addr("c.com")];
    let statuses = aggregator.aggregate_many(&input).await;

    let order: Vec<_> = statuses.iter().map(|s| s.address.clone()).collect();
    assert_eq!(order, input);
}

#[tokio::test]
async fn test_aggregate_many_isolates_failing_address() {
    let probe = Arc::new(ScriptedProbe::new());
    probe.set_java("a.com", report(1, 10, "1.20", &[]), Duration::ZERO);
    probe.panic_on("broken.com");
    let aggregator = StatusAggregator::new(probe);

    let statuses = aggregator
        .aggregate_many(&[addr("a.com"), addr("broken.com"), addr("c.com")])
        .await;

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].address, addr("a.com"));
    assert_eq!(statuses[1].address, addr("c.com"));
    assert_eq!(statuses[1].classification, Classification::Offline);
}

#[tokio::test]
async fn test_aggregate_many_with_single_permit_still_completes() {
    let probe = Arc::new(ScriptedProbe::new());
    for host in ["a.com", "b.com", "c.com", "d.com"] {
        probe.set_java(host, report(1, 10, "1.20", &[]), Duration::from_millis(5));
    }
    let aggregator = StatusAggregator::with_concurrency(probe.clone(), 1);

    let input: Vec<_> = ["a.com", "b.com", "c.com", "d.com"]
        .into_iter()
        .map(addr)
        .collect();
    let statuses = aggregator.aggregate_many(&input).await;

    assert_eq!(statuses.len(), 4);
    assert_eq!(probe.java_calls(), 4);
}

#[tokio::test]
async fn test_aggregate_many_empty_input() {
    let aggregator = StatusAggregator::new(Arc::new(ScriptedProbe::new()));
    assert!(aggregator.aggregate_many(&[]).await.is_empty());
}
