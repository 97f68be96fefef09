/// Integration tests for the monitoring pipeline
///
/// This test module covers:
/// - End-to-end wiring: collector → classifier → alert engine → store
/// - Report generation over mixed metric states
/// - Alert querying and acknowledgement through the engine
/// - Aggregation and trends over collector-fed snapshots
use perfwatch::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn wired() -> (PerformanceCollector, Arc<AlertEngine>, Arc<PerformanceStore>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let registry = Arc::new(ThresholdRegistry::with_defaults());
    let engine = Arc::new(AlertEngine::new(
        AlertEngineConfig::default(),
        registry.clone(),
    ));
    let store = Arc::new(PerformanceStore::in_memory());

    let collector = PerformanceCollector::new(registry, MonitorConfig::default())
        .with_alert_engine(engine.clone())
        .with_store(store.clone());

    (collector, engine, store)
}

#[tokio::test]
async fn test_recorded_breach_reaches_engine_and_store() {
    let (collector, engine, store) = wired();

    // Well above the default apiResponseTime rule threshold of 200ms.
    let metric = collector.record_metric("apiResponseTime", 450.0).await.unwrap();
    assert_eq!(metric.status, MetricStatus::Fail);

    let alerts = engine.get_alerts(&AlertFilter::default()).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric, "apiResponseTime");
    assert_eq!(alerts[0].value, 450.0);

    assert_eq!(store.snapshot_count().await, 1);
    let stored = store.query(&SnapshotQuery::default()).await;
    assert_eq!(stored[0].metrics[0].name, "apiResponseTime");
    assert_eq!(stored[0].session_id, collector.session_id());
}

#[tokio::test]
async fn test_passing_metric_raises_no_alert() {
    let (collector, engine, store) = wired();

    collector.record_metric("apiResponseTime", 120.0).await.unwrap();

    assert!(engine.get_alerts(&AlertFilter::default()).await.is_empty());
    // Still retained for history.
    assert_eq!(store.snapshot_count().await, 1);
}

#[tokio::test]
async fn test_cooldown_across_collector_calls() {
    let registry = Arc::new(ThresholdRegistry::with_defaults());
    let engine = Arc::new(AlertEngine::new(
        AlertEngineConfig::default(),
        registry.clone(),
    ));
    engine
        .add_rule(AlertRule {
            metric: "apiResponseTime".to_string(),
            condition: AlertCondition::Exceeds,
            threshold: 200.0,
            severity: AlertSeverity::Warning,
            cooldown: Duration::from_secs(3600),
        })
        .await;

    let collector =
        PerformanceCollector::new(registry, MonitorConfig::default()).with_alert_engine(engine.clone());

    // Two breaches in quick succession; the second falls inside the cooldown.
    collector.record_metric("apiResponseTime", 450.0).await.unwrap();
    collector.record_metric("apiResponseTime", 500.0).await.unwrap();

    let alerts = engine.get_alerts(&AlertFilter::default()).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].value, 450.0);
}

#[tokio::test]
async fn test_report_over_mixed_states() {
    let (collector, _engine, _store) = wired();

    collector.record_metric("apiResponseTime", 120.0).await.unwrap();
    collector.record_metric("pageLoadTime", 2000.0).await.unwrap();
    collector.record_metric("cacheHitRate", 95.0).await.unwrap();
    collector.record_metric("firstInputDelay", 250.0).await.unwrap();

    let report = collector.generate_report().await;
    assert_eq!(report.metrics.len(), 4);
    assert_eq!(report.overall_score, 75);
    assert_eq!(report.recommendations.len(), 1);
    assert!(report.recommendations[0].contains("firstInputDelay"));
}

#[tokio::test]
async fn test_acknowledge_through_engine() {
    let (collector, engine, _store) = wired();

    collector.record_metric("apiResponseTime", 450.0).await.unwrap();

    let unacked = engine
        .get_alerts(&AlertFilter {
            acknowledged: Some(false),
            ..Default::default()
        })
        .await;
    assert_eq!(unacked.len(), 1);

    assert!(engine.acknowledge_alert(unacked[0].id).await);

    let stats = engine.alert_stats().await;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.acknowledged, 1);
    assert_eq!(stats.unacknowledged, 0);
}

#[tokio::test]
async fn test_aggregation_over_collector_fed_store() {
    let (collector, _engine, store) = wired();

    for value in [80.0, 100.0, 120.0, 140.0, 160.0] {
        collector.record_metric("apiResponseTime", value).await.unwrap();
    }

    let agg = store.aggregate("apiResponseTime", Period::Hour, None).await;
    assert_eq!(agg.count, 5);
    assert_eq!(agg.avg, 120.0);
    assert_eq!(agg.min, 80.0);
    assert_eq!(agg.max, 160.0);
    assert_eq!(agg.p50, 120.0);

    let trends = store.trends("apiResponseTime", Period::Hour, None).await;
    assert_eq!(trends.len(), 12);
    assert_eq!(trends[11].value, 120.0);
}

#[tokio::test]
async fn test_fired_alerts_are_retained_in_store() {
    let registry = Arc::new(ThresholdRegistry::with_defaults());
    let store = Arc::new(PerformanceStore::in_memory());
    let engine = Arc::new(
        AlertEngine::new(AlertEngineConfig::default(), registry.clone()).with_store(store.clone()),
    );

    let collector = PerformanceCollector::new(registry, MonitorConfig::default())
        .with_alert_engine(engine.clone())
        .with_store(store.clone());

    collector.record_metric("apiResponseTime", 450.0).await.unwrap();

    assert_eq!(store.alert_count().await, 1);
    assert_eq!(store.snapshot_count().await, 1);

    let exported = store.export(ExportFormat::Json).await.unwrap();
    assert!(exported.contains("apiResponseTime"));
    assert!(exported.contains("\"alerts\""));
}
