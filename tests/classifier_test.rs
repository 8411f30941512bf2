//! Priority classification inside channel scans

mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{account, message, test_config, user, FakeApi};
use slack_mention_monitor::cache::CacheService;
use slack_mention_monitor::classifier::{Classification, Priority, PriorityClassifier, PriorityKeywords, PriorityOracle};
use slack_mention_monitor::config::TtlTable;
use slack_mention_monitor::error::{MonitorError, Result};
use slack_mention_monitor::infra::WorkerPool;
use slack_mention_monitor::scanner::{scan_channel, ScanContext, ScanPolicy};
use slack_mention_monitor::slack::Channel;

struct StubOracle {
    verdict: Option<Priority>,
    calls: AtomicUsize,
}

#[async_trait]
impl PriorityOracle for StubOracle {
    async fn classify(&self, _text: &str, sender: &str, channel: &str) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(sender, "Alice Kim");
        assert_eq!(channel, "general");
        match self.verdict {
            Some(priority) => Ok(Classification::new(priority, "asks for a decision")),
            None => Err(MonitorError::ClassifierUnavailable("overloaded".into())),
        }
    }
}

fn setup(verdict: Option<Priority>, oracle_enabled: bool) -> (Arc<FakeApi>, Arc<StubOracle>, ScanContext) {
    let api = FakeApi::new();
    api.add_user(user("UALICE", "alice", "Alice Kim", ""));
    let oracle = Arc::new(StubOracle {
        verdict,
        calls: AtomicUsize::new(0),
    });
    let config = test_config();
    let ctx = ScanContext::new(
        account(),
        api.clone(),
        Arc::new(CacheService::new(&TtlTable::default())),
        PriorityClassifier::new(Some(oracle.clone() as Arc<dyn PriorityOracle>), &config),
        WorkerPool::new(config.pool_capacity),
        &config,
    )
    .with_policy(Arc::new(ScanPolicy {
        oracle_enabled,
        ..ScanPolicy::default()
    }));
    (api, oracle, ctx)
}

fn general() -> Channel {
    Channel {
        id: "C1".into(),
        name: "general".into(),
        ..Default::default()
    }
}

#[test]
fn test_default_keywords() {
    let keywords = PriorityKeywords::default();

    let critical = keywords.classify("버그 리뷰 부탁드려요");
    assert_eq!(critical.priority, Priority::Critical);
    assert_eq!(critical.reason, "keyword match: 버그");

    let high = keywords.classify("Please REVIEW this");
    assert_eq!(high.priority, Priority::High);
    assert_eq!(high.reason, "keyword match: review");

    let asap = keywords.classify("need it asap");
    assert_eq!(asap.priority, Priority::Critical);
    assert_eq!(asap.reason, "keyword match: ASAP");
}

#[tokio::test]
async fn test_oracle_refines_default_classification() {
    let (api, oracle, ctx) = setup(Some(Priority::High), true);
    api.post("C1", message("1001.0", "UALICE", "<@UBOT> could you take a look at the draft"));

    let scan = scan_channel(ctx, general(), 1000.0).await;
    let event = &scan.events[0];
    assert_eq!(event.priority, Priority::High);
    assert_eq!(event.priority_reason, "AI: asks for a decision");
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_oracle_skipped_for_keyword_hits_and_short_text() {
    let (api, oracle, ctx) = setup(Some(Priority::Low), true);
    api.post("C1", message("1001.0", "UALICE", "<@UBOT> urgent: the site is broken"));
    api.post("C1", message("1002.0", "UALICE", "<@UBOT> hi"));

    let scan = scan_channel(ctx, general(), 1000.0).await;
    assert_eq!(scan.events[0].priority, Priority::Critical);
    assert_eq!(scan.events[1].priority, Priority::Normal);
    assert_eq!(scan.events[1].priority_reason, "default classification");
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oracle_disabled_by_settings() {
    let (api, oracle, ctx) = setup(Some(Priority::Low), false);
    api.post("C1", message("1001.0", "UALICE", "<@UBOT> could you take a look at the draft"));

    let scan = scan_channel(ctx, general(), 1000.0).await;
    assert_eq!(scan.events[0].priority, Priority::Normal);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oracle_failure_falls_back_silently() {
    let (api, oracle, ctx) = setup(None, true);
    api.post("C1", message("1001.0", "UALICE", "<@UBOT> could you take a look at the draft"));

    let scan = scan_channel(ctx, general(), 1000.0).await;
    assert_eq!(scan.events.len(), 1);
    assert_eq!(scan.events[0].priority, Priority::Normal);
    assert_eq!(scan.events[0].priority_reason, "default classification");
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}
