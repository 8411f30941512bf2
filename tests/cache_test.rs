//! TTL cache and cache service behaviour

use std::sync::Arc;
use std::time::{Duration, Instant};

use slack_mention_monitor::cache::{scoped_key, CacheService, Namespace, TtlCache};
use slack_mention_monitor::config::TtlTable;
use slack_mention_monitor::slack::{Channel, UserInfo};

#[test]
fn test_get_within_ttl_returns_value() {
    let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(300));
    let t0 = Instant::now();
    cache.put_at("U1", "alice".to_string(), t0);
    assert_eq!(cache.get_at("U1", t0 + Duration::from_secs(299)), Some("alice".to_string()));
}

#[test]
fn test_get_after_ttl_misses_without_sweep() {
    let cache: TtlCache<String> = TtlCache::new(Duration::from_secs(300));
    let t0 = Instant::now();
    cache.put_at("U1", "alice".to_string(), t0);
    assert_eq!(cache.get_at("U1", t0 + Duration::from_secs(301)), None);
    // lazily evicted on that read
    assert!(cache.is_empty());
}

#[test]
fn test_sweep_removes_only_expired() {
    let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
    let t0 = Instant::now();
    cache.put_at("old", 1, t0);
    cache.put_at("fresh", 2, t0 + Duration::from_secs(50));

    let removed = cache.sweep(t0 + Duration::from_secs(90));
    assert_eq!(removed, 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get_at("fresh", t0 + Duration::from_secs(90)), Some(2));
}

#[test]
fn test_namespaces_have_their_own_ttl() {
    let service = CacheService::new(&TtlTable::default());
    let t0 = Instant::now();
    service.users().put_at("p:U1", UserInfo::default(), t0);
    service.directory().put_at("p:members", Arc::new(Vec::new()), t0);
    service
        .channels()
        .put_at("p:channels", Arc::new(vec![Channel::default()]), t0);

    // 400s later: 300s namespaces are gone, the 600s directory is not
    let later = t0 + Duration::from_secs(400);
    assert!(service.users().get_at("p:U1", later).is_none());
    assert!(service.channels().get_at("p:channels", later).is_none());
    assert!(service.directory().get_at("p:members", later).is_some());

    assert_eq!(service.len(Namespace::MemberDirectory), 1);
    assert_eq!(service.sweep(later), 0);
}

#[test]
fn test_service_sweep_across_namespaces() {
    let service = CacheService::new(&TtlTable::default());
    let t0 = Instant::now();
    service.users().put_at("a:U1", UserInfo::default(), t0);
    service.group_members().put_at("a:subteam:S1", Arc::new(vec!["U1".into()]), t0);
    service.group_handles().put_at("a:usergroups", Arc::new(Default::default()), t0);

    assert_eq!(service.sweep(t0 + Duration::from_secs(301)), 2);
    assert_eq!(service.len(Namespace::GroupHandles), 1);
}

#[test]
fn test_scoped_keys_separate_accounts() {
    let service = CacheService::new(&TtlTable::default());
    service.users().put(scoped_key("xoxb-aaaa", "U1"), UserInfo { name: "a".into(), ..Default::default() });
    service.users().put(scoped_key("xoxb-bbbb", "U1"), UserInfo { name: "b".into(), ..Default::default() });

    assert_eq!(service.users().get(&scoped_key("xoxb-aaaa", "U1")).unwrap().name, "a");
    assert_eq!(service.users().get(&scoped_key("xoxb-bbbb", "U1")).unwrap().name, "b");
}

#[tokio::test]
async fn test_started_service_shuts_down() {
    let service = CacheService::start(&TtlTable::default(), Duration::from_millis(10));
    service.users().put("k", UserInfo::default());
    tokio::time::sleep(Duration::from_millis(30)).await;
    // fresh entries survive periodic sweeps
    assert!(service.users().get("k").is_some());
    service.shutdown();
}
