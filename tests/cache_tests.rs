//! Integration tests for the TTL cache from its public surface.

use integrations_puppet::TtlCache;
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_set_then_get_returns_value() {
    let cache: TtlCache<String, Vec<String>> = TtlCache::new();

    let nodes = vec!["web01".to_string(), "db01".to_string()];
    cache.insert("nodes".to_string(), nodes.clone(), Duration::from_secs(30));

    assert_eq!(cache.get("nodes"), Some(nodes));
}

#[test]
fn test_values_are_copies_not_references() {
    let cache: TtlCache<String, Vec<String>> = TtlCache::new();
    cache.insert(
        "nodes".to_string(),
        vec!["web01".to_string()],
        Duration::from_secs(30),
    );

    let mut first = cache.get("nodes").unwrap();
    first.push("mutated-locally".to_string());

    // Mutating a returned value must not affect the stored entry.
    assert_eq!(cache.get("nodes"), Some(vec!["web01".to_string()]));
}

#[tokio::test]
async fn test_entry_expires_and_sweep_removes_it() {
    let cache: TtlCache<String, u64> = TtlCache::new();

    cache.insert("report-count".to_string(), 128, Duration::from_millis(10));
    cache.insert("node-count".to_string(), 64, Duration::from_secs(60));

    tokio::time::sleep(Duration::from_millis(30)).await;

    // Expired entries are never returned, swept or not.
    assert_eq!(cache.get("report-count"), None);

    cache.insert("stale".to_string(), 1, Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(10)).await;

    cache.clear_expired();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("node-count"), Some(64));
}

#[test]
fn test_clear_empties_the_cache() {
    let cache: TtlCache<&'static str, u64> = TtlCache::new();

    cache.insert("a", 1, Duration::from_secs(60));
    cache.insert("b", 2, Duration::from_secs(60));
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_concurrent_access_from_multiple_tasks() {
    use std::sync::Arc;

    let cache: Arc<TtlCache<u32, u32>> = Arc::new(TtlCache::new());
    let mut handles = Vec::new();

    for i in 0..8u32 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.insert(i, i * 10, Duration::from_secs(60));
            cache.get(&i)
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.await.expect("task panicked");
        assert_eq!(value, Some(i as u32 * 10));
    }
}
