use super::*;

fn response(content: &str) -> CompletionResponse {
    CompletionResponse {
        request_id: "req-1".to_string(),
        model: "m1".to_string(),
        content: content.to_string(),
        prompt_tokens: 5,
        completion_tokens: 7,
        cost_estimate: 0.001,
        cached: false,
        fingerprint: "fp".to_string(),
        hit_count: 0,
        citations: Vec::new(),
    }
}

#[test]
fn test_get_within_ttl_returns_response() {
    let cache = ResponseCache::new(Duration::from_secs(60), None);
    let t0 = Instant::now();
    cache.put_at("fp", response("hello"), Duration::from_secs(10), t0);

    let entry = cache.get_at("fp", t0 + Duration::from_secs(10)).unwrap();
    assert_eq!(entry.response.content, "hello");
    assert_eq!(entry.hit_count, 1);
}

#[test]
fn test_get_after_ttl_is_miss_and_evicts() {
    let cache = ResponseCache::new(Duration::from_secs(60), None);
    let t0 = Instant::now();
    cache.put_at("fp", response("hello"), Duration::from_secs(10), t0);

    assert!(cache.get_at("fp", t0 + Duration::from_millis(10_001)).is_none());
    assert!(cache.is_empty());

    let stats = cache.stats();
    assert_eq!(stats.total_hits, 0);
    assert_eq!(stats.total_misses, 1);
}

#[test]
fn test_hit_count_increments_per_read() {
    let cache = ResponseCache::new(Duration::from_secs(60), None);
    let t0 = Instant::now();
    cache.put_at("fp", response("hello"), Duration::from_secs(60), t0);

    assert_eq!(cache.get_at("fp", t0).unwrap().hit_count, 1);
    assert_eq!(cache.get_at("fp", t0).unwrap().hit_count, 2);
    assert_eq!(cache.get_at("fp", t0).unwrap().hit_count, 3);
    assert_eq!(cache.stats().total_hits, 3);
}

#[test]
fn test_put_overwrites_and_resets_entry() {
    let cache = ResponseCache::new(Duration::from_secs(60), None);
    let t0 = Instant::now();
    cache.put_at("fp", response("first"), Duration::from_secs(60), t0);
    let _ = cache.get_at("fp", t0);

    cache.put_at("fp", response("second"), Duration::from_secs(60), t0);
    let entry = cache.get_at("fp", t0).unwrap();
    assert_eq!(entry.response.content, "second");
    assert_eq!(entry.hit_count, 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_clear_returns_count() {
    let cache = ResponseCache::new(Duration::from_secs(60), None);
    cache.insert("a", response("a"));
    cache.insert("b", response("b"));

    assert_eq!(cache.clear(), 2);
    assert_eq!(cache.clear(), 0);
    assert_eq!(cache.stats().entry_count, 0);
}

#[test]
fn test_sweep_removes_only_expired() {
    let cache = ResponseCache::new(Duration::from_secs(60), None);
    let t0 = Instant::now();
    cache.put_at("short", response("a"), Duration::from_secs(1), t0);
    cache.put_at("long", response("b"), Duration::from_secs(100), t0);

    assert_eq!(cache.sweep_expired_at(t0 + Duration::from_secs(5)), 1);
    assert!(cache.get_at("long", t0 + Duration::from_secs(5)).is_some());
}

#[test]
fn test_max_entries_evicts_oldest() {
    let cache = ResponseCache::new(Duration::from_secs(60), Some(2));
    let t0 = Instant::now();
    cache.put_at("a", response("a"), Duration::from_secs(60), t0);
    cache.put_at("b", response("b"), Duration::from_secs(60), t0 + Duration::from_secs(1));
    cache.put_at("c", response("c"), Duration::from_secs(60), t0 + Duration::from_secs(2));

    let now = t0 + Duration::from_secs(3);
    assert_eq!(cache.len(), 2);
    assert!(cache.get_at("a", now).is_none());
    assert!(cache.get_at("b", now).is_some());
    assert!(cache.get_at("c", now).is_some());
}

#[tokio::test]
async fn test_concurrent_puts_same_digest_keep_one_entry() {
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(60), None));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache.insert("fp", response(&format!("writer-{i}")));
                let _ = cache.get("fp");
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(cache.len(), 1);
    let entry = cache.get("fp").unwrap();
    assert!(entry.response.content.starts_with("writer-"));
}

#[tokio::test]
async fn test_sweeper_runs_until_aborted() {
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(60), None));
    cache.put("fp", response("a"), Duration::ZERO);

    let handle = Arc::clone(&cache).spawn_sweeper(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(cache.is_empty());
    handle.abort();
}
