//! Integration tests for the allow-list cache.
//!
//! The authority is a scripted `MockAuthority`; snapshots live in a fresh
//! temp directory per test. Timer-driven tests use paused Tokio time.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tempfile::TempDir;
use tokio::time;
use warden_allowlist::{
    normalize, AllowlistCache, AllowlistConfig, LoadError, RefreshError,
    SetSource, Snapshot, SnapshotEntry, SnapshotStore,
};
use warden_protocol::Session;
use warden_transport::mock::{Failure, MockAuthority};

// =========================================================================
// Helpers
// =========================================================================

const FIRST: &str = "abcd1234-0000-0000-0000-000000000001";
const SECOND: &str = "ef567890-0000-0000-0000-000000000002";
const STRANGER: &str = "ffffffffffffffffffffffffffffffff";

fn random_identity(rng: &mut impl Rng) -> String {
    (0..32)
        .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap())
        .collect()
}

/// Same identity, formatted the way a different system might send it.
fn reformat(identity: &str, rng: &mut impl Rng) -> String {
    let mut out = String::new();
    for (i, c) in identity.chars().enumerate() {
        if matches!(i, 8 | 12 | 16 | 20) && rng.random_bool(0.5) {
            out.push('-');
        }
        if rng.random_bool(0.5) {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn snapshot_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("allowlist-cache.json")
}

fn cache_with(
    mock: &Arc<MockAuthority>,
    restricted: bool,
    config: AllowlistConfig,
) -> AllowlistCache<MockAuthority> {
    AllowlistCache::new(
        Arc::clone(mock),
        Session::new("sk", "sid"),
        restricted,
        config,
    )
}

fn restricted_cache(
    mock: &Arc<MockAuthority>,
    dir: &TempDir,
) -> AllowlistCache<MockAuthority> {
    cache_with(
        mock,
        true,
        AllowlistConfig::with_snapshot_path(snapshot_path(dir)),
    )
}

fn persisted(path: &Path) -> Vec<String> {
    let mut ids: Vec<_> = SnapshotStore::new(path)
        .load()
        .unwrap()
        .identities
        .into_iter()
        .map(|e| e.identity)
        .collect();
    ids.sort();
    ids
}

fn write_snapshot(path: &Path, identities: Vec<SnapshotEntry>) {
    SnapshotStore::new(path)
        .save(&Snapshot { identities })
        .unwrap();
}

// =========================================================================
// Unrestricted
// =========================================================================

#[tokio::test]
async fn test_unrestricted_allows_everyone() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_with(
        &mock,
        false,
        AllowlistConfig::with_snapshot_path(snapshot_path(&dir)),
    );
    let mut rng = rand::rng();

    for _ in 0..50 {
        assert!(cache.is_allowed(&random_identity(&mut rng)));
    }
    assert!(cache.is_allowed(""));
    assert!(cache.is_allowed("not-an-identity"));
}

#[tokio::test]
async fn test_unrestricted_refresh_fails_without_fetching() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_with(
        &mock,
        false,
        AllowlistConfig::with_snapshot_path(snapshot_path(&dir)),
    );

    let err = cache.refresh().await.unwrap_err();

    assert!(matches!(err, RefreshError::Unrestricted));
    assert_eq!(mock.allowlist_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unrestricted_start_is_noop() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_with(
        &mock,
        false,
        AllowlistConfig::with_snapshot_path(snapshot_path(&dir)),
    );

    cache.start();
    time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(mock.allowlist_calls(), 0);
    assert!(!cache.status().refreshing);
    assert!(!snapshot_path(&dir).exists());
    cache.stop().await;
}

// =========================================================================
// Refresh
// =========================================================================

#[tokio::test]
async fn test_refresh_then_any_format_query_matches() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into(), SECOND.into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);

    assert_eq!(cache.refresh().await.unwrap(), 2);

    assert!(cache.is_allowed(FIRST));
    assert!(cache.is_allowed(&FIRST.to_uppercase()));
    assert!(cache.is_allowed(&normalize(FIRST).to_uppercase()));
    assert!(cache.is_allowed(SECOND));
    assert!(!cache.is_allowed(STRANGER));
    assert_eq!(cache.status().source, SetSource::Remote);
}

#[tokio::test]
async fn test_normalized_equal_queries_get_equal_answers() {
    let mut rng = rand::rng();
    let members: Vec<String> =
        (0..20).map(|_| random_identity(&mut rng)).collect();
    let raw: Vec<String> =
        members.iter().map(|id| reformat(id, &mut rng)).collect();

    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(raw));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.refresh().await.unwrap();

    let mut queries = members.clone();
    queries.extend((0..20).map(|_| random_identity(&mut rng)));
    for query in &queries {
        let a = reformat(query, &mut rng);
        let b = reformat(query, &mut rng);
        assert_eq!(normalize(&a), normalize(&b));
        assert_eq!(cache.is_allowed(&a), cache.is_allowed(&b), "{a} vs {b}");
        assert_eq!(cache.is_allowed(&a), members.contains(query));
    }
}

#[tokio::test]
async fn test_refresh_replaces_set_and_persists_normalized() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into(), SECOND.into()]));
    mock.push_allowlist(Ok(vec![STRANGER.to_uppercase()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);

    cache.refresh().await.unwrap();
    assert_eq!(
        persisted(&snapshot_path(&dir)),
        vec![normalize(FIRST), normalize(SECOND)]
    );

    cache.refresh().await.unwrap();

    assert!(!cache.is_allowed(FIRST));
    assert!(cache.is_allowed(STRANGER));
    assert_eq!(cache.len(), 1);
    assert_eq!(persisted(&snapshot_path(&dir)), vec![STRANGER.to_string()]);
}

#[tokio::test]
async fn test_refresh_applies_and_persists_non_standard_entries() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into(), "Steve-Admin".into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);

    assert_eq!(cache.refresh().await.unwrap(), 2);

    assert!(cache.is_allowed(FIRST));
    assert!(cache.is_allowed("steveadmin"));
    assert!(cache.is_allowed("STEVE-admin"));
    assert_eq!(
        persisted(&snapshot_path(&dir)),
        vec![normalize(FIRST), "steveadmin".to_string()]
    );
}

#[tokio::test]
async fn test_snapshot_keeps_reply_order_without_duplicates() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![
        STRANGER.into(),
        FIRST.into(),
        STRANGER.to_uppercase(),
        SECOND.into(),
    ]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);

    assert_eq!(cache.refresh().await.unwrap(), 3);

    let order: Vec<_> = SnapshotStore::new(snapshot_path(&dir))
        .load()
        .unwrap()
        .identities
        .into_iter()
        .map(|e| e.identity)
        .collect();
    assert_eq!(
        order,
        vec![STRANGER.to_string(), normalize(FIRST), normalize(SECOND)]
    );
}

#[tokio::test]
async fn test_reload_after_refresh_keeps_only_full_length_ids() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into(), "Steve-Admin".into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.refresh().await.unwrap();

    assert_eq!(cache.reload_from_persisted().unwrap(), 1);

    assert!(cache.is_allowed(FIRST));
    assert!(!cache.is_allowed("steveadmin"));
}

#[tokio::test]
async fn test_failed_refresh_leaves_set_and_snapshot_unchanged() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    mock.push_allowlist(Err(Failure::Status(503)));
    mock.push_allowlist(Err(Failure::Rejected("Session expired".into())));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.refresh().await.unwrap();
    let before = fs::read(snapshot_path(&dir)).unwrap();

    let status_err = cache.refresh().await.unwrap_err();
    let rejected_err = cache.refresh().await.unwrap_err();

    assert!(matches!(status_err, RefreshError::Transport(_)));
    assert!(rejected_err.to_string().contains("Session expired"));
    assert!(cache.is_allowed(FIRST));
    assert_eq!(cache.len(), 1);
    assert_eq!(fs::read(snapshot_path(&dir)).unwrap(), before);
}

#[tokio::test]
async fn test_empty_reply_refused_by_default() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    mock.push_allowlist(Ok(vec![]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.refresh().await.unwrap();

    let empty = cache.refresh().await.unwrap_err();

    assert!(matches!(empty, RefreshError::EmptyAllowlist { received: 0 }));
    assert!(cache.is_allowed(FIRST));
    assert_eq!(persisted(&snapshot_path(&dir)), vec![normalize(FIRST)]);
}

#[tokio::test]
async fn test_empty_reply_applied_when_accepted() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    mock.push_allowlist(Ok(vec![]));
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_with(
        &mock,
        true,
        AllowlistConfig {
            accept_empty: true,
            ..AllowlistConfig::with_snapshot_path(snapshot_path(&dir))
        },
    );
    cache.refresh().await.unwrap();

    assert_eq!(cache.refresh().await.unwrap(), 0);

    assert!(!cache.is_allowed(FIRST));
    assert!(cache.is_empty());
    assert!(persisted(&snapshot_path(&dir)).is_empty());
}

#[tokio::test]
async fn test_snapshot_write_failure_still_applies_fetched_set() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    let dir = tempfile::tempdir().unwrap();
    // The snapshot's parent is a regular file, so the write must fail.
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"").unwrap();
    let cache = cache_with(
        &mock,
        true,
        AllowlistConfig::with_snapshot_path(blocker.join("cache.json")),
    );

    assert_eq!(cache.refresh().await.unwrap(), 1);
    assert!(cache.is_allowed(FIRST));
}

#[tokio::test]
async fn test_concurrent_refreshes_leave_set_and_snapshot_consistent() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    mock.push_allowlist(Ok(vec![SECOND.into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);

    let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
    a.unwrap();
    b.unwrap();

    let on_disk = persisted(&snapshot_path(&dir));
    assert_eq!(on_disk.len(), 1);
    assert!(cache.is_allowed(&on_disk[0]));
    assert_eq!(cache.len(), 1);
}

// =========================================================================
// Reload from snapshot
// =========================================================================

#[tokio::test]
async fn test_reload_drops_expired_and_malformed_entries() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let permanent = "1".repeat(32);
    let expired = "2".repeat(32);
    let future = "3".repeat(32);
    write_snapshot(
        &snapshot_path(&dir),
        vec![
            SnapshotEntry::permanent(&permanent),
            SnapshotEntry::expiring(&expired, now - chrono::Duration::hours(1)),
            SnapshotEntry::expiring(&future, now + chrono::Duration::days(1)),
            SnapshotEntry::permanent("xyz"),
        ],
    );
    let cache = restricted_cache(&mock, &dir);

    assert_eq!(cache.reload_from_persisted().unwrap(), 2);

    assert!(cache.is_allowed(&permanent));
    assert!(!cache.is_allowed(&expired));
    assert!(cache.is_allowed(&future));
    assert_eq!(cache.status().source, SetSource::Snapshot);
    assert_eq!(mock.allowlist_calls(), 0, "reload never fetches");
}

#[tokio::test]
async fn test_reload_replaces_fetched_set() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.refresh().await.unwrap();
    // Operator edits the snapshot by hand.
    write_snapshot(
        &snapshot_path(&dir),
        vec![SnapshotEntry::permanent(SECOND)],
    );

    cache.reload_from_persisted().unwrap();

    assert!(!cache.is_allowed(FIRST));
    assert!(cache.is_allowed(SECOND));
}

#[tokio::test]
async fn test_reload_missing_snapshot_is_empty_set() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);

    assert_eq!(cache.reload_from_persisted().unwrap(), 0);
    assert!(!cache.is_allowed(FIRST));
}

#[tokio::test]
async fn test_reload_corrupt_snapshot_is_error_and_keeps_set() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.refresh().await.unwrap();
    fs::write(snapshot_path(&dir), b"{ truncated").unwrap();

    let err = cache.reload_from_persisted().unwrap_err();

    assert!(matches!(err, LoadError::Snapshot(_)));
    assert!(cache.is_allowed(FIRST));
}

// =========================================================================
// Periodic refresh
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_loads_snapshot_then_refreshes_immediately() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(
        &snapshot_path(&dir),
        vec![SnapshotEntry::permanent(FIRST)],
    );
    let cache = restricted_cache(&mock, &dir);

    cache.start();
    // Snapshot is applied synchronously, before the first fetch runs.
    assert!(cache.is_allowed(FIRST));

    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(mock.allowlist_calls(), 1);
    // The default mock fetch fails, so the snapshot set stays.
    assert!(cache.is_allowed(FIRST));
    assert!(cache.status().refreshing);
    cache.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_with_corrupt_snapshot_denies_until_refresh() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    fs::write(snapshot_path(&dir), b"garbage").unwrap();
    let cache = restricted_cache(&mock, &dir);

    cache.start();

    assert!(!cache.is_allowed(FIRST));
    assert_eq!(cache.status().source, SetSource::Empty);
    cache.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_periodic_refresh_survives_failures() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Err(Failure::Status(500)));
    mock.push_allowlist(Err(Failure::Rejected("Try again later".into())));
    mock.push_allowlist(Ok(vec![SECOND.into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    let fifteen_min = Duration::from_secs(15 * 60);

    cache.start();
    time::sleep(fifteen_min * 2 + Duration::from_secs(1)).await;

    assert_eq!(mock.allowlist_calls(), 3);
    assert!(cache.is_allowed(SECOND));
    assert_eq!(persisted(&snapshot_path(&dir)), vec![normalize(SECOND)]);
    cache.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_halts_refresh() {
    let mock = Arc::new(MockAuthority::new());
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.start();
    time::sleep(Duration::from_secs(1)).await;

    cache.stop().await;
    cache.stop().await;
    time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(mock.allowlist_calls(), 1);
    assert!(!cache.status().refreshing);

    // Stopped caches don't restart.
    cache.start();
    time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(mock.allowlist_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_alongside_periodic_task() {
    let mock = Arc::new(MockAuthority::new());
    mock.push_allowlist(Ok(vec![FIRST.into()]));
    mock.push_allowlist(Ok(vec![SECOND.into()]));
    let dir = tempfile::tempdir().unwrap();
    let cache = restricted_cache(&mock, &dir);
    cache.start();
    time::sleep(Duration::from_secs(1)).await;
    assert!(cache.is_allowed(FIRST));

    cache.refresh().await.unwrap();

    assert!(cache.is_allowed(SECOND));
    assert!(!cache.is_allowed(FIRST));
    cache.stop().await;
}
