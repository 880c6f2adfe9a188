//! Credential rotation and per-user cache behavior.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use lakegate_core::{GatewayError, Identity, TokenSource};
use lakegate_gateway::{ServiceCredentialManager, UserCredentialCache};
use tests::FakeTokenSource;

const LIFETIME: Duration = Duration::from_secs(3600);
const REFRESH_PERIOD: Duration = Duration::from_secs(3000);

/// Let spawned tasks run their pending wakeups under paused time.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn bootstrap_mints_initial_credential() {
    let source = FakeTokenSource::new();
    let manager = ServiceCredentialManager::bootstrap(source.clone(), LIFETIME)
        .await
        .unwrap();

    assert_eq!(source.mint_count(), 1);
    assert_eq!(manager.epoch(), 1);
    assert_eq!(manager.current().secret(), "token-service-1");
    assert!(manager.is_within_valid_window());
}

#[tokio::test]
async fn bootstrap_fails_when_first_mint_fails() {
    let source = FakeTokenSource::new();
    source.set_failing(true);

    let result = ServiceCredentialManager::bootstrap(source, LIFETIME).await;
    assert!(matches!(
        result,
        Err(GatewayError::CredentialMintFailed(_))
    ));
}

#[tokio::test]
async fn refresh_swaps_credential_and_bumps_epoch() {
    let source = FakeTokenSource::new();
    let manager = ServiceCredentialManager::bootstrap(source.clone(), LIFETIME)
        .await
        .unwrap();

    let before = manager.current();
    manager.refresh().await.unwrap();
    let after = manager.current();

    assert_eq!(manager.epoch(), 2);
    assert_eq!(after.secret(), "token-service-2");
    // The old credential is untouched; in-flight users of it are not
    // disturbed by the swap.
    assert_eq!(before.secret(), "token-service-1");
    assert_eq!(before.epoch(), 1);
}

#[tokio::test]
async fn failed_refresh_retains_previous_credential() {
    let source = FakeTokenSource::new();
    let manager = ServiceCredentialManager::bootstrap(source.clone(), LIFETIME)
        .await
        .unwrap();

    source.set_failing(true);
    let err = manager.refresh().await.unwrap_err();
    assert!(matches!(err, GatewayError::CredentialMintFailed(_)));

    assert_eq!(manager.epoch(), 1);
    assert_eq!(manager.current().secret(), "token-service-1");
}

#[tokio::test(start_paused = true)]
async fn background_task_refreshes_on_schedule() {
    // Refresh period 50 minutes, lifetime 60: over three cycles the
    // exposed credential's age never reaches the refresh period.
    let period = Duration::from_secs(50 * 60);
    let lifetime = Duration::from_secs(60 * 60);

    let source = FakeTokenSource::new();
    let manager = ServiceCredentialManager::bootstrap(source.clone(), lifetime)
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = manager.spawn_refresh_task(period, cancel.clone());
    // The task registers its timer on first poll; let it run before
    // the clock moves.
    settle().await;

    for cycle in 2..=4u64 {
        tokio::time::advance(period).await;
        settle().await;
        assert_eq!(manager.epoch(), cycle);
        assert!(manager.current().age() < period);
        assert!(manager.is_within_valid_window());
    }

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn mint_outage_outlives_token_lifetime() {
    let source = FakeTokenSource::new();
    let manager = ServiceCredentialManager::bootstrap(source.clone(), LIFETIME)
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = manager.spawn_refresh_task(REFRESH_PERIOD, cancel.clone());
    settle().await;

    // Every scheduled refresh fails; the stale credential stays
    // current and eventually falls outside its valid window.
    source.set_failing(true);
    tokio::time::advance(LIFETIME + Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(manager.epoch(), 1);
    assert!(!manager.is_within_valid_window());

    // The task survives the outage and recovers on the next tick.
    source.set_failing(false);
    tokio::time::advance(REFRESH_PERIOD).await;
    settle().await;
    assert_eq!(manager.epoch(), 2);
    assert!(manager.is_within_valid_window());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn concurrent_reads_see_a_complete_credential() {
    let source = FakeTokenSource::new();
    let manager = ServiceCredentialManager::bootstrap(source, LIFETIME)
        .await
        .unwrap();

    let mut readers = Vec::new();
    for _ in 0..8 {
        let m = Arc::clone(&manager);
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let cred = m.current();
                // A credential is swapped whole; secret and epoch
                // always correspond.
                let n: u64 = cred
                    .secret()
                    .rsplit('-')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                assert_eq!(n, cred.epoch());
                tokio::task::yield_now().await;
            }
        }));
    }

    for _ in 0..20 {
        manager.refresh().await.unwrap();
    }
    for r in readers {
        r.await.unwrap();
    }
}

#[tokio::test]
async fn minted_user_tokens_carry_user_identity() {
    let source = FakeTokenSource::new();
    let identity = Identity::User {
        id: "u-1".to_string(),
        email: "u1@example.com".to_string(),
    };
    let minted = source.mint_token(&identity).await.unwrap();
    assert_eq!(minted.token.as_str(), "token-user:u-1-1");
}

mod user_cache {
    use super::*;
    use pretty_assertions::assert_eq;

    const TTL: Duration = Duration::from_secs(2700);

    #[tokio::test(start_paused = true)]
    async fn repeated_requests_within_ttl_share_a_credential() {
        let cache = UserCredentialCache::new(TTL, 1000);

        let first = cache.get_or_insert("u-1", "tok-a", "u1@example.com", 1);
        tokio::time::advance(TTL / 2).await;
        let second = cache.get_or_insert("u-1", "tok-a-rotated", "u1@example.com", 2);

        // TTL-bounded reuse: a changed forwarded token does not bust
        // the cache before expiry.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_replaced() {
        let cache = UserCredentialCache::new(TTL, 1000);

        let first = cache.get_or_insert("u-1", "tok-a", "u1@example.com", 1);
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        let second = cache.get_or_insert("u-1", "tok-b", "u1@example.com", 3);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.secret(), "tok-b");
        assert_eq!(second.epoch(), 3);
    }

    #[tokio::test]
    async fn distinct_users_get_distinct_credentials() {
        let cache = UserCredentialCache::new(TTL, 1000);

        let a = cache.get_or_insert("u-1", "tok-a", "u1@example.com", 1);
        let b = cache.get_or_insert("u-2", "tok-b", "u2@example.com", 1);

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.identity().key(), "user:u-1");
        assert_eq!(b.identity().key(), "user:u-2");
    }

    #[tokio::test(start_paused = true)]
    async fn oldest_entry_is_evicted_at_capacity() {
        let cache = UserCredentialCache::new(TTL, 2);

        cache.get_or_insert("u-1", "tok-1", "u1@example.com", 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_insert("u-2", "tok-2", "u2@example.com", 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.get_or_insert("u-3", "tok-3", "u3@example.com", 1);

        assert_eq!(cache.len(), 2);
        // u-1 was the oldest; a new request for it re-mints.
        let refreshed = cache.get_or_insert("u-1", "tok-1-new", "u1@example.com", 1);
        assert_eq!(refreshed.secret(), "tok-1-new");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_expired_entries() {
        let cache = UserCredentialCache::new(TTL, 1000);

        cache.get_or_insert("old", "tok-old", "old@example.com", 1);
        tokio::time::advance(TTL - Duration::from_secs(10)).await;
        cache.get_or_insert("young", "tok-young", "young@example.com", 1);
        tokio::time::advance(Duration::from_secs(11)).await;

        cache.sweep();
        assert_eq!(cache.len(), 1);
        let survivor = cache.get_or_insert("young", "tok-other", "young@example.com", 1);
        assert_eq!(survivor.secret(), "tok-young");
    }
}
