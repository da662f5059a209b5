//! Session table: maps session ids to bounded token histories.
//!
//! Each session sits behind its own async mutex, so operations on one session are
//! serialized while different sessions run in parallel. The table itself is a
//! `moka` cache with LRU eviction, which also provides the opt-in capacity cap and
//! idle expiry.
//!
//! A session evicted while a turn holds its lock is parked in a side table until the
//! turn commits, so a concurrent request for the same id waits on the same lock and the
//! committed turn is linked back into the table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use chatforge_core::{SessionId, TokenId};

use crate::context_window::ContextWindow;
use crate::session_state::SessionState;

type SharedSession = Arc<Mutex<SessionState>>;

/// Sessions evicted from the cache while locked by a turn.
type Parked = Arc<StdMutex<HashMap<SessionId, SharedSession>>>;

/// Settings for the session table.
#[derive(Debug, Clone, Default)]
pub struct SessionStoreConfig {
    pub window: ContextWindow,
    /// Evict least-recently-used sessions beyond this many. `None` keeps every session.
    pub max_sessions: Option<u64>,
    /// Expire sessions idle for this long. `None` never expires.
    pub idle_ttl: Option<Duration>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<SessionId, SharedSession>,
    parked: Parked,
    window: ContextWindow,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        let parked: Parked = Arc::default();

        let listener_parked = Arc::clone(&parked);
        let mut builder = Cache::builder()
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |key: Arc<SessionId>, session: SharedSession, cause| {
                let evicted = matches!(cause, RemovalCause::Size | RemovalCause::Expired);
                // A failed try_lock means a turn is in flight on this session.
                if evicted && session.try_lock().is_err() {
                    debug!(session_id = %key, ?cause, "Parking evicted in-flight session");
                    lock_parked(&listener_parked).insert(key.as_ref().clone(), session);
                }
            });
        if let Some(cap) = config.max_sessions {
            builder = builder.max_capacity(cap);
        }
        if let Some(ttl) = config.idle_ttl {
            builder = builder.time_to_idle(ttl);
        }

        Self {
            sessions: builder.build(),
            parked,
            window: config.window,
        }
    }

    pub fn window(&self) -> ContextWindow {
        self.window
    }

    /// Current history for `session_id`, empty if the session is unknown.
    pub async fn get(&self, session_id: &str) -> Vec<TokenId> {
        match self.lookup(session_id) {
            Some(session) => session.lock().await.history.clone(),
            None => Vec::new(),
        }
    }

    /// Replace the history, keeping only what fits in the window.
    pub async fn put(&self, session_id: &str, tokens: Vec<TokenId>) {
        let mut lease = self.checkout(session_id).await;
        lease.commit(tokens);
    }

    /// Clear the history. Returns whether the session existed.
    ///
    /// The entry itself stays in the table, so `count` is unchanged.
    pub async fn reset(&self, session_id: &str) -> bool {
        match self.lookup(session_id) {
            Some(session) => {
                session.lock().await.clear();
                debug!(session_id, "Session history cleared");
                true
            }
            None => false,
        }
    }

    /// Number of tracked sessions, including ones reset to empty.
    pub fn count(&self) -> usize {
        self.sessions.run_pending_tasks();
        // Parked sessions nobody is using any more are really gone.
        lock_parked(&self.parked).retain(|_, session| session.try_lock().is_err());
        self.sessions.entry_count() as usize
    }

    /// Lock a session for a whole get-modify-put sequence, creating it if needed.
    ///
    /// Other operations on the same session wait until the lease is dropped.
    pub async fn checkout(&self, session_id: &str) -> SessionLease {
        loop {
            let session = self.sessions.get_with(session_id.to_string(), || {
                lock_parked(&self.parked)
                    .remove(session_id)
                    .unwrap_or_else(|| {
                        debug!(session_id, "Creating session");
                        Arc::new(Mutex::new(SessionState::new(session_id)))
                    })
            });
            let guard = session.lock_owned().await;

            // The entry may have been evicted or replaced while we waited for the lock.
            match self.sessions.get(session_id) {
                Some(current) if !Arc::ptr_eq(&current, OwnedMutexGuard::mutex(&guard)) => {
                    debug!(session_id, "Session replaced while waiting; retrying");
                    continue;
                }
                Some(_) => {}
                None => {
                    self.sessions
                        .insert(session_id.to_string(), Arc::clone(OwnedMutexGuard::mutex(&guard)));
                }
            }

            return SessionLease {
                guard,
                sessions: self.sessions.clone(),
                parked: Arc::clone(&self.parked),
                window: self.window,
            };
        }
    }

    fn lookup(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions
            .get(session_id)
            .or_else(|| lock_parked(&self.parked).get(session_id).cloned())
    }
}

fn lock_parked(parked: &Parked) -> std::sync::MutexGuard<'_, HashMap<SessionId, SharedSession>> {
    parked.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to one session for the duration of a turn.
pub struct SessionLease {
    guard: OwnedMutexGuard<SessionState>,
    sessions: Cache<SessionId, SharedSession>,
    parked: Parked,
    window: ContextWindow,
}

impl SessionLease {
    pub fn session_id(&self) -> &str {
        &self.guard.session_id
    }

    pub fn history(&self) -> &[TokenId] {
        &self.guard.history
    }

    pub fn turns(&self) -> u64 {
        self.guard.turns
    }

    /// Store `tokens` as the new history after window truncation.
    ///
    /// If the session was evicted or expired during the turn, it is linked back into the
    /// table so the committed turn stays visible.
    pub fn commit(&mut self, tokens: Vec<TokenId>) {
        self.guard.history = self.window.apply(tokens);
        self.guard.turns += 1;
        self.relink();
    }

    fn relink(&self) {
        let session = OwnedMutexGuard::mutex(&self.guard);
        let session_id = &self.guard.session_id;

        let linked = self
            .sessions
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(&current, session));
        if !linked {
            debug!(session_id = %session_id, "Relinking session evicted mid-turn");
            self.sessions.insert(session_id.clone(), Arc::clone(session));
        }

        // Never hold the side table while calling into the cache: eviction can run the
        // listener on this thread.
        let mut parked = lock_parked(&self.parked);
        if parked
            .get(session_id)
            .is_some_and(|p| Arc::ptr_eq(p, session))
        {
            parked.remove(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_window::TruncationPolicy;

    fn store(window_size: usize) -> SessionStore {
        SessionStore::new(SessionStoreConfig {
            window: ContextWindow::new(window_size, TruncationPolicy::Tokens, 0),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = store(10);
        assert!(store.get("nobody").await.is_empty());
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn put_truncates_to_window_suffix() {
        let store = store(3);
        store.put("u1", vec![1, 2, 3, 4, 5]).await;
        assert_eq!(store.get("u1").await, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn put_replaces_history() {
        let store = store(10);
        store.put("u1", vec![1, 2]).await;
        store.put("u1", vec![7]).await;
        assert_eq!(store.get("u1").await, vec![7]);
    }

    #[tokio::test]
    async fn reset_clears_and_keeps_entry() {
        let store = store(10);
        store.put("u1", vec![1, 2, 3]).await;

        assert!(store.reset("u1").await);
        assert!(store.get("u1").await.is_empty());
        assert_eq!(store.count(), 1);

        // Second reset still finds the (empty) entry.
        assert!(store.reset("u1").await);
        assert!(store.get("u1").await.is_empty());
    }

    #[tokio::test]
    async fn reset_unknown_reports_missing() {
        let store = store(10);
        assert!(!store.reset("ghost").await);
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = store(10);
        store.put("a", vec![1]).await;
        store.put("b", vec![2, 2]).await;
        store.reset("a").await;

        assert!(store.get("a").await.is_empty());
        assert_eq!(store.get("b").await, vec![2, 2]);
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn lease_blocks_same_session() {
        let store = store(10);
        let mut lease = store.checkout("u1").await;

        let other = store.clone();
        let reader = tokio::spawn(async move { other.get("u1").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        lease.commit(vec![4, 2]);
        drop(lease);
        assert_eq!(reader.await.unwrap(), vec![4, 2]);
    }

    #[tokio::test]
    async fn lease_does_not_block_other_sessions() {
        let store = store(10);
        let _lease = store.checkout("u1").await;

        let result = tokio::time::timeout(Duration::from_millis(200), store.put("u2", vec![9])).await;
        assert!(result.is_ok());
        assert_eq!(store.get("u2").await, vec![9]);
    }

    fn bounded(max_sessions: Option<u64>, idle_ttl: Option<Duration>) -> SessionStore {
        SessionStore::new(SessionStoreConfig {
            window: ContextWindow::new(10, TruncationPolicy::Tokens, 0),
            max_sessions,
            idle_ttl,
        })
    }

    #[tokio::test]
    async fn capacity_cap_evicts_least_recently_used() {
        let store = bounded(Some(2), None);
        for _ in 0..20 {
            store.put("a", vec![1]).await;
            store.count();
            store.put("b", vec![2]).await;
            store.count();
        }

        store.put("c", vec![3, 3]).await;
        assert_eq!(store.count(), 2);
        assert_eq!(store.get("c").await, vec![3, 3]);
        assert_eq!(store.get("b").await, vec![2]);
        assert!(store.get("a").await.is_empty());
    }

    #[tokio::test]
    async fn commit_survives_eviction_during_turn() {
        let store = bounded(Some(1), None);
        let mut lease = store.checkout("u1").await;

        for _ in 0..20 {
            store.put("u2", vec![9]).await;
            store.count();
        }

        lease.commit(vec![4, 2]);
        drop(lease);
        assert_eq!(store.get("u1").await, vec![4, 2]);
    }

    #[tokio::test]
    async fn evicted_in_flight_session_keeps_its_lock() {
        let store = bounded(Some(1), None);
        let mut lease = store.checkout("u1").await;
        store.put("u2", vec![9]).await;
        store.count();

        let other = store.clone();
        let waiter = tokio::spawn(async move { other.checkout("u1").await.history().to_vec() });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        lease.commit(vec![4, 2]);
        drop(lease);
        assert_eq!(waiter.await.unwrap(), vec![4, 2]);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = bounded(None, Some(Duration::from_millis(50)));
        store.put("u1", vec![1, 2]).await;
        assert_eq!(store.count(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get("u1").await.is_empty());
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn commit_survives_expiry_during_turn() {
        let store = bounded(None, Some(Duration::from_millis(50)));
        let mut lease = store.checkout("u1").await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        store.count();

        lease.commit(vec![5]);
        drop(lease);
        assert_eq!(store.get("u1").await, vec![5]);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn lease_counts_turns() {
        let store = store(10);
        {
            let mut lease = store.checkout("u1").await;
            assert_eq!(lease.session_id(), "u1");
            assert_eq!(lease.turns(), 0);
            lease.commit(vec![1]);
            assert_eq!(lease.turns(), 1);
            assert_eq!(lease.history(), &[1]);
        }
        store.reset("u1").await;
        assert_eq!(store.checkout("u1").await.turns(), 0);
    }
}
