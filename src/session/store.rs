//! Page sessions and their widget storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::widget::{ChatWidget, WidgetOptions};

/// Default idle timeout (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// One page session holding one chat widget.
///
/// Cloning is cheap and shares the same widget.
#[derive(Debug, Clone)]
pub struct WidgetSession {
    inner: Arc<WidgetSessionInner>,
}

#[derive(Debug)]
struct WidgetSessionInner {
    id: String,
    widget: Mutex<ChatWidget>,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

impl WidgetSession {
    fn new(id: String, options: WidgetOptions) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(WidgetSessionInner {
                id,
                widget: Mutex::new(ChatWidget::new(options)),
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Run `f` with exclusive access to the widget.
    ///
    /// Keep `f` synchronous: the lock must never be held across an `.await`.
    pub fn with_widget<R>(&self, f: impl FnOnce(&mut ChatWidget) -> R) -> R {
        let result = {
            let mut guard = self
                .inner
                .widget
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        };
        self.touch();
        result
    }

    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Whether the session has been idle longer than `ttl`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // Negative durations (clock skew) count as fresh.
        (Utc::now() - last).to_std().is_ok_and(|idle| idle > ttl)
    }
}

/// Thread-safe store of page sessions.
#[derive(Debug, Clone)]
pub struct WidgetStore {
    inner: Arc<WidgetStoreInner>,
}

#[derive(Debug)]
struct WidgetStoreInner {
    sessions: RwLock<HashMap<String, WidgetSession>>,
    options: WidgetOptions,
    ttl: Duration,
}

impl Default for WidgetStore {
    fn default() -> Self {
        Self::new(WidgetOptions::default(), DEFAULT_SESSION_TTL)
    }
}

impl WidgetStore {
    /// Create a store whose widgets all use `options`.
    #[must_use]
    pub fn new(options: WidgetOptions, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(WidgetStoreInner {
                sessions: RwLock::new(HashMap::new()),
                options,
                ttl,
            }),
        }
    }

    /// Create a session with a fresh widget, pruning idle ones first.
    #[must_use]
    pub fn create(&self) -> WidgetSession {
        let pruned = self.cleanup_expired();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned idle widget sessions");
        }

        let id = Uuid::new_v4().to_string();
        let session = WidgetSession::new(id.clone(), self.inner.options.clone());
        self.write().insert(id, session.clone());
        session
    }

    /// Look a session up. Expired sessions are dropped and reported missing.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<WidgetSession> {
        let session = self.read().get(id).cloned()?;
        if session.is_expired(self.inner.ttl) {
            self.remove(id);
            return None;
        }
        Some(session)
    }

    /// Tear a session down. A reply still in flight for it will be discarded.
    pub fn remove(&self, id: &str) -> Option<WidgetSession> {
        self.write().remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle longer than the store's TTL.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.inner.ttl;
        let mut guard = self.write();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired(ttl));
        before - guard.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, WidgetSession>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, WidgetSession>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatResponse;

    #[test]
    fn test_store_lifecycle() {
        let store = WidgetStore::default();
        assert!(store.is_empty());

        let session = store.create();
        assert_eq!(store.len(), 1);

        let retrieved = store.get(session.id()).unwrap();
        assert_eq!(retrieved.id(), session.id());

        store.remove(session.id());
        assert!(store.is_empty());
        assert!(store.get(session.id()).is_none());
    }

    #[test]
    fn test_sessions_share_one_widget() {
        let store = WidgetStore::default();
        let session = store.create();
        let other_handle = store.get(session.id()).unwrap();

        session.with_widget(|w| w.begin_submit("hello"));

        assert!(other_handle.with_widget(|w| w.is_busy()));
    }

    #[test]
    fn test_widgets_are_independent() {
        let store = WidgetStore::default();
        let a = store.create();
        let b = store.create();

        a.with_widget(|w| {
            w.begin_submit("only in a");
            w.complete(Ok(ChatResponse::with_answer("yes")));
        });

        assert_eq!(a.with_widget(|w| w.transcript().len()), 2);
        assert!(b.with_widget(|w| w.transcript().is_empty()));
    }

    #[test]
    fn test_expired_sessions_are_pruned() {
        let store = WidgetStore::new(WidgetOptions::default(), Duration::ZERO);
        let session = store.create();
        std::thread::sleep(Duration::from_millis(5));

        assert!(store.get(session.id()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_fresh_session_is_not_expired() {
        let store = WidgetStore::default();
        let session = store.create();
        assert!(!session.is_expired(DEFAULT_SESSION_TTL));
        assert_eq!(store.cleanup_expired(), 0);
    }
}
