/// Explicit session holder
///
/// Replaces an ambient platform-client singleton: the holder is constructed
/// once and injected into the components that need the current session.
/// Observers register with explicit handles and are notified on sign-in,
/// sign-out and refresh.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// The client's read-only view of the platform session
#[derive(Debug, Clone)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: String,
}

/// Auth state change events delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    Refreshed,
}

type AuthListener = Box<dyn Fn(AuthChange, Option<&SessionData>) + Send + Sync>;

/// Handle returned by `subscribe`; pass back to `unsubscribe` to deregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Holds the current session and its subscribers
pub struct SessionHolder {
    session: RwLock<Option<SessionData>>,
    listeners: Mutex<HashMap<u64, AuthListener>>,
    next_id: AtomicU64,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current session, if any
    pub fn current(&self) -> Option<SessionData> {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// Access token of the current session, if any
    pub fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }

    /// User id of the current session, if any
    pub fn user_id(&self) -> Option<String> {
        self.current().map(|s| s.user_id)
    }

    /// Install a new session and notify subscribers
    pub fn set_session(&self, data: SessionData) {
        let change = {
            let mut guard = self.session.write().expect("session lock poisoned");
            let change = if guard.is_some() {
                AuthChange::Refreshed
            } else {
                AuthChange::SignedIn
            };
            *guard = Some(data);
            change
        };
        self.notify(change);
    }

    /// Drop the session and notify subscribers. Idempotent.
    pub fn clear(&self) {
        let had_session = {
            let mut guard = self.session.write().expect("session lock poisoned");
            guard.take().is_some()
        };
        if had_session {
            self.notify(AuthChange::SignedOut);
        }
    }

    /// Register a listener for auth state changes
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(AuthChange, Option<&SessionData>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .insert(id, Box::new(listener));
        SubscriptionHandle(id)
    }

    /// Deregister a listener
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .remove(&handle.0);
    }

    fn notify(&self, change: AuthChange) {
        let session = self.current();
        let listeners = self.listeners.lock().expect("listener lock poisoned");
        for listener in listeners.values() {
            listener(change, session.as_ref());
        }
    }
}

impl Default for SessionHolder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn session(user: &str) -> SessionData {
        SessionData {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            user_id: user.to_string(),
        }
    }

    #[test]
    fn set_and_clear_session() {
        let holder = SessionHolder::new();
        assert!(holder.current().is_none());

        holder.set_session(session("user-1"));
        assert_eq!(holder.user_id(), Some("user-1".to_string()));

        holder.clear();
        assert!(holder.current().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let holder = SessionHolder::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        holder.subscribe(move |change, _| {
            if change == AuthChange::SignedOut {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        holder.set_session(session("user-1"));
        holder.clear();
        holder.clear();
        holder.clear();

        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribers_receive_changes_until_unsubscribed() {
        let holder = SessionHolder::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        let handle = holder.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        holder.set_session(session("user-1"));
        assert_eq!(events.load(Ordering::SeqCst), 1);

        holder.unsubscribe(handle);
        holder.clear();
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_set_is_a_refresh() {
        let holder = SessionHolder::new();
        let saw_refresh = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&saw_refresh);
        holder.subscribe(move |change, _| {
            if change == AuthChange::Refreshed {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        holder.set_session(session("user-1"));
        holder.set_session(session("user-1"));
        assert_eq!(saw_refresh.load(Ordering::SeqCst), 1);
    }
}
