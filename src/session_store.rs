//! Per-request secrets/PII session store (§4.C).
//!
//! Holds the mapping from stable placeholder token to the cleartext value it stands in for,
//! scoped to a single request's lifetime. Modeled the way the teacher's `UnifiedMcpServer` holds
//! its tool registry: an `Arc<RwLock<HashMap<...>>>` behind a small API, not a bare lock exposed
//! to callers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

/// What kind of placeholder a session entry represents, so the sensitive-data manager can format
/// it correctly (`REDACTED<uuid>` vs `#<uuid>#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Secret,
    Pii,
}

impl PlaceholderKind {
    /// Render a fresh placeholder token for this kind.
    pub fn format(&self, id: Uuid) -> String {
        match self {
            PlaceholderKind::Secret => format!("REDACTED<{id}>"),
            PlaceholderKind::Pii => format!("#{id}#"),
        }
    }
}

/// A single request's view into the session store: map of placeholder -> cleartext, plus the
/// workspace's custom instructions carried alongside it for steps that need both.
#[derive(Debug, Default)]
struct SessionEntry {
    values: HashMap<String, String>,
}

/// Concurrent session -> placeholder -> cleartext map, keyed by an opaque session id.
///
/// One `SessionStore` is shared across the whole process; every request gets its own session id
/// so concurrent requests never see each other's placeholders (§5).
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its id. Called once per incoming request.
    pub async fn open_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.insert(id, SessionEntry::default());
        id
    }

    /// Store `value` under a freshly generated placeholder of the given kind, returning the
    /// placeholder token to substitute into the outgoing text.
    pub async fn store(&self, session: Uuid, kind: PlaceholderKind, value: String) -> Option<String> {
        let mut sessions = self.inner.write().await;
        let entry = sessions.get_mut(&session)?;
        let placeholder = kind.format(Uuid::new_v4());
        entry.values.insert(placeholder.clone(), value);
        Some(placeholder)
    }

    /// Look up the cleartext value a placeholder stands for, if the session and placeholder are
    /// both still live.
    pub async fn lookup(&self, session: Uuid, placeholder: &str) -> Option<String> {
        self.inner.read().await.get(&session)?.values.get(placeholder).cloned()
    }

    /// Number of live placeholders for a session. Exposed for tests and diagnostics.
    pub async fn len(&self, session: Uuid) -> usize {
        self.inner
            .read()
            .await
            .get(&session)
            .map(|entry| entry.values.len())
            .unwrap_or(0)
    }

    /// Tear down a session, dropping every cleartext value it held. Called once the response is
    /// fully sent, matching `PipelineSensitiveData.secure_cleanup` in the original.
    pub async fn close_session(&self, session: Uuid) {
        self.inner.write().await.remove(&session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_lookup_roundtrip() {
        let store = SessionStore::new();
        let session = store.open_session().await;

        let placeholder = store
            .store(session, PlaceholderKind::Secret, "sk-super-secret".to_string())
            .await
            .unwrap();
        assert!(placeholder.starts_with("REDACTED<"));
        assert_eq!(store.lookup(session, &placeholder).await.unwrap(), "sk-super-secret");
    }

    #[tokio::test]
    async fn pii_placeholders_use_hash_delimiters() {
        let store = SessionStore::new();
        let session = store.open_session().await;
        let placeholder = store
            .store(session, PlaceholderKind::Pii, "jane@example.com".to_string())
            .await
            .unwrap();
        assert!(placeholder.starts_with('#'));
        assert!(placeholder.ends_with('#'));
    }

    #[tokio::test]
    async fn close_session_drops_all_values() {
        let store = SessionStore::new();
        let session = store.open_session().await;
        let placeholder = store
            .store(session, PlaceholderKind::Secret, "sk-1".to_string())
            .await
            .unwrap();

        store.close_session(session).await;
        assert!(store.lookup(session, &placeholder).await.is_none());
        assert_eq!(store.len(session).await, 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.open_session().await;
        let b = store.open_session().await;

        let placeholder = store.store(a, PlaceholderKind::Secret, "only-a".to_string()).await.unwrap();
        assert!(store.lookup(b, &placeholder).await.is_none());
        assert!(store.lookup(a, &placeholder).await.is_some());
    }

    #[tokio::test]
    async fn store_against_unknown_session_returns_none() {
        let store = SessionStore::new();
        let bogus = Uuid::new_v4();
        assert!(store.store(bogus, PlaceholderKind::Secret, "x".to_string()).await.is_none());
    }
}
