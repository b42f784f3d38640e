//! Typed front door onto the [`SessionStore`] (§4.D).
//!
//! Pipeline steps never touch the raw store: they go through `SensitiveDataManager`, which
//! pins down *which* placeholder kind a step is allowed to mint and keeps the session id out of
//! step signatures by carrying it internally. Mirrors how the teacher wraps raw tool state behind
//! `UnifiedMcpServer` rather than handing callers the lock directly.

use uuid::Uuid;

use crate::session_store::{PlaceholderKind, SessionStore};

/// Manages redaction/unredaction for exactly one request, bound to one session id.
#[derive(Clone)]
pub struct SensitiveDataManager {
    store: SessionStore,
    session: Uuid,
}

impl SensitiveDataManager {
    /// Open a fresh session against `store` for one request.
    pub async fn new(store: SessionStore) -> Self {
        let session = store.open_session().await;
        Self { store, session }
    }

    /// Wrap an existing session, e.g. to share state between the input and output pipelines for
    /// the same request.
    pub fn for_session(store: SessionStore, session: Uuid) -> Self {
        Self { store, session }
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    /// Redact a detected secret, returning the placeholder text to splice into the request body.
    pub async fn redact_secret(&self, value: impl Into<String>) -> String {
        self.store
            .store(self.session, PlaceholderKind::Secret, value.into())
            .await
            .expect("session opened by this manager is always live")
    }

    /// Redact a detected PII entity, returning the placeholder text.
    pub async fn redact_pii(&self, value: impl Into<String>) -> String {
        self.store
            .store(self.session, PlaceholderKind::Pii, value.into())
            .await
            .expect("session opened by this manager is always live")
    }

    /// Resolve a placeholder back to its cleartext, if one exists in this session.
    pub async fn unredact(&self, placeholder: &str) -> Option<String> {
        self.store.lookup(self.session, placeholder).await
    }

    /// Release every value this session is holding. Must be called exactly once the response has
    /// been fully streamed to the client — never on a partial/cancelled response, since the
    /// placeholders might still need resolving by a retry.
    pub async fn secure_cleanup(self) {
        self.store.close_session(self.session).await;
    }
}
