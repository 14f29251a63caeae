//! Authentication state derived from the stored credential token

pub mod routes;
pub mod store;

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::auth::{Clock, Identity, TokenDecoder};
use crate::config::SessionConfig;

pub use routes::{navigate, DashboardPage, Route};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing derived yet
    Unknown,
    Checking,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_) | SessionStatus::Unauthenticated)
    }
}

/// Observable session state. `loading` is only true until the first
/// derivation after mount has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub loading: bool,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            status: SessionStatus::Unknown,
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.status {
            SessionStatus::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "route", rename_all = "snake_case")]
pub enum RenderDecision {
    Render,
    RedirectTo(String),
    ShowLoadingPlaceholder,
    NotFound,
}

/// Gate for protected views. Never redirects or renders before the
/// session has resolved.
pub fn can_render(status: &SessionStatus, login_route: &str) -> RenderDecision {
    match status {
        SessionStatus::Unknown | SessionStatus::Checking => RenderDecision::ShowLoadingPlaceholder,
        SessionStatus::Authenticated(_) => RenderDecision::Render,
        SessionStatus::Unauthenticated => RenderDecision::RedirectTo(login_route.to_string()),
    }
}

/// Derive the session from whatever token is stored right now.
///
/// Malformed and expired tokens are deleted from the store so they are not
/// picked up again by the next check.
pub fn derive_state(
    store: &dyn CredentialStore,
    decoder: &dyn TokenDecoder,
    clock: &dyn Clock,
) -> SessionStatus {
    let Some(token) = store.get() else {
        tracing::debug!("No stored credential");
        return SessionStatus::Unauthenticated;
    };

    match decoder.decode(&token) {
        Err(e) => {
            tracing::warn!("Invalid token: {}", e);
            discard_token(store);
            SessionStatus::Unauthenticated
        }
        Ok(claims) if claims.is_expired_at(clock.now()) => {
            tracing::info!("Stored credential for {} has expired", claims.name);
            discard_token(store);
            SessionStatus::Unauthenticated
        }
        Ok(claims) => SessionStatus::Authenticated(claims.identity()),
    }
}

fn discard_token(store: &dyn CredentialStore) {
    if let Err(e) = store.delete() {
        tracing::warn!("Failed to delete stale credential: {}", e);
    }
}

struct GuardInner {
    store: Arc<dyn CredentialStore>,
    decoder: Arc<dyn TokenDecoder>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<SessionState>,
}

impl GuardInner {
    fn check(&self) {
        let previous = self.state.borrow().status.clone();
        self.state.send_modify(|s| s.status = SessionStatus::Checking);

        let status = derive_state(self.store.as_ref(), self.decoder.as_ref(), self.clock.as_ref());
        if previous != status {
            match &status {
                SessionStatus::Authenticated(identity) => {
                    tracing::info!("Session authenticated as {} ({})", identity.name, identity.id)
                }
                _ => tracing::info!("Session is not authenticated"),
            }
        }

        self.state.send_modify(|s| {
            s.status = status;
            s.loading = false;
        });
    }
}

/// Owns the authentication state of one mounted application shell.
///
/// Mounting derives the state once and subscribes to credential changes made
/// by other contexts; each notification re-derives. Tearing down (or
/// dropping) the guard releases the subscription.
pub struct SessionGuard {
    inner: Arc<GuardInner>,
    login_route: String,
    subscription: Option<Subscription>,
}

impl SessionGuard {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        decoder: Arc<dyn TokenDecoder>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(GuardInner {
                store,
                decoder,
                clock,
                state,
            }),
            login_route: config.login_route.clone(),
            subscription: None,
        }
    }

    pub fn mount(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        self.inner.check();

        let weak: Weak<GuardInner> = Arc::downgrade(&self.inner);
        let subscription = self.inner.store.subscribe(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("Credential changed in another context, re-checking");
                inner.check();
            }
        }));
        self.subscription = Some(subscription);
    }

    pub fn teardown(&mut self) {
        self.subscription = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Re-derive the state from the store
    pub fn recheck(&self) {
        self.inner.check();
    }

    /// Force the session closed after the server rejected the credential.
    pub fn expire(&self) {
        tracing::info!("Credential rejected by server, closing session");
        discard_token(self.inner.store.as_ref());
        self.inner.state.send_modify(|s| {
            s.status = SessionStatus::Unauthenticated;
            s.loading = false;
        });
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn decision(&self) -> RenderDecision {
        can_render(&self.inner.state.borrow().status, &self.login_route)
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, JwtDecoder, ManualClock, TokenError};
    use crate::config::PanelConfig;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn token(claims: serde_json::Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap()
    }

    fn guard_with(store: Arc<MemoryCredentialStore>) -> SessionGuard {
        SessionGuard::new(
            store,
            Arc::new(JwtDecoder),
            Arc::new(ManualClock::new(NOW)),
            &PanelConfig::development().session,
        )
    }

    #[test]
    fn absent_token_is_unauthenticated_without_delete() {
        let store = MemoryCredentialStore::new();
        let status = derive_state(&store, &JwtDecoder, &ManualClock::new(NOW));
        assert_eq!(status, SessionStatus::Unauthenticated);
        assert_eq!(store.delete_count(), 0);
    }

    #[test]
    fn expired_token_is_deleted_exactly_once() {
        for offset in [1, 10, 3600, NOW] {
            let store = MemoryCredentialStore::with_token(token(json!({
                "userId": "u1", "name": "Alice", "exp": NOW - offset
            })));
            let status = derive_state(&store, &JwtDecoder, &ManualClock::new(NOW));
            assert_eq!(status, SessionStatus::Unauthenticated);
            assert_eq!(store.delete_count(), 1);
            assert_eq!(store.get(), None);
        }
    }

    #[test]
    fn future_or_missing_exp_is_authenticated() {
        for claims in [
            json!({ "userId": "u1", "name": "Alice", "exp": NOW + 60 }),
            json!({ "userId": "u1", "name": "Alice", "exp": NOW }),
            json!({ "userId": "u1", "name": "Alice" }),
        ] {
            let store = MemoryCredentialStore::with_token(token(claims));
            let status = derive_state(&store, &JwtDecoder, &ManualClock::new(NOW));
            assert_eq!(
                status,
                SessionStatus::Authenticated(Identity { id: "u1".into(), name: "Alice".into() })
            );
            assert_eq!(store.delete_count(), 0);
        }
    }

    #[test]
    fn loosely_typed_claims_keep_the_session() {
        for claims in [
            json!({ "userId": "u1", "sub": "u1", "name": "Alice", "exp": NOW + 60 }),
            json!({ "userId": 1, "name": "Alice", "exp": (NOW + 60) as f64 + 0.5 }),
            json!({ "id": "u1", "name": "Alice", "exp": NOW as f64 + 0.25 }),
        ] {
            let store = MemoryCredentialStore::with_token(token(claims.clone()));
            let status = derive_state(&store, &JwtDecoder, &ManualClock::new(NOW));
            assert!(matches!(status, SessionStatus::Authenticated(_)), "claims {}", claims);
            assert_eq!(store.delete_count(), 0);
            assert!(store.get().is_some());
        }
    }

    #[test]
    fn malformed_token_is_unauthenticated_and_removed() {
        for garbage in ["", "abc", "a.b.c", "....", "eyJhbGciOiJIUzI1NiJ9.bm90IGpzb24.x"] {
            let store = MemoryCredentialStore::with_token(garbage);
            let status = derive_state(&store, &JwtDecoder, &ManualClock::new(NOW));
            assert_eq!(status, SessionStatus::Unauthenticated, "token {:?}", garbage);
            assert_eq!(store.delete_count(), 1);
        }
    }

    struct FailingDecoder;

    impl TokenDecoder for FailingDecoder {
        fn decode(&self, _token: &str) -> Result<Claims, TokenError> {
            Err(TokenError::Malformed(jsonwebtoken::errors::ErrorKind::InvalidToken.into()))
        }
    }

    #[test]
    fn decoder_failure_never_escapes() {
        let store = MemoryCredentialStore::with_token("whatever");
        let status = derive_state(&store, &FailingDecoder, &ManualClock::new(NOW));
        assert_eq!(status, SessionStatus::Unauthenticated);
    }

    #[test]
    fn gate_waits_for_resolution() {
        assert_eq!(can_render(&SessionStatus::Unknown, "/login"), RenderDecision::ShowLoadingPlaceholder);
        assert_eq!(can_render(&SessionStatus::Checking, "/login"), RenderDecision::ShowLoadingPlaceholder);
        assert_eq!(
            can_render(&SessionStatus::Unauthenticated, "/login"),
            RenderDecision::RedirectTo("/login".into())
        );
        let identity = Identity { id: "1".into(), name: "A".into() };
        assert_eq!(can_render(&SessionStatus::Authenticated(identity), "/login"), RenderDecision::Render);
    }

    #[test]
    fn mount_resolves_and_clears_loading() {
        let store = Arc::new(MemoryCredentialStore::with_token(token(json!({
            "userId": "u1", "name": "Alice", "exp": NOW + 60
        }))));
        let mut guard = guard_with(store.clone());

        let before = guard.state();
        assert!(before.loading);
        assert_eq!(before.status, SessionStatus::Unknown);
        assert_eq!(guard.decision(), RenderDecision::ShowLoadingPlaceholder);

        guard.mount();
        let after = guard.state();
        assert!(!after.loading);
        assert!(after.is_authenticated());
        assert_eq!(after.identity().map(|i| i.name.as_str()), Some("Alice"));
        assert_eq!(guard.decision(), RenderDecision::Render);
    }

    #[test]
    fn expired_token_redirects_to_login() {
        let store = Arc::new(MemoryCredentialStore::with_token(token(json!({
            "userId": "u1", "name": "Alice", "exp": NOW - 10
        }))));
        let mut guard = guard_with(store.clone());
        guard.mount();

        assert_eq!(guard.state().status, SessionStatus::Unauthenticated);
        assert_eq!(guard.decision(), RenderDecision::RedirectTo("/login".into()));
        assert_eq!(store.delete_count(), 1);
    }

    #[test]
    fn external_logout_and_login_are_followed() {
        let valid = token(json!({ "userId": "u1", "name": "Alice", "exp": NOW + 60 }));
        let store = Arc::new(MemoryCredentialStore::with_token(valid.clone()));
        let mut guard = guard_with(store.clone());
        guard.mount();
        assert!(guard.state().is_authenticated());

        // Another tab logs out
        store.simulate_external_change(None);
        let state = guard.state();
        assert_eq!(state.status, SessionStatus::Unauthenticated);
        assert!(!state.loading);

        // ...and back in
        store.simulate_external_change(Some(&valid));
        assert!(guard.state().is_authenticated());
    }

    #[test]
    fn teardown_releases_subscription() {
        let store = Arc::new(MemoryCredentialStore::new());
        let mut guard = guard_with(store.clone());
        guard.mount();
        guard.mount();
        assert_eq!(store.listener_count(), 1);

        guard.teardown();
        assert_eq!(store.listener_count(), 0);
        assert!(!guard.is_mounted());

        guard.mount();
        drop(guard);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn expire_deletes_token_and_closes_session() {
        let store = Arc::new(MemoryCredentialStore::with_token(token(json!({
            "userId": "u1", "name": "Alice"
        }))));
        let mut guard = guard_with(store.clone());
        guard.mount();
        let mut rx = guard.subscribe_state();

        guard.expire();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, SessionStatus::Unauthenticated);
        assert_eq!(store.get(), None);
    }
}
