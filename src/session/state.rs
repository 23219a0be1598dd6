//! Locally owned session state. The slot is explicitly created and
//! injected into the orchestrator, so independent instances never share
//! cache; clones of one slot observe the same user.

use crate::backend::types::{AuthUser, Profile};
use std::sync::{Arc, PoisonError, RwLock};

/// Merged session identity and profile snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedUser {
    pub auth: AuthUser,
    /// `None` when the identity has no profile row.
    pub profile: Option<Profile>,
}

/// Shared slot holding the cached user.
///
/// A single slot with last-write-wins semantics: concurrent logins or
/// profile loads race and the final writer decides the snapshot. Callers
/// serialize user-initiated actions themselves.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Option<CachedUser>>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, cloned out of the slot.
    #[must_use]
    pub fn snapshot(&self) -> Option<CachedUser> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a user is currently cached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replaces the cached user after a successful reconciliation.
    pub fn set(&self, user: CachedUser) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    /// Clears the slot, typically on logout or session loss.
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use uuid::Uuid;

    fn cached_user() -> CachedUser {
        CachedUser {
            auth: AuthUser {
                id: Uuid::new_v4(),
                email: Some("marta@acceso.app".to_string()),
                phone: None,
                user_metadata: Value::Null,
            },
            profile: None,
        }
    }

    #[test]
    fn starts_empty() {
        let state = SessionState::new();
        assert!(state.snapshot().is_none());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn set_and_clear_round_trip() {
        let state = SessionState::new();
        let user = cached_user();

        state.set(user.clone());
        assert!(state.is_authenticated());
        assert_eq!(state.snapshot(), Some(user));

        state.clear();
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn clones_observe_the_same_slot() {
        let state = SessionState::new();
        let observer = state.clone();

        state.set(cached_user());
        assert!(observer.is_authenticated());

        observer.clear();
        assert!(!state.is_authenticated());
    }

    #[test]
    fn independent_instances_do_not_share_state() {
        let first = SessionState::new();
        let second = SessionState::new();

        first.set(cached_user());
        assert!(!second.is_authenticated());
    }
}
