//! # Acceso (Session Orchestration Client)
//!
//! `acceso` is a client library for applications backed by a hosted
//! backend-as-a-service. It sequences the service's auth and row APIs
//! into complete flows — login, registration, password reset/update,
//! logout — and keeps a locally owned snapshot of the signed-in user.
//!
//! ## Session Model
//!
//! The service issues and refreshes sessions; this crate only observes
//! them. The [`session::Orchestrator`] merges the observed identity with
//! its profile row into an injected [`session::state::SessionState`]
//! slot, cleared on logout or session loss. Role checks (`admin`,
//! `provider`) derive from the cached profile.
//!
//! - **Injected state:** the cached-user slot is created by the caller
//!   and passed in, so independent instances never share cache.
//! - **Session changes:** the backend client publishes every sign-in and
//!   sign-out on a watch channel; a spawned watcher reconciles the slot
//!   on each notification.
//! - **Last write wins:** there is no mutual exclusion around the slot;
//!   callers serialize user-initiated actions.
//!
//! ## Anti-automation
//!
//! Login and registration require a one-time proof token obtained by the
//! host application (for example a CAPTCHA response). An empty token is
//! rejected locally before any network call.
//!
//! All user-facing login and registration messages are Spanish-language
//! strings suitable for direct display.

pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod util;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
