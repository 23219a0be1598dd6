//! Caller-facing types for the orchestrated auth operations.

use crate::error::LoginError;
use secrecy::SecretString;

/// Transient login form, mutated by the caller before submitting.
///
/// The identifier field accepts either an email or a phone number; it is
/// classified only when the login is submitted.
#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub identifier: String,
    pub password: SecretString,
}

/// Result of a login attempt.
///
/// `error` is `None` on success. `message` mirrors the orchestrator's
/// error-message slot and is suitable for direct display.
#[derive(Debug)]
pub struct LoginOutcome {
    pub error: Option<LoginError>,
    pub message: String,
}

impl LoginOutcome {
    /// Whether the attempt produced a session.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Fields collected by the registration form.
#[derive(Clone, Debug)]
pub struct RegisterParams {
    pub email: String,
    pub password: SecretString,
    pub name: String,
    /// Kept as entered; parsed to a number for the profile tables.
    pub phone: String,
    pub address: Option<String>,
}
