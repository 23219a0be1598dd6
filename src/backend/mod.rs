//! Seams to the hosted backend-as-a-service. The orchestrator talks to
//! the [`AuthBackend`] and [`ProfileStore`] traits only; [`rest`] holds
//! the production client. Credential storage, password hashing and token
//! issuance all live on the other side of these traits.

pub mod rest;
pub mod types;

use crate::error::ClientError;
use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::watch;
use types::{AuthUser, LoginIdentifier, NewActivation, NewProfile, Profile, SignUpMetadata};
use uuid::Uuid;

/// Sign-up request for the auth service.
///
/// Not serialized directly; the client builds the payload so the password
/// never leaves the [`SecretString`] until the request body is encoded.
#[derive(Clone, Debug)]
pub struct SignUpRequest {
    pub email: String,
    pub password: SecretString,
    pub captcha_token: String,
    pub metadata: SignUpMetadata,
}

/// Authentication surface of the hosted service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials plus an anti-automation token for a session.
    async fn sign_in_with_password(
        &self,
        identifier: LoginIdentifier,
        password: &SecretString,
        captcha_token: &str,
    ) -> Result<AuthUser, ClientError>;

    /// Creates a new identity. Returns `None` when the service reports
    /// success without an identity payload.
    async fn sign_up(&self, request: SignUpRequest) -> Result<Option<AuthUser>, ClientError>;

    /// Updates the phone number on the current identity.
    async fn update_phone(&self, phone: &str) -> Result<(), ClientError>;

    /// Replaces the password on the current identity.
    async fn update_password(&self, new_password: &SecretString) -> Result<(), ClientError>;

    /// Ends the current session on the service.
    async fn sign_out(&self) -> Result<(), ClientError>;

    /// Triggers the password-reset email with a redirect target.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ClientError>;

    /// Currently observed session identity, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Session-change notification stream. Receivers observe the identity
    /// after every sign-in and `None` after sign-out or session loss.
    fn session_changes(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Row access to the profile tables.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Reads the profile for a session identity, with its activation
    /// records joined. `Ok(None)` when no row exists.
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ClientError>;

    /// Inserts a new profile row.
    async fn insert_profile(&self, row: NewProfile) -> Result<(), ClientError>;

    /// Inserts a new activation row.
    async fn insert_activation(&self, row: NewActivation) -> Result<(), ClientError>;
}
