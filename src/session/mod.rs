//! Session orchestration over the hosted backend: login, registration,
//! password reset/update, logout and profile reconciliation into the
//! injected [`SessionState`].
//!
//! The orchestrator provides no mutual exclusion: a watcher-triggered
//! reconciliation and a manual one may overlap, and the last write to the
//! state slot wins. Callers serialize user-initiated actions (for example
//! by disabling a submit control while a call is in flight).

pub mod state;
pub mod types;

use crate::{
    backend::{
        types::{AuthUser, LoginIdentifier, NewActivation, NewProfile, Role, SignUpMetadata},
        AuthBackend, ProfileStore, SignUpRequest,
    },
    error::{ClientError, LoginError, RegisterError},
    util::random_num,
};
use regex::Regex;
use secrecy::SecretString;
use state::{CachedUser, SessionState};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};
use types::{LoginForm, LoginOutcome, RegisterParams};

const MSG_BAD_CREDENTIALS: &str = "Credenciales incorrectas. Verifica tus datos.";
const MSG_PHONE_NOT_CONFIRMED: &str = "Debes confirmar tu celular antes de iniciar sesión.";
const MSG_RATE_LIMITED: &str = "Demasiados intentos. Intenta nuevamente en unos minutos.";
const MSG_LOGIN_GENERIC: &str = "Error al iniciar sesión. Intenta nuevamente.";

/// Classifies a login identifier as an email or a phone number.
///
/// Emails match `local@domain.tld`; phone numbers are 7 to 15 digits.
/// Anything else is rejected before any network call.
#[must_use]
pub fn classify_identifier(input: &str) -> Option<LoginIdentifier> {
    let email = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$");
    if email.is_ok_and(|regex| regex.is_match(input)) {
        return Some(LoginIdentifier::Email(input.to_string()));
    }

    let phone = Regex::new(r"^\d{7,15}$");
    if phone.is_ok_and(|regex| regex.is_match(input)) {
        return Some(LoginIdentifier::Phone(input.to_string()));
    }

    None
}

/// Coordinates the auth and profile calls and owns the local state: the
/// cached user slot, the login form and the last error message.
pub struct Orchestrator {
    auth: Arc<dyn AuthBackend>,
    profiles: Arc<dyn ProfileStore>,
    state: SessionState,
    site_url: String,
    login_form: RwLock<LoginForm>,
    error_message: RwLock<String>,
    on_logout: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Orchestrator {
    /// Builds an orchestrator around injected backends and state.
    ///
    /// `site_url` is the application origin used for password-reset
    /// redirect targets.
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        profiles: Arc<dyn ProfileStore>,
        state: SessionState,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            profiles,
            state,
            site_url: site_url.into(),
            login_form: RwLock::new(LoginForm::default()),
            error_message: RwLock::new(String::new()),
            on_logout: None,
        }
    }

    /// Registers a hook invoked after a successful logout, typically to
    /// navigate back to the root route.
    #[must_use]
    pub fn with_logout_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_logout = Some(Arc::new(hook));
        self
    }

    /// The injected state slot, for callers that render from it.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Replaces the login form fields before a submit.
    pub fn set_credentials(&self, identifier: impl Into<String>, password: SecretString) {
        *self
            .login_form
            .write()
            .unwrap_or_else(PoisonError::into_inner) = LoginForm {
            identifier: identifier.into(),
            password,
        };
    }

    /// Last user-facing error message, kept for UI bindings.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.error_message
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_error_message(&self, message: &str) {
        *self
            .error_message
            .write()
            .unwrap_or_else(PoisonError::into_inner) = message.to_string();
    }

    /// Reconciles the cached user with the observed session identity.
    ///
    /// With no session the slot is cleared and `Ok(None)` is returned. On
    /// a query failure the slot is left untouched, so callers must not
    /// assume staleness was resolved.
    #[instrument(skip(self))]
    pub async fn load_profile(&self) -> Result<Option<CachedUser>, ClientError> {
        let Some(auth_user) = self.auth.current_user() else {
            self.state.clear();
            return Ok(None);
        };

        match self.profiles.fetch_profile(auth_user.id).await {
            Ok(profile) => {
                let cached = CachedUser {
                    auth: auth_user,
                    profile,
                };
                self.state.set(cached.clone());
                Ok(Some(cached))
            }
            Err(err) => {
                error!("Error fetching profile: {err}");
                Err(err)
            }
        }
    }

    /// Submits the login form with an anti-automation token.
    ///
    /// Validation failures (empty token, malformed identifier) return
    /// before any backend call. On success the profile is reconciled into
    /// the state slot before returning.
    #[instrument(skip(self, captcha_token))]
    pub async fn login(&self, captcha_token: &str) -> LoginOutcome {
        if captcha_token.is_empty() {
            self.set_error_message(&LoginError::MissingCaptcha.to_string());
            return LoginOutcome {
                error: Some(LoginError::MissingCaptcha),
                message: self.error_message(),
            };
        }

        let form = self
            .login_form
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(identifier) = classify_identifier(form.identifier.trim()) else {
            self.set_error_message(&LoginError::InvalidIdentifier.to_string());
            return LoginOutcome {
                error: Some(LoginError::InvalidIdentifier),
                message: self.error_message(),
            };
        };

        match self
            .auth
            .sign_in_with_password(identifier, &form.password, captcha_token)
            .await
        {
            Ok(_) => {
                // Populate the cached user; a failure here is already
                // logged and the login itself stays successful.
                let _ = self.load_profile().await;
                LoginOutcome {
                    error: None,
                    message: self.error_message(),
                }
            }
            Err(err) => {
                self.set_error_message(login_failure_message(&err));
                LoginOutcome {
                    error: Some(LoginError::Backend(err)),
                    message: self.error_message(),
                }
            }
        }
    }

    /// Runs the gated registration sequence.
    ///
    /// Identity creation aborts the flow; the phone update is logged but
    /// non-fatal; each insert aborts without rolling back earlier steps,
    /// so a failed insert can leave an orphaned identity behind.
    #[instrument(skip(self, params, captcha_token))]
    pub async fn register(
        &self,
        params: RegisterParams,
        captcha_token: &str,
    ) -> Result<AuthUser, RegisterError> {
        if captcha_token.is_empty() {
            return Err(RegisterError::MissingToken);
        }

        let phone: i64 = params
            .phone
            .trim()
            .parse()
            .map_err(|_| RegisterError::InvalidPhone)?;

        let request = SignUpRequest {
            email: params.email.clone(),
            password: params.password.clone(),
            captcha_token: captcha_token.to_string(),
            metadata: SignUpMetadata {
                name: params.name.clone(),
                phone,
                address: params.address.clone(),
                last_ubication: None,
            },
        };

        let created = self.auth.sign_up(request).await.map_err(|err| {
            error!("Sign-up failed: {err}");
            RegisterError::Auth(err.message().to_string())
        })?;

        let Some(auth_user) = created else {
            return Err(RegisterError::IdentityMissing);
        };

        // The identity already exists at this point, so a failed phone
        // update must not abort the registration.
        if let Err(err) = self.auth.update_phone(&params.phone).await {
            warn!("User created but phone update failed: {err}");
        }

        let profile = NewProfile {
            user_id: auth_user.id,
            name: params.name,
            phone,
            address: params.address,
            last_location: None,
            activation_code: activation_code(),
        };
        if let Err(err) = self.profiles.insert_profile(profile).await {
            error!("Error creating profile: {err}");
            return Err(RegisterError::Profile);
        }

        // Second, independent draw: the activation row carries its own
        // code, distinct from the one stored on the profile.
        let activation = NewActivation {
            user_id: auth_user.id,
            activation_code: activation_code(),
        };
        if let Err(err) = self.profiles.insert_activation(activation).await {
            error!("Error creating activation: {err}");
            return Err(RegisterError::Activation);
        }

        Ok(auth_user)
    }

    /// Triggers the password-reset email with the site redirect target.
    #[instrument(skip(self, email))]
    pub async fn reset_password_request(&self, email: &str) -> Result<(), ClientError> {
        let redirect_to = format!("{}/reset-password", self.site_url.trim_end_matches('/'));

        self.auth
            .reset_password_for_email(email, &redirect_to)
            .await
            .map_err(|err| {
                error!("Password reset request failed: {err}");
                err
            })
    }

    /// Replaces the password on the current identity.
    #[instrument(skip(self, new_password))]
    pub async fn update_password(&self, new_password: &SecretString) -> Result<(), ClientError> {
        self.auth.update_password(new_password).await.map_err(|err| {
            error!("Error updating password: {err}");
            err
        })
    }

    /// Signs out on the service, then clears the cached user and fires
    /// the logout hook. On failure only logs; the cached user stays, so
    /// state can diverge if the server-side session already expired.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        match self.auth.sign_out().await {
            Ok(()) => {
                self.state.clear();
                if let Some(hook) = &self.on_logout {
                    hook();
                }
                Ok(())
            }
            Err(err) => {
                error!("Sign-out failed: {err}");
                Err(err)
            }
        }
    }

    /// True iff the cached profile role is exactly `admin`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// True iff the cached profile role is exactly `provider`.
    #[must_use]
    pub fn is_provider(&self) -> bool {
        self.role() == Some(Role::Provider)
    }

    fn role(&self) -> Option<Role> {
        self.state
            .snapshot()
            .and_then(|user| user.profile)
            .and_then(|profile| profile.role)
    }

    /// Loads the profile once if a session is observed and the slot is
    /// still empty. A no-op otherwise, so it is safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), ClientError> {
        if self.auth.current_user().is_some() && self.state.snapshot().is_none() {
            self.load_profile().await?;
        }
        Ok(())
    }

    /// Subscribes to the backend's session-change stream and reconciles
    /// on every notification: an identity with an empty slot triggers a
    /// profile load, a lost session clears the slot.
    ///
    /// The current value is processed immediately, then the task runs
    /// until the backend is dropped. See the module docs for the
    /// re-entrancy caveat with manual [`Orchestrator::load_profile`]
    /// calls.
    pub fn spawn_session_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            let mut changes = orchestrator.auth.session_changes();
            loop {
                let observed = changes.borrow_and_update().clone();
                match observed {
                    Some(user) => {
                        if orchestrator.state.snapshot().is_none() {
                            debug!("session observed for {}, reconciling profile", user.id);
                            let _ = orchestrator.load_profile().await;
                        }
                    }
                    None => orchestrator.state.clear(),
                }

                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Draws a 4-digit activation code.
fn activation_code() -> i32 {
    random_num(1000, 9999) as i32
}

/// Maps a sign-in failure to its user-facing message. Known service
/// reasons get a specific message; everything else falls back to the
/// generic one.
fn login_failure_message(err: &ClientError) -> &'static str {
    match err {
        ClientError::Http { message, .. } => match message.as_str() {
            "Invalid login credentials" => MSG_BAD_CREDENTIALS,
            "Phone not confirmed" => MSG_PHONE_NOT_CONFIRMED,
            "Too many requests" => MSG_RATE_LIMITED,
            other => {
                debug!("unmapped sign-in failure: {other}");
                MSG_LOGIN_GENERIC
            }
        },
        _ => MSG_LOGIN_GENERIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_accepts_emails() {
        let classified = classify_identifier("user@test.com");
        assert_eq!(
            classified,
            Some(LoginIdentifier::Email("user@test.com".to_string()))
        );
        assert!(matches!(
            classify_identifier("name.surname@example.co"),
            Some(LoginIdentifier::Email(_))
        ));
    }

    #[test]
    fn classify_accepts_phone_numbers_of_7_to_15_digits() {
        assert_eq!(
            classify_identifier("3001234567"),
            Some(LoginIdentifier::Phone("3001234567".to_string()))
        );
        assert!(matches!(
            classify_identifier("1234567"),
            Some(LoginIdentifier::Phone(_))
        ));
        assert!(matches!(
            classify_identifier("123456789012345"),
            Some(LoginIdentifier::Phone(_))
        ));
    }

    #[test]
    fn classify_rejects_everything_else() {
        assert_eq!(classify_identifier("abc"), None);
        assert_eq!(classify_identifier("123456"), None);
        assert_eq!(classify_identifier("1234567890123456"), None);
        assert_eq!(classify_identifier("user@test"), None);
        assert_eq!(classify_identifier("user test@mail.com"), None);
        assert_eq!(classify_identifier(""), None);
        assert_eq!(classify_identifier("300-123-4567"), None);
    }

    #[test]
    fn login_failure_message_maps_known_reasons() {
        let err = |message: &str| ClientError::Http {
            status: 400,
            message: message.to_string(),
        };

        assert_eq!(
            login_failure_message(&err("Invalid login credentials")),
            MSG_BAD_CREDENTIALS
        );
        assert_eq!(
            login_failure_message(&err("Phone not confirmed")),
            MSG_PHONE_NOT_CONFIRMED
        );
        assert_eq!(
            login_failure_message(&err("Too many requests")),
            MSG_RATE_LIMITED
        );
    }

    #[test]
    fn login_failure_message_falls_back_to_generic() {
        let unknown = ClientError::Http {
            status: 500,
            message: "Database unavailable".to_string(),
        };
        assert_eq!(login_failure_message(&unknown), MSG_LOGIN_GENERIC);

        let network = ClientError::Network("connection refused".to_string());
        assert_eq!(login_failure_message(&network), MSG_LOGIN_GENERIC);
    }

    #[test]
    fn activation_code_is_four_digits() {
        for _ in 0..100 {
            let code = activation_code();
            assert!((1000..=9999).contains(&code));
        }
    }
}
