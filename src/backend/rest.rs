//! REST client for the hosted backend. Auth endpoints live under
//! `/auth/v1`, row access under `/rest/v1` with column filters in the
//! query string. Only the access token and the observed identity are kept
//! locally; the token never leaves this module.

use crate::{
    backend::{
        types::{AuthUser, LoginIdentifier, NewActivation, NewProfile, Profile},
        AuthBackend, ProfileStore, SignUpRequest,
    },
    config::Config,
    error::ClientError,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

/// Client-side request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of raw error-body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

/// Session material held between calls. The raw token is only read to set
/// the bearer header.
#[derive(Clone)]
struct SessionTokens {
    access_token: SecretString,
    user: AuthUser,
}

/// Production client for the hosted service. Implements both backend
/// seams; wrap it in an `Arc` and hand the same instance to the
/// orchestrator twice.
pub struct RestBackend {
    http: Client,
    config: Config,
    session: RwLock<Option<SessionTokens>>,
    changes: watch::Sender<Option<AuthUser>>,
}

impl RestBackend {
    /// Builds the client with the crate user agent and a fixed timeout.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build HTTP client: {err}")))?;

        let (changes, _) = watch::channel(None);

        Ok(Self {
            http,
            config,
            session: RwLock::new(None),
            changes,
        })
    }

    fn auth_url(&self, path: &str) -> Result<String, ClientError> {
        endpoint_url(self.config.base_url(), &format!("/auth/v1{path}"))
    }

    fn rest_url(&self, table: &str) -> Result<String, ClientError> {
        endpoint_url(self.config.base_url(), &format!("/rest/v1/{table}"))
    }

    /// Attaches the API key and, when a session exists, the bearer token.
    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("apikey", self.config.api_key().expose_secret());

        match self.read_session() {
            Some(session) => request.bearer_auth(session.access_token.expose_secret()),
            None => request,
        }
    }

    fn read_session(&self) -> Option<SessionTokens> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, session: Option<SessionTokens>) {
        let user = session.as_ref().map(|tokens| tokens.user.clone());
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        self.changes.send_replace(user);
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    // Identifiers are contact details; keep them out of spans.
    #[instrument(skip_all)]
    async fn sign_in_with_password(
        &self,
        identifier: LoginIdentifier,
        password: &SecretString,
        captcha_token: &str,
    ) -> Result<AuthUser, ClientError> {
        let url = format!("{}?grant_type=password", self.auth_url("/token")?);

        let mut payload = json!({
            "password": password.expose_secret(),
            "captcha_token": captcha_token,
        });
        match &identifier {
            LoginIdentifier::Email(email) => payload["email"] = json!(email),
            LoginIdentifier::Phone(phone) => payload["phone"] = json!(phone),
        }

        let response = self
            .with_headers(self.http.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: String,
            user: AuthUser,
        }

        let tokens: TokenResponse = parse_json(response).await?;
        let user = tokens.user.clone();
        self.store_session(Some(SessionTokens {
            access_token: SecretString::from(tokens.access_token),
            user: tokens.user,
        }));

        Ok(user)
    }

    #[instrument(skip(self, request))]
    async fn sign_up(&self, request: SignUpRequest) -> Result<Option<AuthUser>, ClientError> {
        let url = self.auth_url("/signup")?;

        let metadata = serde_json::to_value(&request.metadata)
            .map_err(|err| ClientError::Serialization(format!("failed to encode metadata: {err}")))?;
        let payload = json!({
            "email": request.email,
            "password": request.password.expose_secret(),
            "captcha_token": request.captcha_token,
            "data": metadata,
        });

        let response = self
            .with_headers(self.http.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        #[derive(serde::Deserialize)]
        struct SignUpResponse {
            #[serde(default)]
            user: Option<AuthUser>,
        }

        let body: SignUpResponse = parse_json(response).await?;
        Ok(body.user)
    }

    #[instrument(skip(self, phone))]
    async fn update_phone(&self, phone: &str) -> Result<(), ClientError> {
        self.update_user(json!({ "phone": phone })).await
    }

    #[instrument(skip(self, new_password))]
    async fn update_password(&self, new_password: &SecretString) -> Result<(), ClientError> {
        self.update_user(json!({ "password": new_password.expose_secret() }))
            .await
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), ClientError> {
        // Without a session there is nothing to revoke server-side; still
        // publish the cleared state so observers reconcile.
        if self.read_session().is_none() {
            self.store_session(None);
            return Ok(());
        }

        let url = self.auth_url("/logout")?;
        let response = self
            .with_headers(self.http.post(&url))
            .send()
            .await
            .map_err(map_transport_error)?;
        expect_success(response).await?;

        self.store_session(None);
        Ok(())
    }

    #[instrument(skip(self, email))]
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), ClientError> {
        let url = self.auth_url("/recover")?;

        let response = self
            .with_headers(self.http.post(&url))
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(map_transport_error)?;

        expect_success(response).await
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.read_session().map(|session| session.user)
    }

    fn session_changes(&self) -> watch::Receiver<Option<AuthUser>> {
        self.changes.subscribe()
    }
}

impl RestBackend {
    async fn update_user(&self, payload: Value) -> Result<(), ClientError> {
        if self.read_session().is_none() {
            return Err(ClientError::Http {
                status: 401,
                message: "Auth session missing".to_string(),
            });
        }

        let url = self.auth_url("/user")?;
        let response = self
            .with_headers(self.http.put(&url))
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        expect_success(response).await
    }
}

#[async_trait]
impl ProfileStore for RestBackend {
    #[instrument(skip(self))]
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ClientError> {
        let url = self.rest_url("perfiles")?;

        let response = self
            .with_headers(self.http.get(&url))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("select", "*,activations(*)".to_string()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let mut rows: Vec<Profile> = parse_json(response).await?;
        debug!("profile rows matched: {}", rows.len());
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    #[instrument(skip(self, row))]
    async fn insert_profile(&self, row: NewProfile) -> Result<(), ClientError> {
        self.insert_row("perfiles", &row).await
    }

    #[instrument(skip(self, row))]
    async fn insert_activation(&self, row: NewActivation) -> Result<(), ClientError> {
        self.insert_row("activations", &row).await
    }
}

impl RestBackend {
    async fn insert_row<T: serde::Serialize>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<(), ClientError> {
        let url = self.rest_url(table)?;

        let response = self
            .with_headers(self.http.post(&url))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(map_transport_error)?;

        expect_success(response).await
    }
}

/// Rebuilds the endpoint URL from its parts, rejecting unsupported
/// schemes and hostless URLs before any request goes out.
fn endpoint_url(base: &str, path: &str) -> Result<String, ClientError> {
    let url = Url::parse(base)
        .map_err(|err| ClientError::Config(format!("invalid backend URL: {err}")))?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| ClientError::Config("invalid backend URL: no host specified".to_string()))?
        .to_owned();

    let port = match url.port() {
        Some(port) => port,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => {
                return Err(ClientError::Config(format!(
                    "invalid backend URL: unsupported scheme {scheme}"
                )))
            }
        },
    };

    Ok(format!("{scheme}://{host}:{port}{path}"))
}

/// Maps reqwest transport failures into the client error taxonomy.
fn map_transport_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout("the request timed out".to_string())
    } else if err.is_decode() {
        ClientError::Parse(format!("failed to decode response: {err}"))
    } else {
        ClientError::Network(format!("unable to reach the backend: {err}"))
    }
}

/// Decodes a success body, or turns a failure response into `Http`.
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::Parse(format!("failed to decode response: {err}")))
    } else {
        Err(error_from_response(response).await)
    }
}

/// Discards a success body, or turns a failure response into `Http`.
async fn expect_success(response: Response) -> Result<(), ClientError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    ClientError::Http {
        status,
        message: extract_error_message(&body),
    }
}

/// Pulls the service reason out of a JSON error body, falling back to a
/// sanitized excerpt of the raw text.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "msg", "message"] {
            if let Some(message) = value[key].as_str() {
                return message.to_string();
            }
        }
    }

    sanitize_body(body)
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
