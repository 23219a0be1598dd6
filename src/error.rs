//! Error types for backend calls and the caller-facing auth operations.
//! Backend failures are normalized into [`ClientError`] at the client
//! boundary; login and registration wrap them into operation errors that
//! carry the user-facing Spanish messages.

use std::fmt;

/// Failure raised by the hosted-backend client.
///
/// Every operation recovers into this type; nothing is propagated as a
/// panic or an unhandled transport error.
#[derive(Clone, Debug)]
pub enum ClientError {
    /// Invalid or missing local configuration, detected before any request.
    Config(String),
    /// The backend could not be reached.
    Network(String),
    /// The request was abandoned after the client-side timeout.
    Timeout(String),
    /// The backend answered with a non-success status.
    ///
    /// `message` holds the service error reason when the body carried one,
    /// otherwise a sanitized excerpt of the raw body.
    Http { status: u16, message: String },
    /// The response body could not be decoded.
    Parse(String),
    /// The request payload could not be encoded.
    Serialization(String),
}

impl ClientError {
    /// Service-facing reason string, used to map login failures.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(message)
            | Self::Network(message)
            | Self::Timeout(message)
            | Self::Http { message, .. }
            | Self::Parse(message)
            | Self::Serialization(message) => message,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(message) => write!(formatter, "configuration error: {message}"),
            Self::Network(message) => write!(formatter, "network error: {message}"),
            Self::Timeout(message) => write!(formatter, "timeout: {message}"),
            Self::Http { status, message } => {
                write!(formatter, "backend rejected the request ({status}): {message}")
            }
            Self::Parse(message) => write!(formatter, "response error: {message}"),
            Self::Serialization(message) => write!(formatter, "request error: {message}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Why a login attempt did not produce a session.
///
/// Validation variants are raised before any network call is made.
#[derive(Clone, Debug)]
pub enum LoginError {
    /// The anti-automation token was empty.
    MissingCaptcha,
    /// The identifier is neither an email nor a 7-15 digit phone number.
    InvalidIdentifier,
    /// The backend refused the credentials or the call failed.
    Backend(ClientError),
}

impl fmt::Display for LoginError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCaptcha => write!(formatter, "No se validó el captcha."),
            Self::InvalidIdentifier => {
                write!(
                    formatter,
                    "Ingresa un correo válido o un número de celular válido."
                )
            }
            Self::Backend(err) => write!(formatter, "{err}"),
        }
    }
}

impl std::error::Error for LoginError {}

/// Why the gated registration sequence stopped.
///
/// `Display` yields the message shown to the user. Steps after identity
/// creation never roll back earlier steps.
#[derive(Clone, Debug)]
pub enum RegisterError {
    /// The anti-automation token was empty.
    MissingToken,
    /// The phone field is not a plain number.
    InvalidPhone,
    /// Identity creation failed; the service message is kept verbatim.
    Auth(String),
    /// The service reported success but returned no identity.
    IdentityMissing,
    /// The profile insert failed. The auth identity already exists.
    Profile,
    /// The activation insert failed. Identity and profile already exist.
    Activation,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(formatter, "No se envió token"),
            Self::InvalidPhone => write!(formatter, "Ingresa un número de celular válido."),
            Self::Auth(message) => write!(formatter, "{message}"),
            Self::IdentityMissing => write!(formatter, "No se pudo crear el usuario"),
            Self::Profile => write!(formatter, "Error al crear el perfil de usuario"),
            Self::Activation => write!(formatter, "Error al crear la activación del usuario"),
        }
    }
}

impl std::error::Error for RegisterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_message_exposes_http_reason() {
        let err = ClientError::Http {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.message(), "Invalid login credentials");
        assert!(err.to_string().contains("400"));
    }

    #[test]
    fn login_error_display_uses_localized_messages() {
        assert_eq!(LoginError::MissingCaptcha.to_string(), "No se validó el captcha.");
        assert_eq!(
            LoginError::InvalidIdentifier.to_string(),
            "Ingresa un correo válido o un número de celular válido."
        );
    }

    #[test]
    fn register_error_display_keeps_service_message_verbatim() {
        let err = RegisterError::Auth("User already registered".to_string());
        assert_eq!(err.to_string(), "User already registered");
        assert_eq!(
            RegisterError::Profile.to_string(),
            "Error al crear el perfil de usuario"
        );
        assert_eq!(
            RegisterError::Activation.to_string(),
            "Error al crear la activación del usuario"
        );
    }
}
