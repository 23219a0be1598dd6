//! Wire types shared between the backend client and the orchestrator.
//! Serde field names follow the hosted tables (`perfiles`, `activations`),
//! so the Rust-side names stay readable while the payloads match the
//! service schema.

use crate::util::Position;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record issued by the auth service. This is the observed
/// session identity; tokens stay inside the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Free-form metadata attached at sign-up.
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Role stored in the profile's `type` column.
///
/// Unknown values decode as [`Role::User`]; the match is case-sensitive,
/// so `"Admin"` is not an admin.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Provider,
    #[default]
    #[serde(other)]
    User,
}

/// Activation row created at registration, carrying its own code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub user_id: Uuid,
    pub activation_code: i32,
}

/// Profile row from the `perfiles` table, with its activations joined in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    /// Phone number stored as a numeric column.
    #[serde(rename = "celular")]
    pub phone: i64,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "last_ubication", default)]
    pub last_location: Option<Position>,
    pub activation_code: i32,
    /// Absent or null in rows created before roles existed.
    #[serde(rename = "type", default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub activations: Vec<ActivationRecord>,
}

/// New `perfiles` row for the registration sequence.
#[derive(Clone, Debug, Serialize)]
pub struct NewProfile {
    pub user_id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "celular")]
    pub phone: i64,
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[serde(rename = "last_ubication")]
    pub last_location: Option<Position>,
    pub activation_code: i32,
}

/// New `activations` row for the registration sequence.
#[derive(Clone, Debug, Serialize)]
pub struct NewActivation {
    pub user_id: Uuid,
    pub activation_code: i32,
}

/// Metadata attached to the identity at sign-up.
#[derive(Clone, Debug, Serialize)]
pub struct SignUpMetadata {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "celular")]
    pub phone: i64,
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    pub last_ubication: Option<Position>,
}

/// Login identifier, already classified as email or phone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoginIdentifier {
    Email(String),
    Phone(String),
}

impl LoginIdentifier {
    /// The raw identifier value, regardless of kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(value) | Self::Phone(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_decodes_known_values() {
        assert_eq!(serde_json::from_value::<Role>(json!("admin")).ok(), Some(Role::Admin));
        assert_eq!(
            serde_json::from_value::<Role>(json!("provider")).ok(),
            Some(Role::Provider)
        );
    }

    #[test]
    fn role_decoding_is_case_sensitive() {
        assert_eq!(serde_json::from_value::<Role>(json!("Admin")).ok(), Some(Role::User));
        assert_eq!(serde_json::from_value::<Role>(json!("ADMIN")).ok(), Some(Role::User));
    }

    #[test]
    fn role_decodes_unknown_values_as_user() {
        assert_eq!(serde_json::from_value::<Role>(json!("guest")).ok(), Some(Role::User));
    }

    #[test]
    fn profile_decodes_spanish_columns_and_join() {
        let user_id = Uuid::new_v4();
        let row = json!({
            "user_id": user_id,
            "nombre": "Marta",
            "celular": 3_001_234_567_i64,
            "direccion": null,
            "last_ubication": null,
            "activation_code": 4321,
            "type": "admin",
            "activations": [
                { "user_id": user_id, "activation_code": 1234 }
            ]
        });

        let profile: Profile = serde_json::from_value(row).expect("profile should decode");
        assert_eq!(profile.name, "Marta");
        assert_eq!(profile.phone, 3_001_234_567);
        assert_eq!(profile.address, None);
        assert_eq!(profile.role, Some(Role::Admin));
        assert_eq!(profile.activations.len(), 1);
        assert_eq!(profile.activations[0].activation_code, 1234);
    }

    #[test]
    fn profile_tolerates_missing_role_and_join() {
        let row = json!({
            "user_id": Uuid::new_v4(),
            "nombre": "Luis",
            "celular": 3_109_876_543_i64,
            "activation_code": 9999
        });

        let profile: Profile = serde_json::from_value(row).expect("profile should decode");
        assert_eq!(profile.role, None);
        assert!(profile.activations.is_empty());
    }

    #[test]
    fn new_profile_serializes_table_column_names() {
        let row = NewProfile {
            user_id: Uuid::new_v4(),
            name: "Marta".to_string(),
            phone: 3_001_234_567,
            address: Some("Calle 12 #3-45".to_string()),
            last_location: None,
            activation_code: 1000,
        };

        let value = serde_json::to_value(&row).expect("row should encode");
        assert_eq!(value["nombre"], "Marta");
        assert_eq!(value["celular"], 3_001_234_567_i64);
        assert_eq!(value["direccion"], "Calle 12 #3-45");
        assert!(value["last_ubication"].is_null());
    }

    #[test]
    fn login_identifier_exposes_raw_value() {
        assert_eq!(LoginIdentifier::Email("a@b.co".to_string()).as_str(), "a@b.co");
        assert_eq!(LoginIdentifier::Phone("3001234567".to_string()).as_str(), "3001234567");
    }
}
