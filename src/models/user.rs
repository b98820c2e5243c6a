use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserStatus {
    Active,
    Disabled,
    Other(String),
}

impl From<String> for UserStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => UserStatus::Active,
            "disabled" => UserStatus::Disabled,
            _ => UserStatus::Other(value),
        }
    }
}

impl From<UserStatus> for String {
    fn from(value: UserStatus) -> Self {
        match value {
            UserStatus::Active => "active".to_string(),
            UserStatus::Disabled => "disabled".to_string(),
            UserStatus::Other(raw) => raw,
        }
    }
}

impl Default for UserStatus {
    fn default() -> Self {
        UserStatus::Active
    }
}

/// Profile as the backend sends it, before the role is validated.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    pub id: u64,
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub email: String,
    #[serde(default, alias = "contactNo")]
    pub contact_no: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub role: String,
    #[serde(default)]
    pub status: UserStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProfilePayload")]
pub struct UserProfile {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub contact_no: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub status: UserStatus,
}

impl TryFrom<ProfilePayload> for UserProfile {
    type Error = AppError;

    fn try_from(value: ProfilePayload) -> Result<Self, Self::Error> {
        if value.id == 0 {
            return Err(AppError::malformed_session("profile id must be non-zero"));
        }

        Ok(UserProfile {
            id: value.id,
            full_name: value.full_name,
            email: value.email,
            contact_no: value.contact_no,
            address: value.address,
            role: Role::parse(&value.role)?,
            status: value.status,
        })
    }
}

impl UserProfile {
    /// Decodes a profile, keeping "not a profile" (`MalformedSession`) apart
    /// from "a profile with a role we do not know" (`UnknownRole`).
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        let payload: ProfilePayload = serde_path_to_error::deserialize(value)
            .map_err(|err| AppError::malformed_session(err.to_string()))?;
        UserProfile::try_from(payload)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| AppError::malformed_session(err.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|err| AppError::internal(format!("failed to encode profile: {err}")))
    }
}

/// `{ "data": ... }` envelope used by the backend.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub remember: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner_json() -> Value {
        json!({
            "id": 7,
            "full_name": "Maya Santos",
            "email": "maya@superseven.studio",
            "contact_no": "09171234567",
            "address": "Quezon City",
            "role": "Owner",
            "status": "active"
        })
    }

    #[test]
    fn decodes_backend_profile() {
        let profile = UserProfile::from_value(owner_json()).unwrap();
        assert_eq!(profile.id, 7);
        assert_eq!(profile.role, Role::Owner);
        assert_eq!(profile.status, UserStatus::Active);
    }

    #[test]
    fn accepts_camel_case_keys() {
        let profile = UserProfile::from_value(json!({
            "id": 3,
            "fullName": "Jo Cruz",
            "email": "jo@example.com",
            "contactNo": "0917",
            "role": "Client",
            "status": "pending"
        }))
        .unwrap();
        assert_eq!(profile.full_name, "Jo Cruz");
        assert_eq!(profile.contact_no.as_deref(), Some("0917"));
        assert_eq!(profile.status, UserStatus::Other("pending".into()));
    }

    #[test]
    fn missing_id_is_malformed() {
        let mut value = owner_json();
        value.as_object_mut().unwrap().remove("id");
        assert!(matches!(UserProfile::from_value(value), Err(AppError::MalformedSession(_))));
        assert!(matches!(UserProfile::from_json("not json"), Err(AppError::MalformedSession(_))));
    }

    #[test]
    fn unknown_role_is_reported_as_such() {
        let mut value = owner_json();
        value["role"] = json!("Intern");
        assert!(matches!(UserProfile::from_value(value), Err(AppError::UnknownRole(_))));
    }

    #[test]
    fn cached_form_round_trips_through_the_store_encoding() {
        let profile = UserProfile::from_value(owner_json()).unwrap();
        let cached = profile.to_json().unwrap();
        assert_eq!(UserProfile::from_json(&cached).unwrap(), profile);
    }
}
