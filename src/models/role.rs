use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Studio roles. The wire strings are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Owner,
    Secretary,
    Editor,
    Photographer,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Secretary,
        Role::Editor,
        Role::Photographer,
        Role::Client,
    ];

    /// The only way to turn untrusted input into a role.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "Owner" => Ok(Role::Owner),
            "Secretary" => Ok(Role::Secretary),
            "Editor" => Ok(Role::Editor),
            "Photographer" => Ok(Role::Photographer),
            "Client" => Ok(Role::Client),
            other => Err(AppError::unknown_role(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Secretary => "Secretary",
            Role::Editor => "Editor",
            Role::Photographer => "Photographer",
            Role::Client => "Client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s)
    }
}

impl TryFrom<String> for Role {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_role() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn rejects_unknown_and_miscased_roles() {
        for raw in ["", "owner", "OWNER", "Admin", "Client "] {
            let err = Role::parse(raw).unwrap_err();
            assert!(matches!(err, AppError::UnknownRole(_)), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn serde_goes_through_the_validating_parse() {
        let role: Role = serde_json::from_str("\"Photographer\"").unwrap();
        assert_eq!(role, Role::Photographer);
        assert_eq!(serde_json::to_string(&Role::Secretary).unwrap(), "\"Secretary\"");
        assert!(serde_json::from_str::<Role>("\"Intern\"").is_err());
    }
}
