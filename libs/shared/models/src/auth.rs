use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Doctor,
    Patient,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Doctor => write!(f, "doctor"),
            Role::Patient => write!(f, "patient"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The acting user, as resolved by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        match self.role.as_deref()? {
            "doctor" => Some(Role::Doctor),
            "patient" => Some(Role::Patient),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    /// True when the user is `id` acting in `role`, or an admin.
    pub fn acts_as(&self, role: Role, id: &str) -> bool {
        self.is_admin() || (self.role() == Some(role) && self.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: &str) -> User {
        User {
            id: id.to_string(),
            email: None,
            role: Some(role.to_string()),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn test_acts_as() {
        let doctor = user("doc-1", "doctor");
        assert!(doctor.acts_as(Role::Doctor, "doc-1"));
        assert!(!doctor.acts_as(Role::Doctor, "doc-2"));
        assert!(!doctor.acts_as(Role::Patient, "doc-1"));

        let admin = user("root", "admin");
        assert!(admin.acts_as(Role::Doctor, "doc-1"));
    }

    #[test]
    fn test_unknown_role() {
        assert_eq!(user("x", "nurse").role(), None);
    }
}
