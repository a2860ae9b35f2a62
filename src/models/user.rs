use serde::{Deserialize, Serialize};

/// Account role carried in the token claims and the admin listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Get the display name for this role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Operator => "Operator",
            Role::Admin => "Administrator",
        }
    }
}

/// Account entry as returned by the admin endpoints.
/// The hashed password is never exposed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub force_password_change: bool,
}

impl User {
    pub fn status_display(&self) -> &'static str {
        if self.is_active {
            "active"
        } else {
            "disabled"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!(serde_json::to_string(&Role::Operator).unwrap(), "\"operator\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert!(role.is_admin());
    }

    #[test]
    fn test_parse_user_listing_entry() {
        let json = r#"{"username": "jdupont", "role": "operator", "is_active": true, "created_at": "2025-11-03T09:12:44+00:00", "force_password_change": true}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user entry");
        assert_eq!(user.username, "jdupont");
        assert_eq!(user.role, Role::Operator);
        assert!(user.force_password_change);
        assert_eq!(user.status_display(), "active");
    }
}
