use serde::{Deserialize, Serialize};

/// Prefix carried by every issued API key
pub const API_KEY_PREFIX: &str = "bn_";

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Parse a stored role name. Unknown roles get no privileges.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Admin" => Role::Admin,
            "SuperAdmin" => Role::SuperAdmin,
            _ => Role::User,
        }
    }
}

/// An authenticated identity resolved from a session token or API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    pub banned: bool,
}

impl Session {
    /// Create a session for an unprivileged, non-banned user
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::User,
            banned: false,
        }
    }

    /// Whether the user may run admin operations
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }
}
