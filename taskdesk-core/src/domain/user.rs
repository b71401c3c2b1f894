//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp::deserialize_optional_timestamp;

/// Role assigned to a user by the backend
///
/// Anything the backend sends other than "admin" or "manager" is treated as
/// a regular member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Admin,
    Manager,
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Member => "user",
        }
    }

    /// Admins and managers may create, edit, reassign and delete tasks
    pub fn can_manage_tasks(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    /// Only admins may list every user
    pub fn can_list_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl From<String> for UserRole {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "admin" => UserRole::Admin,
            "manager" => UserRole::Manager,
            _ => UserRole::Member,
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents an authenticated user as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub role: UserRole,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        id: i64,
        email: impl Into<String>,
        full_name: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: full_name.into(),
            role,
            created_at: None,
            updated_at: None,
        }
    }

    /// Label used in assignment pickers: "Full Name (email)"
    pub fn display_name(&self) -> String {
        if self.full_name.trim().is_empty() {
            self.email.clone()
        } else {
            format!("{} ({})", self.full_name, self.email)
        }
    }
}
