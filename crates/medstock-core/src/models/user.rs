//! Staff user models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Staff role. Permissions are derived from the role only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Pharmacist,
    Physician,
    Nurse,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Pharmacist => "pharmacist",
            Role::Physician => "physician",
            Role::Nurse => "nurse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "administrator" => Some(Role::Administrator),
            "pharmacist" => Some(Role::Pharmacist),
            "physician" => Some(Role::Physician),
            "nurse" => Some(Role::Nurse),
            _ => None,
        }
    }
}

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Lowercase hex SHA-256 of the password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub active: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn new(
        username: String,
        password_hash: String,
        full_name: String,
        role: Role,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            password_hash,
            full_name,
            email: None,
            role,
            active: true,
            last_login: None,
            created_at,
        }
    }
}
