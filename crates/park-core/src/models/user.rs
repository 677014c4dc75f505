//! User model
//!
//! The logged-in identity persisted by the storage adapter.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User role, dispatched once at the application root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Driver parking vehicles
    #[default]
    User,
    /// Operator monitoring occupancy, users and infractions
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl Role {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Check if role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Login email
    pub email: String,

    /// Display name
    pub name: String,

    /// User role
    #[serde(default)]
    pub role: Role,

    /// Plate of the user's vehicle, if registered
    #[serde(default)]
    pub vehicle_plate: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role,
            vehicle_plate: None,
        }
    }
}
