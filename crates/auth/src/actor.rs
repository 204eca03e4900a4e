use core::str::FromStr;

use serde::{Deserialize, Serialize};

use classifieds_core::UserId;

/// Role of a user.
///
/// Serialized as the lowercase group name (`"user"`, `"admin"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Exact match only; group names are not case-folded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A resolved, live identity used for authorization decisions.
///
/// Only the identity resolver constructs actors, and only from a verified token
/// plus a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    subject_id: UserId,
    role: Role,
    active: bool,
}

impl Actor {
    pub(crate) fn new(subject_id: UserId, role: Role) -> Self {
        Self {
            subject_id,
            role,
            active: true,
        }
    }

    pub fn subject_id(&self) -> &UserId {
        &self.subject_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");

        let parsed: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(parsed, Role::User);
    }

    #[test]
    fn role_parse_is_exact() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("Admin".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }
}
