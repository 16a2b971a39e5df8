use serde::{Deserialize, Serialize};

/// Sentinel identifier for locally synthesized guest principals. Every
/// backend-issued identifier is a UUID, so the sentinel can never collide.
pub const GUEST_ID: &str = "guest";
pub const GUEST_EMAIL: &str = "guest@demo.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Company,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Company => "company",
            Role::Admin => "admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Company => "Company",
            Role::Admin => "Admin",
        }
    }

    /// Role-specific profile table written at registration. Admin accounts
    /// are provisioned out of band and carry no profile row.
    pub fn profile_table(&self) -> Option<&'static str> {
        match self {
            Role::Student => Some("student_profiles"),
            Role::Company => Some("company_profiles"),
            Role::Admin => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in principal. At most one is current at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
    /// Meaningful only for companies; absent or true for every other role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl Identity {
    pub fn guest(role: Role) -> Self {
        Self {
            id: GUEST_ID.to_string(),
            email: GUEST_EMAIL.to_string(),
            role,
            name: format!("Guest {}", role.label()),
            approved: Some(true),
        }
    }

    pub fn is_pending_approval(&self) -> bool {
        self.role == Role::Company && self.approved == Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub is_guest: bool,
    pub is_loading: bool,
}

impl SessionState {
    /// Initial state at process start, before the backend has confirmed
    /// either "no session" or "session with resolved identity".
    pub fn loading() -> Self {
        Self {
            identity: None,
            is_guest: false,
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            identity: None,
            is_guest: false,
            is_loading: false,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            is_guest: false,
            is_loading: false,
        }
    }

    pub fn guest(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            is_guest: true,
            is_loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::loading()
    }
}
