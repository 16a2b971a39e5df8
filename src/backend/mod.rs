//! Capability traits for the hosted backend. The portal core never talks to
//! a database of its own; credentials, sessions, and rows all live behind
//! these two traits, with the concrete REST clients in [`supabase`].

pub mod supabase;

pub use supabase::{SupabaseAuth, SupabaseRows};

use crate::error::Result;
use crate::models::identity::{Identity, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::future::Future;
use tokio::sync::broadcast;

/// An authenticated backend session: the bearer token plus its subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: Option<String>,
}

/// Session-change notification emitted by the auth capability.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut,
}

impl AuthEvent {
    /// The session subject carried by the event, if any.
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            AuthEvent::SignedIn(s) | AuthEvent::TokenRefreshed(s) => Some(s),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Row shape of the `users` table. Untrusted backend JSON is converted to
/// this type at exactly one boundary and not inspected past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: uuid::Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub approved: Option<bool>,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Identity {
            id: row.id.to_string(),
            email: row.email,
            role: row.role,
            name: row.name,
            approved: row.approved,
        }
    }
}

/// Hosted credential and session capability.
///
/// Implementations must broadcast an [`AuthEvent`] after every successful
/// sign-in, sign-out, and token refresh; the session service relies on that
/// single notification path to resolve identity.
pub trait AuthBackend: Send + Sync {
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession>> + Send;

    /// Creates a credential and returns the backend-issued user id.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> impl Future<Output = Result<String>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// The persisted session from a previous process, if one survives.
    fn current_session(&self) -> impl Future<Output = Result<Option<AuthSession>>> + Send;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Hosted row storage capability, scoped to the handful of tables the core
/// consumes (`users` plus the role profile tables).
pub trait RowBackend: Send + Sync {
    fn select_by_id(
        &self,
        table: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<JsonValue>>> + Send;

    fn insert(&self, table: &str, row: JsonValue) -> impl Future<Output = Result<()>> + Send;
}
