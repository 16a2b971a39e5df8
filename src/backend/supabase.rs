use crate::backend::{AuthBackend, AuthEvent, AuthSession, RowBackend};
use crate::error::{Error, Result};
use crate::storage::LocalStore;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Local-storage key under which the active session is persisted so a
/// reload can restore it without re-entering credentials.
pub const SESSION_KEY: &str = "auth.session";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: uuid::Uuid,
    email: Option<String>,
}

/// REST client for the hosted `auth/v1` surface.
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    publishable_key: String,
    store: LocalStore,
    session: Mutex<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuth {
    pub fn new(base_url: String, publishable_key: String, client: Client, store: LocalStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            base_url,
            publishable_key,
            store,
            session: Mutex::new(None),
            events,
        }
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remember(&self, session: &AuthSession) {
        *self.session_slot() = Some(session.clone());
        match serde_json::to_value(session) {
            Ok(value) => {
                if let Err(e) = self.store.set(SESSION_KEY, value) {
                    tracing::warn!("could not persist session: {}", e);
                }
            }
            Err(e) => tracing::warn!("could not serialize session: {}", e),
        }
    }

    fn forget(&self) {
        *self.session_slot() = None;
        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!("could not clear persisted session: {}", e);
        }
    }

    /// Extracts the backend's human-readable message where one is supplied,
    /// falling back to the generic credential failure.
    async fn auth_failure(res: reqwest::Response) -> Error {
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<JsonValue>(&body).ok().and_then(|v| {
            v.get("error_description")
                .or_else(|| v.get("msg"))
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        });
        Error::Auth(message.unwrap_or_else(|| "Invalid email or password".to_string()))
    }

    fn session_from(token: TokenResponse) -> AuthSession {
        AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user_id: token.user.id.to_string(),
            email: token.user.email,
        }
    }

    /// Exchanges the refresh token for a new session and broadcasts the
    /// refreshed subject to listeners.
    pub async fn refresh_session(&self) -> Result<AuthSession> {
        let Some(current) = self.session_slot().clone() else {
            return Err(Error::Auth("No session to refresh".to_string()));
        };
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&serde_json::json!({ "refresh_token": current.refresh_token }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Self::auth_failure(res).await);
        }
        let token: TokenResponse = res.json().await?;
        let session = Self::session_from(token);
        self.remember(&session);
        let _ = self.events.send(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }
}

impl AuthBackend for SupabaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Self::auth_failure(res).await);
        }
        let token: TokenResponse = res.json().await?;
        let session = Self::session_from(token);
        self.remember(&session);
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: JsonValue) -> Result<String> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Self::auth_failure(res).await);
        }
        let body: JsonValue = res.json().await?;
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .or_else(|| {
                body.get("user")
                    .and_then(|u| u.get("id"))
                    .and_then(|v| v.as_str())
            })
            .ok_or_else(|| anyhow::anyhow!("Sign-up response carried no user id"))?;
        Ok(id.to_string())
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.session_slot().as_ref().map(|s| s.access_token.clone());
        if let Some(token) = token {
            let url = format!("{}/auth/v1/logout", self.base_url);
            let res = self
                .client
                .post(&url)
                .header("apikey", &self.publishable_key)
                .bearer_auth(token)
                .send()
                .await?;
            if !res.status().is_success() {
                tracing::warn!("backend sign-out returned {}", res.status());
            }
        }
        self.forget();
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>> {
        if let Some(session) = self.session_slot().clone() {
            return Ok(Some(session));
        }
        let Some(value) = self.store.get(SESSION_KEY) else {
            return Ok(None);
        };
        match serde_json::from_value::<AuthSession>(value) {
            Ok(session) => {
                *self.session_slot() = Some(session.clone());
                Ok(Some(session))
            }
            Err(e) => {
                tracing::warn!("persisted session unreadable, discarding: {}", e);
                let _ = self.store.remove(SESSION_KEY);
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// REST client for the hosted `rest/v1` row surface.
pub struct SupabaseRows {
    client: Client,
    base_url: String,
    publishable_key: String,
}

impl SupabaseRows {
    pub fn new(base_url: String, publishable_key: String, client: Client) -> Self {
        Self {
            client,
            base_url,
            publishable_key,
        }
    }
}

impl RowBackend for SupabaseRows {
    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<JsonValue>> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let filter = format!("eq.{}", id);
        let res = self
            .client
            .get(&url)
            .query(&[("select", "*"), ("id", filter.as_str())])
            .header("apikey", &self.publishable_key)
            .bearer_auth(&self.publishable_key)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Lookup(format!(
                "{} select returned {}",
                table,
                res.status()
            )));
        }
        let rows: Vec<JsonValue> = res.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, row: JsonValue) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let res = self
            .client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .bearer_auth(&self.publishable_key)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "{} insert failed with {}: {}",
                table, status, body
            )));
        }
        Ok(())
    }
}
