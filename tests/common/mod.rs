#![allow(dead_code)]

use placement_portal::backend::{AuthBackend, AuthEvent, AuthSession, RowBackend};
use placement_portal::error::{Error, Result};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

pub fn session_for(user_id: &str) -> AuthSession {
    AuthSession {
        access_token: "access-token".to_string(),
        refresh_token: "refresh-token".to_string(),
        user_id: user_id.to_string(),
        email: Some("user@example.com".to_string()),
    }
}

pub fn temp_store_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("portal_{}_{}.json", tag, uuid::Uuid::new_v4()))
}

/// In-memory auth capability: accepts one fixed password for one fixed user
/// and broadcasts events the way the hosted client does.
pub struct FakeAuth {
    pub events: broadcast::Sender<AuthEvent>,
    pub current: Mutex<Option<AuthSession>>,
    pub password: String,
    pub user_id: String,
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
}

impl FakeAuth {
    pub fn new(user_id: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            current: Mutex::new(None),
            password: "password123".to_string(),
            user_id: user_id.to_string(),
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_session(user_id: &str) -> Self {
        let auth = Self::new(user_id);
        *auth.current.lock().unwrap() = Some(session_for(user_id));
        auth
    }

    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }
}

impl AuthBackend for FakeAuth {
    async fn sign_in_with_password(&self, _email: &str, password: &str) -> Result<AuthSession> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if password != self.password {
            return Err(Error::Auth("Invalid login credentials".to_string()));
        }
        let session = session_for(&self.user_id);
        *self.current.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _metadata: JsonValue,
    ) -> Result<String> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.user_id.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        *self.current.lock().unwrap() = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// In-memory row capability recording every insert in arrival order.
#[derive(Default)]
pub struct FakeRows {
    pub rows: Mutex<HashMap<(String, String), JsonValue>>,
    pub inserts: Mutex<Vec<(String, JsonValue)>>,
    pub failing_tables: Mutex<HashSet<String>>,
}

impl FakeRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, id: &str, row: JsonValue) {
        self.rows
            .lock()
            .unwrap()
            .insert((table.to_string(), id.to_string()), row);
    }

    pub fn fail_inserts_for(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    pub fn inserted_tables(&self) -> Vec<String> {
        self.inserts
            .lock()
            .unwrap()
            .iter()
            .map(|(table, _)| table.clone())
            .collect()
    }
}

impl RowBackend for FakeRows {
    async fn select_by_id(&self, table: &str, id: &str) -> Result<Option<JsonValue>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(table.to_string(), id.to_string()))
            .cloned())
    }

    async fn insert(&self, table: &str, row: JsonValue) -> Result<()> {
        if self.failing_tables.lock().unwrap().contains(table) {
            return Err(Error::Internal(format!("{} insert rejected", table)));
        }
        self.inserts
            .lock()
            .unwrap()
            .push((table.to_string(), row.clone()));
        if let Some(id) = row.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()) {
            self.seed(table, &id, row);
        }
        Ok(())
    }
}

pub fn user_row(id: &str, name: &str, role: &str, approved: Option<bool>) -> JsonValue {
    serde_json::json!({
        "id": id,
        "email": "user@example.com",
        "name": name,
        "role": role,
        "approved": approved,
    })
}
