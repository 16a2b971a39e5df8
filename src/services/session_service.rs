use crate::backend::{AuthBackend, AuthEvent, RowBackend, UserRow};
use crate::dto::{LoginRequest, RegisterRequest};
use crate::error::{Error, Result};
use crate::models::identity::{Identity, Role, SessionState};
use crate::storage::{LocalStore, GUEST_FLAG_KEY, GUEST_USER_KEY};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use validator::Validate;

pub const USERS_TABLE: &str = "users";

/// Single source of truth for who is using the application right now.
///
/// All mutations go through named operations that swap the whole
/// [`SessionState`] under the write lock and publish it afterwards, so a
/// concurrently rendering view can never observe a half-updated identity.
pub struct SessionService<A, R> {
    auth: Arc<A>,
    rows: Arc<R>,
    store: LocalStore,
    state: RwLock<SessionState>,
    state_tx: watch::Sender<SessionState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<A, R> SessionService<A, R>
where
    A: AuthBackend + 'static,
    R: RowBackend + 'static,
{
    pub fn new(auth: Arc<A>, rows: Arc<R>, store: LocalStore) -> Self {
        let initial = SessionState::loading();
        let (state_tx, _) = watch::channel(initial.clone());
        Self {
            auth,
            rows,
            store,
            state: RwLock::new(initial),
            state_tx,
            listener: Mutex::new(None),
        }
    }

    pub fn current(&self) -> SessionState {
        self.read_state().clone()
    }

    /// Change feed for views; the gate re-evaluates on every update.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Resolves the initial session exactly once at startup. A persisted
    /// guest identity wins and skips the backend entirely; otherwise the
    /// backend's own persisted session is restored and hydrated. Ends with
    /// `is_loading = false` on every path.
    pub async fn initialize(&self) {
        if let Some(identity) = self.stored_guest() {
            self.publish(SessionState::guest(identity));
            return;
        }

        let resolved = match self.auth.current_session().await {
            Ok(Some(session)) => match self.lookup_identity(&session.user_id).await {
                Ok(Some(identity)) => SessionState::authenticated(identity),
                Ok(None) => {
                    tracing::warn!(user_id = %session.user_id, "session subject has no user record");
                    SessionState::signed_out()
                }
                Err(e) => {
                    tracing::error!("identity hydration failed: {}", e);
                    SessionState::signed_out()
                }
            },
            Ok(None) => SessionState::signed_out(),
            Err(e) => {
                tracing::error!("session restore failed: {}", e);
                SessionState::signed_out()
            }
        };
        self.publish(resolved);
    }

    /// Applies backend session-change notifications for the lifetime of the
    /// service. Sign-ins re-resolve identity through the same lookup as
    /// `initialize`; sign-outs clear it. Events are ignored while a guest
    /// session is active.
    pub fn spawn_backend_listener(self: Arc<Self>) {
        // The task keeps only a weak handle so an abandoned service can drop.
        let service = Arc::downgrade(&self);
        let mut events = self.auth.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(service) = service.upgrade() else { break };
                        service.apply_backend_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    async fn apply_backend_event(&self, event: AuthEvent) {
        if self.current().is_guest {
            return;
        }
        match event.session() {
            Some(session) => {
                let resolved = match self.lookup_identity(&session.user_id).await {
                    Ok(Some(identity)) => SessionState::authenticated(identity),
                    Ok(None) => {
                        tracing::warn!(user_id = %session.user_id, "no user record for session subject");
                        SessionState::signed_out()
                    }
                    Err(e) => {
                        tracing::error!("identity hydration failed: {}", e);
                        SessionState::signed_out()
                    }
                };
                self.publish(resolved);
            }
            None => self.publish(SessionState::signed_out()),
        }
    }

    /// Delegates credential verification to the backend. Identity is set by
    /// the backend listener, not here, so resolution has a single code path.
    pub async fn login(&self, req: &LoginRequest) -> Result<()> {
        req.validate()?;
        self.auth
            .sign_in_with_password(&req.email, &req.password)
            .await?;
        Ok(())
    }

    /// Creates the credential, the `users` row, and the role profile row, in
    /// that order. The first failure propagates; earlier steps are not
    /// compensated.
    pub async fn register(&self, req: &RegisterRequest) -> Result<()> {
        req.validate()?;

        let metadata = serde_json::json!({ "name": req.name, "role": req.role });
        let user_id = self
            .auth
            .sign_up(&req.email, &req.password, metadata)
            .await
            .map_err(registration_error)?;

        let approved = req.role != Role::Company;
        let user_row = serde_json::json!({
            "id": user_id,
            "email": req.email,
            "name": req.name,
            "role": req.role,
            "approved": approved,
        });
        self.rows
            .insert(USERS_TABLE, user_row)
            .await
            .map_err(registration_error)?;

        if let Some(table) = req.role.profile_table() {
            self.rows
                .insert(table, serde_json::json!({ "id": user_id }))
                .await
                .map_err(registration_error)?;
        }
        Ok(())
    }

    /// Synthesizes a local guest principal for the chosen role and persists
    /// it so a reload restores the same identity.
    pub fn guest_login(&self, role: Role) -> Result<Identity> {
        let identity = Identity::guest(role);
        self.store
            .set(GUEST_USER_KEY, serde_json::to_value(&identity)?)?;
        self.store.set(GUEST_FLAG_KEY, serde_json::Value::Bool(true))?;
        self.publish(SessionState::guest(identity.clone()));
        Ok(identity)
    }

    pub async fn logout(&self) -> Result<()> {
        if self.current().is_guest {
            self.store.remove(GUEST_USER_KEY)?;
            self.store.remove(GUEST_FLAG_KEY)?;
            self.publish(SessionState::signed_out());
            return Ok(());
        }
        // Identity clearing arrives through the backend listener.
        self.auth.sign_out().await
    }

    pub fn shutdown_listener(&self) {
        let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn stored_guest(&self) -> Option<Identity> {
        let flagged = self
            .store
            .get(GUEST_FLAG_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !flagged {
            return None;
        }
        let value = self.store.get(GUEST_USER_KEY)?;
        match serde_json::from_value::<Identity>(value) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("persisted guest identity unreadable: {}", e);
                None
            }
        }
    }

    async fn lookup_identity(&self, user_id: &str) -> Result<Option<Identity>> {
        let Some(row) = self.rows.select_by_id(USERS_TABLE, user_id).await? else {
            return Ok(None);
        };
        let user: UserRow = serde_json::from_value(row)
            .map_err(|e| Error::Lookup(format!("malformed user record: {}", e)))?;
        Ok(Some(user.into()))
    }

    fn publish(&self, next: SessionState) {
        {
            let mut guard = self.write_state();
            *guard = next.clone();
        }
        let _ = self.state_tx.send(next);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<A, R> Drop for SessionService<A, R> {
    fn drop(&mut self) {
        let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

/// Registration reports the first failing step's message without wrapping it
/// in a second layer of prefixes.
fn registration_error(e: Error) -> Error {
    match e {
        Error::Auth(msg) | Error::Lookup(msg) | Error::Internal(msg) => Error::Registration(msg),
        other => Error::Registration(other.to_string()),
    }
}
