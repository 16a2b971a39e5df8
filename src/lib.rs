pub mod backend;
pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routing;
pub mod services;
pub mod storage;
pub mod utils;

use crate::backend::{SupabaseAuth, SupabaseRows};
use crate::services::generation_service::GenerationService;
use crate::services::session_service::SessionService;
use crate::services::test_session::TestSession;
use crate::storage::LocalStore;
use reqwest::Client;
use std::sync::Arc;

/// Session store wired to the hosted backend.
pub type PortalSession = SessionService<SupabaseAuth, SupabaseRows>;

#[derive(Clone)]
pub struct Portal {
    pub session: Arc<PortalSession>,
    pub generation: GenerationService,
}

impl Portal {
    /// Wires the core from [`config::get_config`]. Must be called from
    /// within the runtime: the backend listener task is spawned here.
    pub fn new() -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let store = LocalStore::new(&config.local_storage_path);
        let auth = Arc::new(SupabaseAuth::new(
            config.backend_url.clone(),
            config.backend_publishable_key.clone(),
            http_client.clone(),
            store.clone(),
        ));
        let rows = Arc::new(SupabaseRows::new(
            config.backend_url.clone(),
            config.backend_publishable_key.clone(),
            http_client.clone(),
        ));
        let session = Arc::new(SessionService::new(auth, rows, store));
        Arc::clone(&session).spawn_backend_listener();

        let generation = GenerationService::new(
            config.generation_api_url.clone(),
            config.generation_api_key.clone(),
            http_client,
            config.max_questions,
        );

        Self {
            session,
            generation,
        }
    }

    /// Fresh mock-test state machine bound to the current session feed.
    pub fn new_test_session(&self) -> TestSession {
        let config = crate::config::get_config();
        TestSession::new(
            self.generation.clone(),
            self.session.subscribe(),
            config.seconds_per_question,
        )
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
