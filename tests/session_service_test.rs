mod common;

use common::{session_for, temp_store_path, user_row, FakeAuth, FakeRows};
use placement_portal::backend::AuthEvent;
use placement_portal::dto::{LoginRequest, RegisterRequest};
use placement_portal::error::Error;
use placement_portal::models::identity::{Role, SessionState};
use placement_portal::services::session_service::SessionService;
use placement_portal::storage::LocalStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type Service = Arc<SessionService<FakeAuth, FakeRows>>;

fn service(
    auth: FakeAuth,
    rows: FakeRows,
    store: LocalStore,
) -> (Service, Arc<FakeAuth>, Arc<FakeRows>) {
    let auth = Arc::new(auth);
    let rows = Arc::new(rows);
    let svc = Arc::new(SessionService::new(
        Arc::clone(&auth),
        Arc::clone(&rows),
        store,
    ));
    (svc, auth, rows)
}

async fn wait_for_state(
    service: &Service,
    predicate: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    let mut rx = service.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("session feed closed")
        .clone();
    state
}

#[tokio::test]
async fn initialize_without_session_resolves_logged_out() {
    let (svc, _auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(temp_store_path("init")),
    );

    assert!(svc.current().is_loading);
    svc.initialize().await;

    let state = svc.current();
    assert!(!state.is_loading);
    assert!(!state.is_guest);
    assert!(state.identity.is_none());
}

#[tokio::test]
async fn restored_session_hydrates_identity_from_user_record() {
    let user_id = Uuid::new_v4().to_string();
    let rows = FakeRows::new();
    rows.seed(
        "users",
        &user_id,
        user_row(&user_id, "John Student", "student", None),
    );

    let (svc, _auth, _rows) = service(
        FakeAuth::with_session(&user_id),
        rows,
        LocalStore::new(temp_store_path("restore")),
    );
    svc.initialize().await;

    let state = svc.current();
    let identity = state.identity.expect("identity resolved");
    assert_eq!(identity.id, user_id);
    assert_eq!(identity.role, Role::Student);
    assert_eq!(identity.name, "John Student");
    assert!(!state.is_guest);
}

#[tokio::test]
async fn restored_session_without_user_record_resolves_logged_out() {
    let user_id = Uuid::new_v4().to_string();
    let (svc, _auth, _rows) = service(
        FakeAuth::with_session(&user_id),
        FakeRows::new(),
        LocalStore::new(temp_store_path("orphan")),
    );
    svc.initialize().await;

    let state = svc.current();
    assert!(state.identity.is_none());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn guest_identity_round_trips_through_local_persistence() {
    let path = temp_store_path("guest");
    let (svc, _auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(path.clone()),
    );

    let identity = svc.guest_login(Role::Company).expect("guest login");
    assert_eq!(identity.id, "guest");
    assert_eq!(identity.name, "Guest Company");
    assert_eq!(identity.approved, Some(true));
    assert!(svc.current().is_guest);

    // Simulated reload: a fresh service over the same storage file adopts the
    // identical guest identity without touching the backend.
    let (reloaded, _auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(path),
    );
    reloaded.initialize().await;

    let state = reloaded.current();
    assert!(state.is_guest);
    assert_eq!(state.identity, Some(identity));
}

#[tokio::test]
async fn login_rejection_surfaces_backend_message() {
    let (svc, _auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(temp_store_path("badlogin")),
    );
    svc.initialize().await;

    let err = svc
        .login(&LoginRequest {
            email: "student@zidio.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("credentials rejected");
    match err {
        Error::Auth(msg) => assert_eq!(msg, "Invalid login credentials"),
        other => panic!("expected Auth error, got {:?}", other),
    }
    assert!(svc.current().identity.is_none());
}

#[tokio::test]
async fn login_resolves_identity_through_backend_listener() {
    let user_id = Uuid::new_v4().to_string();
    let rows = FakeRows::new();
    rows.seed(
        "users",
        &user_id,
        user_row(&user_id, "Tech Corp", "company", Some(true)),
    );

    let (svc, _auth, _rows) = service(
        FakeAuth::new(&user_id),
        rows,
        LocalStore::new(temp_store_path("login")),
    );
    svc.initialize().await;
    Arc::clone(&svc).spawn_backend_listener();

    svc.login(&LoginRequest {
        email: "company@zidio.com".to_string(),
        password: "password123".to_string(),
    })
    .await
    .expect("login accepted");

    let state = wait_for_state(&svc, |s| s.identity.is_some()).await;
    let identity = state.identity.expect("identity resolved");
    assert_eq!(identity.role, Role::Company);
    assert_eq!(identity.approved, Some(true));
    assert!(!state.is_guest);
}

#[tokio::test]
async fn backend_events_are_ignored_while_guest() {
    let user_id = Uuid::new_v4().to_string();
    let (svc, auth, _rows) = service(
        FakeAuth::new(&user_id),
        FakeRows::new(),
        LocalStore::new(temp_store_path("guestevt")),
    );
    svc.initialize().await;
    Arc::clone(&svc).spawn_backend_listener();
    svc.guest_login(Role::Student).expect("guest login");

    auth.emit(AuthEvent::SignedOut);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = svc.current();
    assert!(state.is_guest);
    assert!(state.identity.is_some());
}

#[tokio::test]
async fn sign_out_event_clears_identity() {
    let user_id = Uuid::new_v4().to_string();
    let rows = FakeRows::new();
    rows.seed(
        "users",
        &user_id,
        user_row(&user_id, "John Student", "student", None),
    );

    let (svc, auth, _rows) = service(
        FakeAuth::new(&user_id),
        rows,
        LocalStore::new(temp_store_path("signout")),
    );
    svc.initialize().await;
    Arc::clone(&svc).spawn_backend_listener();

    auth.emit(AuthEvent::SignedIn(session_for(&user_id)));
    wait_for_state(&svc, |s| s.identity.is_some()).await;

    auth.emit(AuthEvent::SignedOut);
    let state = wait_for_state(&svc, |s| s.identity.is_none()).await;
    assert!(!state.is_guest);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn guest_logout_clears_persisted_identity_synchronously() {
    let path = temp_store_path("guestout");
    let (svc, _auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(path.clone()),
    );
    svc.guest_login(Role::Student).expect("guest login");

    svc.logout().await.expect("logout");
    assert!(svc.current().identity.is_none());

    // Nothing left to restore on the next start.
    let (reloaded, _auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(path),
    );
    reloaded.initialize().await;
    assert!(reloaded.current().identity.is_none());
}

#[tokio::test]
async fn company_registration_writes_unapproved_user_then_profile() {
    let user_id = Uuid::new_v4().to_string();
    let (svc, _auth, rows) = service(
        FakeAuth::new(&user_id),
        FakeRows::new(),
        LocalStore::new(temp_store_path("regco")),
    );

    svc.register(&RegisterRequest {
        name: "Tech Corp".to_string(),
        email: "company@zidio.com".to_string(),
        password: "password123".to_string(),
        confirm_password: "password123".to_string(),
        role: Role::Company,
    })
    .await
    .expect("registration");

    let inserts = rows.inserts.lock().unwrap().clone();
    assert_eq!(inserts.len(), 2);
    assert_eq!(inserts[0].0, "users");
    assert_eq!(inserts[0].1["approved"], serde_json::json!(false));
    assert_eq!(inserts[0].1["role"], serde_json::json!("company"));
    assert_eq!(inserts[1].0, "company_profiles");
}

#[tokio::test]
async fn student_registration_is_approved_immediately() {
    let user_id = Uuid::new_v4().to_string();
    let (svc, _auth, rows) = service(
        FakeAuth::new(&user_id),
        FakeRows::new(),
        LocalStore::new(temp_store_path("regst")),
    );

    svc.register(&RegisterRequest {
        name: "John Student".to_string(),
        email: "student@zidio.com".to_string(),
        password: "password123".to_string(),
        confirm_password: "password123".to_string(),
        role: Role::Student,
    })
    .await
    .expect("registration");

    let inserts = rows.inserts.lock().unwrap().clone();
    assert_eq!(inserts[0].1["approved"], serde_json::json!(true));
    assert_eq!(inserts[1].0, "student_profiles");
}

#[tokio::test]
async fn registration_stops_at_first_failing_step() {
    let user_id = Uuid::new_v4().to_string();
    let rows = FakeRows::new();
    rows.fail_inserts_for("users");

    let (svc, auth, rows) = service(
        FakeAuth::new(&user_id),
        rows,
        LocalStore::new(temp_store_path("regfail")),
    );

    let err = svc
        .register(&RegisterRequest {
            name: "Tech Corp".to_string(),
            email: "company@zidio.com".to_string(),
            password: "password123".to_string(),
            confirm_password: "password123".to_string(),
            role: Role::Company,
        })
        .await
        .expect_err("users insert rejected");
    assert!(matches!(err, Error::Registration(_)));

    // The credential step ran, the profile step never did.
    assert_eq!(auth.sign_up_calls.load(Ordering::SeqCst), 1);
    assert!(rows.inserted_tables().is_empty());
}

#[tokio::test]
async fn mismatched_passwords_fail_before_any_backend_call() {
    let (svc, auth, _rows) = service(
        FakeAuth::new(&Uuid::new_v4().to_string()),
        FakeRows::new(),
        LocalStore::new(temp_store_path("regval")),
    );

    let err = svc
        .register(&RegisterRequest {
            name: "John Student".to_string(),
            email: "student@zidio.com".to_string(),
            password: "password123".to_string(),
            confirm_password: "different456".to_string(),
            role: Role::Student,
        })
        .await
        .expect_err("validation rejects");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(auth.sign_up_calls.load(Ordering::SeqCst), 0);
}
