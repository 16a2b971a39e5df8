mod common;

use common::temp_store_path;
use placement_portal::storage::{LocalStore, GUEST_FLAG_KEY, GUEST_USER_KEY};

#[test]
fn values_round_trip_across_store_instances() {
    let path = temp_store_path("kv");
    let store = LocalStore::new(path.clone());

    store
        .set(GUEST_USER_KEY, serde_json::json!({"id": "guest"}))
        .expect("set user");
    store
        .set(GUEST_FLAG_KEY, serde_json::json!(true))
        .expect("set flag");

    let reopened = LocalStore::new(path);
    assert_eq!(
        reopened.get(GUEST_USER_KEY),
        Some(serde_json::json!({"id": "guest"}))
    );
    assert_eq!(reopened.get(GUEST_FLAG_KEY), Some(serde_json::json!(true)));
}

#[test]
fn removing_a_key_leaves_the_rest_intact() {
    let store = LocalStore::new(temp_store_path("rm"));
    store.set("a", serde_json::json!(1)).expect("set a");
    store.set("b", serde_json::json!(2)).expect("set b");

    store.remove("a").expect("remove a");
    assert_eq!(store.get("a"), None);
    assert_eq!(store.get("b"), Some(serde_json::json!(2)));

    // Removing an absent key is a no-op, not an error.
    store.remove("a").expect("remove absent");
}

#[test]
fn missing_file_reads_as_empty() {
    let store = LocalStore::new(temp_store_path("missing"));
    assert_eq!(store.get("anything"), None);
}

#[test]
fn corrupt_file_resets_instead_of_failing() {
    let path = temp_store_path("corrupt");
    std::fs::write(&path, "[1, 2, 3]").expect("seed corrupt file");

    let store = LocalStore::new(path);
    assert_eq!(store.get("key"), None);
    store.set("key", serde_json::json!("value")).expect("recovers");
    assert_eq!(store.get("key"), Some(serde_json::json!("value")));
}
