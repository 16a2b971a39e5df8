use std::env;

#[test]
fn config_reads_environment_with_defaults() {
    env::set_var("BACKEND_URL", "https://example.supabase.co");
    env::set_var("BACKEND_PUBLISHABLE_KEY", "publishable-key");
    env::set_var("GENERATION_API_KEY", "generation-key");
    env::remove_var("GENERATION_API_URL");
    env::remove_var("LOCAL_STORAGE_PATH");
    env::remove_var("MAX_QUESTIONS");
    env::remove_var("SECONDS_PER_QUESTION");

    placement_portal::config::init_config().expect("init config");
    let config = placement_portal::config::get_config();

    assert_eq!(config.backend_url, "https://example.supabase.co");
    assert_eq!(
        config.generation_api_url,
        placement_portal::config::DEFAULT_GENERATION_URL
    );
    assert_eq!(config.local_storage_path, "portal_storage.json");
    assert_eq!(config.max_questions, 10);
    assert_eq!(config.seconds_per_question, 60);
}
