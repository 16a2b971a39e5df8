pub mod generation_service;
pub mod scoring_service;
pub mod session_service;
pub mod test_session;
