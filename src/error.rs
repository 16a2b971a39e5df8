pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Profile lookup failed: {0}")]
    Lookup(String),

    #[error("Content generation failed: {0}")]
    Generation(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Single-field validation failure raised before any network round-trip.
    pub fn validation(field: &'static str, message: &str) -> Self {
        let mut err = validator::ValidationError::new("invalid");
        err.message = Some(std::borrow::Cow::Owned(message.to_string()));
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, err);
        Error::Validation(errors)
    }
}
