use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_GENERATION_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_publishable_key: String,
    pub generation_api_url: String,
    pub generation_api_key: String,
    pub local_storage_path: String,
    pub max_questions: usize,
    pub seconds_per_question: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            backend_url: get_env("BACKEND_URL")?,
            backend_publishable_key: get_env("BACKEND_PUBLISHABLE_KEY")?,
            generation_api_url: env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_URL.to_string()),
            generation_api_key: get_env("GENERATION_API_KEY")?,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "portal_storage.json".to_string()),
            max_questions: get_env_parse_or("MAX_QUESTIONS", 10)?,
            seconds_per_question: get_env_parse_or("SECONDS_PER_QUESTION", 60)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
