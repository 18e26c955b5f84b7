use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_GMAIL_API_URL: &str = "https://gmail.googleapis.com";
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub refresh_token: String,
    pub my_email: String,
    pub gmail_api_url: String,
    pub oauth_token_url: String,
}

impl AppConfig {
    /// Read the config from the environment. Call [`load_dotenv`] first
    /// to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let redirect_uri = required("REDIRECT_URI")?;
        let refresh_token = required("REFRESH_TOKEN")?;
        let my_email = required("MY_EMAIL")?;
        let gmail_api_url =
            env::var("GMAIL_API_URL").unwrap_or_else(|_| DEFAULT_GMAIL_API_URL.to_string());
        let oauth_token_url =
            env::var("OAUTH_TOKEN_URL").unwrap_or_else(|_| DEFAULT_OAUTH_TOKEN_URL.to_string());

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            refresh_token,
            my_email,
            gmail_api_url: gmail_api_url.trim_end_matches('/').to_string(),
            oauth_token_url,
        })
    }
}

/// Load a `.env` file from the working directory or one of its parents
/// into the environment. A missing file is not an error. Any other
/// failure is handed back so it can be logged once tracing is set up.
pub fn load_dotenv() -> Option<dotenvy::Error> {
    skip_not_found(dotenvy::dotenv().map(|_| ()))
}

fn skip_not_found(res: std::result::Result<(), dotenvy::Error>) -> Option<dotenvy::Error> {
    res.err().filter(|e| !e.not_found())
}

fn required(key: &str) -> Result<String> {
    let value = env::var(key).with_context(|| format!("Missing env var {}", key))?;
    if value.trim().is_empty() {
        anyhow::bail!("Env var {} is empty", key);
    }
    Ok(value)
}
