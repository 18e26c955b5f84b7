//! OAuth 2.0 access tokens for the Gmail API using a long-lived
//! refresh token.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::core::AppConfig;
use crate::error::{MailError, Result};

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Google hands out one hour tokens when `expires_in` is omitted
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(Clone, Debug)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub refresh_token: String,
    pub token_url: String,
}

impl From<&AppConfig> for OAuthCredentials {
    fn from(config: &AppConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            refresh_token: config.refresh_token.clone(),
            token_url: config.oauth_token_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// Exchange the refresh token for a fresh access token.
pub async fn refresh_access_token(
    client: &Client,
    credentials: &OAuthCredentials,
) -> Result<OAuthToken> {
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("redirect_uri", credentials.redirect_uri.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
        ("grant_type", "refresh_token"),
    ];
    let res = client
        .post(&credentials.token_url)
        .form(&params)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        // Google answers an expired or revoked refresh token with 400
        // invalid_grant rather than 401
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(MailError::Auth { status, body: text });
        }
        return Err(MailError::Api { status, body: text });
    }
    let token: OAuthToken = serde_json::from_str(&text)?;
    Ok(token)
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Hands out a valid access token, refreshing it only when it is
/// missing or about to expire.
pub struct TokenCache {
    client: Client,
    credentials: OAuthCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client: Client, credentials: OAuthCredentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now() + EXPIRY_MARGIN
        {
            return Ok(token.access_token.clone());
        }

        tracing::debug!("Refreshing Gmail access token");
        let token = refresh_access_token(&self.client, &self.credentials).await?;
        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });

        Ok(access_token)
    }

    /// Drop the cached token so the next call refreshes it.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }
}
