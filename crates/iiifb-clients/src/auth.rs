use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::ClientError;

/// Abstraction over bearer-token acquisition; enables test injection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, ClientError>;
}

/// OAuth2 client-credentials settings for the preservation API.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Token authority, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    pub client_id: String,
    pub client_secret: String,
    /// Requested scope, e.g. `api://<client_id>/.default`.
    pub scope: String,
}

/// Token provider performing the client-credentials flow, caching the token
/// until shortly before expiry and renewing silently on a miss.
pub struct CachedTokenProvider {
    creds: ClientCredentials,
    client: reqwest::Client,
    cache: Mutex<Option<(String, Instant)>>,
}

impl CachedTokenProvider {
    pub fn new(creds: ClientCredentials, client: reqwest::Client) -> Self {
        Self {
            creds,
            client,
            cache: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for CachedTokenProvider {
    async fn token(&self) -> Result<String, ClientError> {
        {
            let guard = self.cache.lock().await;
            if let Some((tok, expiry)) = guard.as_ref() {
                if Instant::now() < *expiry {
                    return Ok(tok.clone());
                }
            }
        }

        info!("No preservation auth token in cache, fetching a new one");
        let url = format!("{}/oauth2/v2.0/token", self.creds.authority);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", &self.creds.client_id),
            ("client_secret", &self.creds.client_secret),
            ("scope", &self.creds.scope),
        ];
        let resp: Value = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ClientError::Token(format!("token request: {e}")))?
            .json()
            .await
            .map_err(|e| ClientError::Token(format!("token decode: {e}")))?;

        let tok = resp["access_token"]
            .as_str()
            .ok_or_else(|| ClientError::Token(format!("no access_token in response: {resp}")))?
            .to_string();
        let expires_in = resp["expires_in"].as_u64().unwrap_or(3600);
        let expiry = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));

        *self.cache.lock().await = Some((tok.clone(), expiry));
        Ok(tok)
    }
}

/// Fixed token for tests.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, ClientError> {
        Ok(self.0.clone())
    }
}
