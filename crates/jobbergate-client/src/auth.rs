//! OIDC client-credentials authentication.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::cache::TokenCache;
use crate::error::ClientError;

/// Tokens this close to expiry are treated as expired.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::seconds(10);

/// Where and as whom to request tokens.
#[derive(Debug, Clone)]
pub struct OidcCredentials {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

impl OidcCredentials {
    pub fn token_url(&self) -> String {
        format!(
            "{}/protocol/openid-connect/token",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(access_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Whether the token is still usable at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - TOKEN_EXPIRY_MARGIN > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Hands out a valid access token, fetching a new one when needed.
#[derive(Debug)]
pub struct TokenManager {
    credentials: OidcCredentials,
    cache: Option<TokenCache>,
    current: RwLock<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(credentials: OidcCredentials, cache: Option<TokenCache>) -> Self {
        let current = cache.as_ref().and_then(|c| match c.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Ignoring unreadable token cache {}: {}", c.path(), e);
                None
            }
        });

        Self {
            credentials,
            cache,
            current: RwLock::new(current),
        }
    }

    /// Return a fresh access token.
    pub async fn access_token(&self, http: &Client) -> Result<String, ClientError> {
        {
            // Release the read lock once leaving the block
            let current = self.current.read().await;
            if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.access_token().to_string());
            }
        }

        let mut current = self.current.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token().to_string());
        }

        let token = self.request_token(http).await?;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.save(&token)
        {
            tracing::warn!("Could not write token cache {}: {}", cache.path(), e);
        }

        let access_token = token.access_token().to_string();
        *current = Some(token);
        Ok(access_token)
    }

    /// Drop the current token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.clear()
        {
            tracing::warn!("Could not clear token cache {}: {}", cache.path(), e);
        }
    }

    async fn request_token(&self, http: &Client) -> Result<CachedToken, ClientError> {
        let url = self.credentials.token_url();
        tracing::debug!(url = %url, client_id = %self.credentials.client_id, "requesting access token");

        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("audience", self.credentials.audience.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!("{} from {}: {}", status, url, body)));
        }

        let grant: TokenResponse = response.json().await?;
        let expires_at = expiry(Utc::now(), grant.expires_in).ok_or_else(|| {
            ClientError::Auth(format!("token lifetime out of range: {}", grant.expires_in))
        })?;
        Ok(CachedToken {
            access_token: grant.access_token,
            expires_at,
        })
    }
}

/// When a token granted at `now` for `expires_in` seconds runs out.
fn expiry(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    now.checked_add_signed(Duration::try_seconds(expires_in)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use tempfile::TempDir;

    fn credentials() -> OidcCredentials {
        OidcCredentials {
            base_url: "https://auth.example.org/realms/jobbergate/".to_string(),
            client_id: "agent".to_string(),
            client_secret: "secret".to_string(),
            audience: "https://apis.example.org".to_string(),
        }
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            credentials().token_url(),
            "https://auth.example.org/realms/jobbergate/protocol/openid-connect/token"
        );
    }

    #[test]
    fn test_expiry_rejects_absurd_lifetimes() {
        let now = Utc::now();
        assert_eq!(expiry(now, 300), Some(now + Duration::seconds(300)));
        assert_eq!(expiry(now, i64::MAX), None);
        assert_eq!(expiry(now, i64::MAX / 1000), None);
    }

    #[test]
    fn test_token_freshness_margin() {
        let now = Utc::now();
        assert!(CachedToken::new("a".into(), now + Duration::seconds(60)).is_fresh(now));
        assert!(!CachedToken::new("a".into(), now + Duration::seconds(5)).is_fresh(now));
        assert!(!CachedToken::new("a".into(), now - Duration::seconds(1)).is_fresh(now));
    }

    #[tokio::test]
    async fn test_fresh_cached_token_is_reused() {
        let temp = TempDir::new().unwrap();
        let cache = TokenCache::new(Utf8Path::from_path(temp.path()).unwrap());
        cache
            .save(&CachedToken::new(
                "from-disk".into(),
                Utc::now() + Duration::seconds(600),
            ))
            .unwrap();

        let manager = TokenManager::new(credentials(), Some(cache));
        // No request is made: the OIDC host above does not exist.
        let token = manager.access_token(&Client::new()).await.unwrap();
        assert_eq!(token, "from-disk");
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_ignored() {
        let temp = TempDir::new().unwrap();
        let cache = TokenCache::new(Utf8Path::from_path(temp.path()).unwrap());
        std::fs::write(cache.path(), "garbage").unwrap();

        let manager = TokenManager::new(credentials(), Some(cache));
        assert!(manager.current.read().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let temp = TempDir::new().unwrap();
        let cache = TokenCache::new(Utf8Path::from_path(temp.path()).unwrap());
        cache
            .save(&CachedToken::new("x".into(), Utc::now() + Duration::seconds(600)))
            .unwrap();
        let path = cache.path().to_owned();

        let manager = TokenManager::new(credentials(), Some(cache));
        manager.invalidate().await;
        assert!(manager.current.read().await.is_none());
        assert!(!path.exists());
    }
}
