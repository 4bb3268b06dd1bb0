//! Bearer token verification against the external identity provider.
//!
//! The provider exposes a Supabase-compatible `GET /auth/v1/user` endpoint:
//! it answers 2xx with the user record for a valid access token and 401/403
//! otherwise. Verified tokens are cached for a short TTL so a browsing
//! session does not hit the provider on every cart request.

mod error;

pub use error::IdentityError;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use nutrishop_core::UserId;

use crate::config::IdentityConfig;

/// Upper bound on verified tokens held in memory.
const CACHE_CAPACITY: u64 = 10_000;

/// Upper bound on a single provider call.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// The subset of the provider's user record we rely on.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
}

/// Client for the identity provider.
///
/// Cheap to clone; clones share the HTTP client and token cache.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    user_endpoint: Url,
    api_key: SecretString,
    cache: Cache<String, UserId>,
}

impl IdentityClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider URL is unusable or the HTTP client
    /// cannot be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                user_endpoint: user_endpoint(&config.base_url)?,
                api_key: config.api_key.clone(),
                cache,
            }),
        })
    }

    /// Resolve an access token to the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Rejected` if the provider does not accept the
    /// token, or another variant if the provider could not be consulted.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<UserId, IdentityError> {
        if let Some(user_id) = self.inner.cache.get(token).await {
            debug!(%user_id, "Token verified from cache");
            return Ok(user_id);
        }

        let response = self
            .inner
            .client
            .get(self.inner.user_endpoint.clone())
            .bearer_auth(token)
            .header("apikey", self.inner.api_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IdentityError::Rejected);
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus(status.as_u16()));
        }

        let user: ProviderUser = response.json().await?;
        let user_id = UserId::new(user.id);

        self.inner.cache.insert(token.to_owned(), user_id).await;
        debug!(%user_id, "Token verified by identity provider");

        Ok(user_id)
    }
}

/// `{base}/auth/v1/user`, keeping any path prefix on `base`.
fn user_endpoint(base: &Url) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("auth/v1/user")
}
