//! Authorization for KAS requests
//!
//! A KAS only releases keys to callers whose access token is bound to the
//! public key that signs the rewrap request. The client therefore tells its
//! [`AuthProvider`] which signing key it uses before asking for the
//! `Authorization` header value.
//!
//! [`TokenSession`] is the provider most callers want. It caches one token,
//! refreshes it through a [`TokenFetcher`] (an OIDC client, say) and lets
//! only one refresh run at a time; concurrent callers wait for it and share
//! the result.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Fetches attempted before giving up on a key that keeps changing
const MAX_REFRESH_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No client public key bound; call update_client_public_key before authorization")]
    MissingClientPublicKey,

    #[error("Token fetch failed: {0}")]
    Fetch(String),

    #[error("Token rejected: {0}")]
    InvalidToken(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Bind the base64-encoded PEM of the request-signing key to future tokens
    async fn update_client_public_key(&self, signing_public_key_b64: &str) -> Result<(), AuthError>;

    /// Value for the `Authorization` header, e.g. `Bearer eyJ...`
    async fn authorization(&self) -> Result<String, AuthError>;
}

/// Source of fresh access tokens for a [`TokenSession`]
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch_token(&self, client_public_key: &str) -> Result<String, AuthError>;
}

#[derive(Debug, Default)]
struct SessionState {
    client_public_key: Option<String>,
    token: Option<String>,
    /// Bumped whenever the bound key changes
    generation: u64,
}

/// Cached, single-flight token session
pub struct TokenSession<F> {
    fetcher: F,
    state: RwLock<SessionState>,
    refresh_gate: Mutex<()>,
}

impl<F: TokenFetcher> TokenSession<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: RwLock::new(SessionState::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Drop the cached token; the next `authorization` call fetches a new one
    pub async fn invalidate(&self) {
        self.state.write().await.token = None;
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    async fn refresh(&self) -> Result<String, AuthError> {
        let _gate = self.refresh_gate.lock().await;

        for _ in 0..MAX_REFRESH_ATTEMPTS {
            // Another caller may have finished a refresh while we waited
            let (client_public_key, generation) = {
                let state = self.state.read().await;
                if let Some(token) = &state.token {
                    return Ok(token.clone());
                }
                let key = state
                    .client_public_key
                    .clone()
                    .ok_or(AuthError::MissingClientPublicKey)?;
                (key, state.generation)
            };

            tracing::debug!(generation, "refreshing access token");
            let token = self.fetcher.fetch_token(&client_public_key).await?;

            let mut state = self.state.write().await;
            if state.generation == generation {
                state.token = Some(token.clone());
                return Ok(token);
            }
            tracing::debug!(generation, "client public key changed during refresh");
        }

        Err(AuthError::Fetch(format!(
            "client public key changed during {} consecutive refreshes",
            MAX_REFRESH_ATTEMPTS
        )))
    }
}

#[async_trait]
impl<F: TokenFetcher> AuthProvider for TokenSession<F> {
    async fn update_client_public_key(&self, signing_public_key_b64: &str) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if state.client_public_key.as_deref() == Some(signing_public_key_b64) {
            return Ok(());
        }
        state.client_public_key = Some(signing_public_key_b64.to_string());
        state.token = None;
        state.generation += 1;
        Ok(())
    }

    async fn authorization(&self) -> Result<String, AuthError> {
        let cached = self.state.read().await.token.clone();
        let token = match cached {
            Some(token) => token,
            None => self.refresh().await?,
        };
        Ok(format!("Bearer {}", token))
    }
}

impl<F> std::fmt::Debug for TokenSession<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSession").finish_non_exhaustive()
    }
}

/// Fixed bearer token, for services that hand out long-lived credentials
#[derive(Clone)]
pub struct StaticBearer {
    token: String,
}

impl StaticBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticBearer([REDACTED])")
    }
}

#[async_trait]
impl AuthProvider for StaticBearer {
    async fn update_client_public_key(&self, _signing_public_key_b64: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn authorization(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::InvalidToken("empty bearer token".to_string()));
        }
        Ok(format!("Bearer {}", self.token))
    }
}
