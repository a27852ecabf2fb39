// terminal-client/src/auth.rs
use actix::Recipient;
use async_trait::async_trait;
use chrono::Utc;
use common::{generate_jwt_token, AuthChange, AuthConfig, AuthStateChanged, JwtError};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Minted tokens are renewed this long before they expire
const JWT_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no signed-in user")]
    NotSignedIn,
    #[error("failed to read token: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to mint token: {0}")]
    Jwt(#[from] JwtError),
}

/// Source of bearer credentials for the connection URL
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError>;
}

/// A fixed credential, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<String, AuthError> {
        self.token.clone().ok_or(AuthError::NotSignedIn)
    }
}

/// Reads a token written by an external login tool
pub struct FileTokenProvider {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl FileTokenProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref() {
                return Ok(token.clone());
            }
        }

        let contents = tokio::fs::read_to_string(&self.path).await?;
        let token = contents.trim();
        if token.is_empty() {
            *cached = None;
            return Err(AuthError::NotSignedIn);
        }

        tracing::debug!("Loaded token from {}", self.path.display());
        *cached = Some(token.to_string());
        Ok(token.to_string())
    }
}

/// Mints short-lived HS256 tokens for local development backends
pub struct JwtTokenProvider {
    user_id: String,
    secret: Vec<u8>,
    cached: Mutex<Option<(String, i64)>>,
}

impl JwtTokenProvider {
    pub fn new(user_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            user_id: user_id.into(),
            secret: secret.into(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for JwtTokenProvider {
    async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if !force_refresh {
            if let Some((token, exp)) = cached.as_ref() {
                if *exp - JWT_REFRESH_MARGIN_SECS > Utc::now().timestamp() {
                    return Ok(token.clone());
                }
            }
        }

        let (token, exp) = generate_jwt_token(&self.user_id, &self.secret)?;
        *cached = Some((token.clone(), exp));
        Ok(token)
    }
}

/// Pick a provider: token file, then minted JWT, then static token
pub fn provider_from_config(auth: &AuthConfig) -> Arc<dyn TokenProvider> {
    if let Some(path) = &auth.token_file {
        tracing::info!("Using token file {}", path.display());
        return Arc::new(FileTokenProvider::new(path.clone()));
    }
    if let Some(secret) = &auth.jwt_secret {
        let user_id = auth.user_id.clone().unwrap_or_else(|| "terminal".to_string());
        tracing::info!("Minting development tokens for {}", user_id);
        return Arc::new(JwtTokenProvider::new(user_id, secret.as_bytes().to_vec()));
    }
    if auth.token.is_none() {
        tracing::warn!("No credentials configured; connecting with an empty token");
    }
    Arc::new(StaticTokenProvider::new(auth.token.clone()))
}

/// Handle returned by [`AuthStateSource::subscribe`]. Dropping it unsubscribes.
pub struct AuthSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthSubscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Notifies listeners whenever the signed-in identity or its token changes
pub trait AuthStateSource: Send + Sync {
    fn subscribe(&self, listener: Recipient<AuthStateChanged>) -> AuthSubscription;
}

type Listeners = DashMap<Uuid, Recipient<AuthStateChanged>>;

/// In-process auth-state fan-out
#[derive(Default)]
pub struct AuthBroadcaster {
    listeners: Arc<Listeners>,
}

impl AuthBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `change` to every live listener, pruning dead ones
    pub fn notify(&self, change: AuthChange) {
        tracing::info!("Auth state changed: {:?}", change);
        let msg = AuthStateChanged { change };
        self.listeners.retain(|id, listener| {
            if !listener.connected() {
                tracing::debug!("Dropping closed auth listener {}", id);
                return false;
            }
            listener.do_send(msg.clone());
            true
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl AuthStateSource for AuthBroadcaster {
    fn subscribe(&self, listener: Recipient<AuthStateChanged>) -> AuthSubscription {
        let id = Uuid::new_v4();
        self.listeners.insert(id, listener);

        let listeners: Weak<Listeners> = Arc::downgrade(&self.listeners);
        AuthSubscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.remove(&id);
            }
        })
    }
}
