//! Session lifecycle: renewable secret -> bearer token
//!
//! The manager is refreshed once at construction and then on a fixed period by a
//! background task. There is no reactive renew path: a rejected token stays in
//! place until the next tick succeeds.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Bearer token and readiness, always read and written together
#[derive(Debug, Clone, Default)]
struct TokenState {
    bearer: String,
    ready: bool,
}

/// Owns the session secret and the short-lived bearer token
pub struct SessionManager {
    credentials: tokio::sync::Mutex<CredentialStore>,
    token: RwLock<TokenState>,
    transport: Arc<dyn Transport>,
}

impl SessionManager {
    /// Create a manager and perform the first refresh.
    ///
    /// Fails if the first refresh does not produce a token.
    pub async fn initialize(
        credentials: CredentialStore,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        let manager = Arc::new(Self {
            credentials: tokio::sync::Mutex::new(credentials),
            token: RwLock::new(TokenState::default()),
            transport,
        });

        manager
            .try_refresh()
            .await
            .map_err(|e| Error::Initialization(format!("first session refresh failed: {}", e)))?;

        Ok(manager)
    }

    /// Renew the bearer token, rotating the stored secret if the backend asks to.
    ///
    /// Returns `false` and marks the session not ready on any failure; the
    /// previous token is kept.
    pub async fn refresh(&self) -> bool {
        match self.try_refresh().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Session refresh failed: {}", e);
                false
            }
        }
    }

    async fn try_refresh(&self) -> Result<()> {
        let mut credentials = self.credentials.lock().await;
        let result = self.fetch_bearer(&mut credentials).await;

        let mut token = self.token.write();
        match result {
            Ok(bearer) => {
                *token = TokenState {
                    bearer,
                    ready: true,
                };
                tracing::info!("Session token refreshed");
                Ok(())
            }
            Err(e) => {
                token.ready = false;
                Err(e)
            }
        }
    }

    async fn fetch_bearer(&self, credentials: &mut CredentialStore) -> Result<String> {
        let response = self.transport.fetch_session(credentials.secret()).await?;

        if let Some(renewed) = response.renewed_secret {
            if renewed != credentials.secret() {
                if let Err(e) = credentials.replace(renewed) {
                    tracing::warn!(
                        "Failed to persist renewed session token to {}: {}",
                        credentials.path().display(),
                        e
                    );
                }
            }
        }

        codec::decode_session(&response.body)
            .map_err(|e| Error::Auth(format!("unusable session body: {}", e)))
    }

    /// Current bearer token, which may be stale if the session is not ready
    pub fn current_token(&self) -> String {
        self.token.read().bearer.clone()
    }

    /// Whether the last refresh succeeded
    pub fn is_ready(&self) -> bool {
        self.token.read().ready
    }

    /// Bearer token if the session is ready, from one consistent snapshot
    pub fn bearer(&self) -> Option<String> {
        let token = self.token.read();
        token.ready.then(|| token.bearer.clone())
    }

    /// Refresh every `interval` until `cancel` fires.
    ///
    /// The first tick is one full interval away; construction already refreshed.
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Session refresh task stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        manager.refresh().await;
                    }
                }
            }
        })
    }
}
