//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::media::{MediaClient, MediaError};
use crate::services::tokens::TokenKeys;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenKeys,
    media: Option<MediaClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the media HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, MediaError> {
        let tokens = TokenKeys::new(&config.jwt);
        let media = config.media.as_ref().map(MediaClient::new).transpose()?;

        if media.is_none() {
            tracing::warn!("Media service not configured; image uploads are disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                media,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Token signing and verification keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// The media client, if media credentials are configured.
    #[must_use]
    pub fn media(&self) -> Option<&MediaClient> {
        self.inner.media.as_ref()
    }
}
