use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use leadpulse_core::{config::Config, store::SessionStore};
use leadpulse_metadata::MetadataStore;

use crate::error::AppError;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Businesses and visits.
    pub metadata: Arc<dyn MetadataStore>,

    /// Append-only session files.
    pub sessions: Arc<dyn SessionStore>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Fast in-process cache of site ids known to belong to a business.
    ///
    /// Populated lazily on the first lookup of each site and on creation.
    /// Businesses are never deleted, so entries are never evicted.
    site_cache: RwLock<HashSet<String>>,
}

impl AppState {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        sessions: Arc<dyn SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            metadata,
            sessions,
            config: Arc::new(config),
            site_cache: RwLock::new(HashSet::new()),
        }
    }

    /// Check whether `site_id` belongs to a registered business.
    pub async fn is_known_site(&self, site_id: &str) -> anyhow::Result<bool> {
        {
            let cache = self.site_cache.read().await;
            if cache.contains(site_id) {
                return Ok(true);
            }
        }

        let exists = self.metadata.business_exists(site_id).await?;
        if exists {
            self.remember_site(site_id).await;
        }
        Ok(exists)
    }

    /// Gate for every `/sites/{siteId}/...` endpoint. A failed lookup is a
    /// 500, not a 404.
    pub async fn require_site(&self, site_id: &str) -> Result<(), AppError> {
        if self.is_known_site(site_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Unknown site: {site_id}")))
        }
    }

    pub async fn remember_site(&self, site_id: &str) {
        let mut cache = self.site_cache.write().await;
        cache.insert(site_id.to_string());
    }
}
