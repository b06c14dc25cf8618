// HTTP catalog client.
//
// Issues a single GET per entity and maps the JSON body into a hidden
// `GuessableEntity`. No retries: when a fetch fails the round controller
// parks in `Failed` and waits for the user.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use whosthat_core::config::CatalogConfig;
use whosthat_core::entity::GuessableEntity;

use crate::error::NetworkError;
use crate::payload::CatalogResponse;

// ---------------------------------------------------------------------------
// CatalogClient seam
// ---------------------------------------------------------------------------

/// Source of guessable entities. The round controller only depends on this
/// trait so tests can substitute a scripted catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch the entity with catalog id `id`.
    async fn fetch_by_id(&self, id: u32) -> Result<GuessableEntity, NetworkError>;
}

// ---------------------------------------------------------------------------
// PokeApiClient
// ---------------------------------------------------------------------------

/// reqwest-backed client for a PokeAPI-shaped catalog.
pub struct PokeApiClient {
    http: reqwest::Client,
    base_url: String,
    max_id: u32,
}

impl PokeApiClient {
    /// Create a client for `base_url` accepting ids in `1..=max_id`.
    pub fn new(base_url: &str, max_id: u32, timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            max_id,
        })
    }

    /// Build a client from the `[catalog]` config section.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, NetworkError> {
        Self::new(&config.base_url, config.max_id, config.timeout())
    }

    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    /// URL the entity with `id` is fetched from.
    pub fn entity_url(&self, id: u32) -> String {
        format!("{}/{id}", self.base_url)
    }
}

#[async_trait]
impl CatalogClient for PokeApiClient {
    async fn fetch_by_id(&self, id: u32) -> Result<GuessableEntity, NetworkError> {
        if id == 0 || id > self.max_id {
            return Err(NetworkError::IdOutOfRange {
                id,
                max_id: self.max_id,
            });
        }

        let url = self.entity_url(id);
        debug!(%url, "fetching catalog entity");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "catalog returned non-success status");
            return Err(NetworkError::Status(status));
        }

        let body = response.text().await?;
        let entity = CatalogResponse::parse(&body)?.into_entity()?;
        debug!(id = entity.id(), "catalog entity mapped");
        Ok(entity)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
