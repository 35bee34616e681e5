use std::future::Future;
use std::sync::{Arc, RwLock};

use crate::error::{ApiError, MatchNightError, MatchNightResult};
use crate::models::common::MatchNightId;
use crate::models::match_night::MatchNight;
use crate::services::api_client::MatchNightApi;

/// Read-through cache of one match-night aggregate.
///
/// The held aggregate is only ever replaced wholesale by a fetch. Mutations
/// go through [`MatchNightStore::refresh_after`], which re-fetches once the
/// remote call succeeded and leaves the previous snapshot untouched when it
/// failed.
pub struct MatchNightStore {
    api: Arc<dyn MatchNightApi>,
    id: MatchNightId,
    current: RwLock<Option<Arc<MatchNight>>>,
}

impl MatchNightStore {
    pub fn new(api: Arc<dyn MatchNightApi>, id: MatchNightId) -> Self {
        Self {
            api,
            id,
            current: RwLock::new(None),
        }
    }

    pub fn id(&self) -> MatchNightId {
        self.id
    }

    /// The last fetched aggregate, if any
    pub fn snapshot(&self) -> Option<Arc<MatchNight>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn require(&self) -> MatchNightResult<Arc<MatchNight>> {
        self.snapshot().ok_or(MatchNightError::NotLoaded(self.id))
    }

    /// Fetch the aggregate and make it the authoritative snapshot
    #[tracing::instrument(name = "Fetch match night", skip(self), fields(match_night_id = %self.id))]
    pub async fn fetch(&self) -> MatchNightResult<Arc<MatchNight>> {
        let match_night = Arc::new(self.api.get_match_night(self.id).await?);
        tracing::debug!(
            "Fetched match night {}: {} participants, {} matches, status {}",
            match_night.id,
            match_night.participant_count(),
            match_night.matches.len(),
            match_night.game_status
        );
        self.replace(Some(Arc::clone(&match_night)));
        Ok(match_night)
    }

    /// The held snapshot, fetching it first if nothing was loaded yet
    pub async fn ensure_loaded(&self) -> MatchNightResult<Arc<MatchNight>> {
        match self.snapshot() {
            Some(match_night) => Ok(match_night),
            None => self.fetch().await,
        }
    }

    /// Run a remote mutation, then re-fetch. A failed mutation surfaces its
    /// error and keeps the previous snapshot. If the mutation succeeded but
    /// the re-fetch fails, the re-fetch error is returned: the remote state
    /// changed but the snapshot could not follow.
    pub async fn refresh_after<T, F>(&self, mutation: F) -> MatchNightResult<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let value = mutation.await?;
        self.fetch().await?;
        Ok(value)
    }

    /// Drop the snapshot, used once the aggregate no longer exists remotely
    pub fn clear(&self) {
        self.replace(None);
    }

    fn replace(&self, match_night: Option<Arc<MatchNight>>) {
        match self.current.write() {
            Ok(mut guard) => *guard = match_night,
            Err(poisoned) => *poisoned.into_inner() = match_night,
        }
    }
}
