use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{MatchNightError, MatchNightResult};
use crate::match_night::gate::{ActionGate, ActionKey};
use crate::match_night::store::MatchNightStore;
use crate::match_night::validation::MatchNightValidator;
use crate::models::common::MatchNightId;
use crate::models::match_night::{GameStatus, MatchNight, MatchNightInput};
use crate::models::user::User;
use crate::services::api_client::MatchNightApi;

/// Listing, planning and editing match nights as a whole
pub struct MatchNightPlanner {
    api: Arc<dyn MatchNightApi>,
    gate: ActionGate,
    validator: MatchNightValidator,
}

impl MatchNightPlanner {
    pub fn new(api: Arc<dyn MatchNightApi>, gate: ActionGate) -> Self {
        Self {
            api,
            gate,
            validator: MatchNightValidator::new(),
        }
    }

    /// All match nights visible to the caller, in dashboard order
    #[tracing::instrument(name = "List match nights", skip(self))]
    pub async fn list(&self) -> MatchNightResult<Vec<MatchNight>> {
        let mut match_nights = self.api.list_match_nights().await?;
        Self::dashboard_order(&mut match_nights);
        tracing::debug!("Loaded {} match nights", match_nights.len());
        Ok(match_nights)
    }

    /// Running games first with the newest on top, then upcoming and finished
    /// ones, each oldest first
    pub fn dashboard_order(match_nights: &mut [MatchNight]) {
        fn priority(status: GameStatus) -> u8 {
            match status {
                GameStatus::Active => 0,
                GameStatus::NotStarted => 1,
                GameStatus::Completed => 2,
            }
        }

        match_nights.sort_by(|a, b| {
            match priority(a.game_status).cmp(&priority(b.game_status)) {
                Ordering::Equal if a.is_active() => b.date.cmp(&a.date),
                Ordering::Equal => a.date.cmp(&b.date),
                other => other,
            }
        });
    }

    /// Create a match night with the caller as creator, then invite the
    /// selected users. An invitation that fails is logged and skipped; the
    /// match night itself stays.
    #[tracing::instrument(name = "Create match night", skip(self, caller, input, initial_participants), fields(user = %caller.name))]
    pub async fn create(
        &self,
        caller: &User,
        input: &MatchNightInput,
        initial_participants: &[User],
    ) -> MatchNightResult<MatchNight> {
        let _busy = self.gate.try_acquire(ActionKey::CreateMatchNight)?;
        self.validator.validate_input(input)?;

        let created = self.api.create_match_night(input).await?;
        tracing::info!("📅 Match night {} created at {}", created.id, created.location);

        for user in initial_participants.iter().filter(|u| u.id != caller.id) {
            match self.api.add_participant(created.id, user.id).await {
                Ok(()) => tracing::debug!("Added {} to match night {}", user.name, created.id),
                Err(e) => tracing::error!("Failed to add user {}: {}", user.name, e),
            }
        }

        Ok(created)
    }

    /// Change date, location or courts. Only the creator can, and not once
    /// the game is completed.
    #[tracing::instrument(name = "Update match night", skip(self, store, caller, input), fields(match_night_id = %store.id(), user = %caller.name))]
    pub async fn update(
        &self,
        store: &MatchNightStore,
        caller: &User,
        input: &MatchNightInput,
    ) -> MatchNightResult<Arc<MatchNight>> {
        let _busy = self.gate.try_acquire(ActionKey::UpdateMatchNight(store.id()))?;
        let match_night = store.ensure_loaded().await?;
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can edit a match night".to_string(),
            ));
        }
        if match_night.is_completed() {
            return Err(MatchNightError::InvalidState(
                "a completed match night cannot be edited".to_string(),
            ));
        }
        self.validator.validate_input(input)?;

        store
            .refresh_after(self.api.update_match_night(store.id(), input))
            .await?;
        store.require()
    }

    /// Remove a match night through the plain delete endpoint
    #[tracing::instrument(name = "Delete match night", skip(self, caller), fields(user = %caller.name))]
    pub async fn delete(&self, caller: &User, id: MatchNightId) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::DeleteMatchNight(id))?;
        self.api.delete_match_night(id).await?;
        tracing::info!("🗑️ Match night {} deleted by {}", id, caller.name);
        Ok(())
    }
}
