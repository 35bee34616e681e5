use std::sync::Arc;

use reqwest::StatusCode;

use crate::error::{MatchNightError, MatchNightResult};
use crate::match_night::gate::{ActionGate, ActionKey};
use crate::match_night::store::MatchNightStore;
use crate::models::common::UserId;
use crate::models::match_night::{GameStatus, MatchNight};
use crate::models::user::User;
use crate::services::api_client::MatchNightApi;

/// Who takes part in a match night, and who runs it
pub struct RosterManager {
    api: Arc<dyn MatchNightApi>,
    store: Arc<MatchNightStore>,
    gate: ActionGate,
}

impl RosterManager {
    pub fn new(api: Arc<dyn MatchNightApi>, store: Arc<MatchNightStore>, gate: ActionGate) -> Self {
        Self { api, store, gate }
    }

    /// Roster changes need the creator and a game that has not started
    fn check_can_edit_roster(match_night: &MatchNight, caller: &User) -> MatchNightResult<()> {
        if match_night.game_status != GameStatus::NotStarted {
            return Err(MatchNightError::InvalidState(format!(
                "the roster is fixed once the game is {}",
                match_night.game_status
            )));
        }
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can change participants".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_can_add(match_night: &MatchNight, caller: &User, user_id: UserId) -> MatchNightResult<()> {
        if match_night.is_participant(user_id) {
            return Err(MatchNightError::AlreadyParticipant(user_id));
        }
        Self::check_can_edit_roster(match_night, caller)
    }

    pub fn check_can_remove(match_night: &MatchNight, caller: &User, user_id: UserId) -> MatchNightResult<()> {
        Self::check_can_edit_roster(match_night, caller)?;
        if match_night.is_creator(user_id) {
            return Err(MatchNightError::Validation(
                "the creator cannot be removed, hand over and leave instead".to_string(),
            ));
        }
        if !match_night.is_participant(user_id) {
            return Err(MatchNightError::NotParticipant(user_id));
        }
        Ok(())
    }

    /// Validates a leave and returns the new creator id to send, if any.
    /// A participant who is not the creator never hands anything over.
    pub fn check_can_leave(
        match_night: &MatchNight,
        caller: &User,
        new_creator_id: Option<UserId>,
    ) -> MatchNightResult<Option<UserId>> {
        if !match_night.is_participant(caller.id) {
            return Err(MatchNightError::NotParticipant(caller.id));
        }
        if match_night.is_completed() {
            return Err(MatchNightError::InvalidState(
                "a completed match night cannot be left".to_string(),
            ));
        }
        if !match_night.is_creator(caller.id) {
            return Ok(None);
        }

        match new_creator_id {
            None => Err(MatchNightError::Validation(
                "choose a new creator before leaving".to_string(),
            )),
            Some(id) if id == caller.id || !match_night.is_participant(id) => {
                Err(MatchNightError::Validation(format!(
                    "user {} cannot take over, pick another participant",
                    id
                )))
            }
            Some(id) => Ok(Some(id)),
        }
    }

    #[tracing::instrument(name = "Add participant", skip(self, caller), fields(match_night_id = %self.store.id(), user = %caller.name))]
    pub async fn add_participant(&self, caller: &User, user_id: UserId) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::AddParticipant(self.store.id()))?;
        let match_night = self.store.ensure_loaded().await?;
        Self::check_can_add(&match_night, caller, user_id)?;

        self.store
            .refresh_after(self.api.add_participant(self.store.id(), user_id))
            .await?;

        tracing::info!("User {} added to match night {}", user_id, self.store.id());
        Ok(())
    }

    #[tracing::instrument(name = "Remove participant", skip(self, caller), fields(match_night_id = %self.store.id(), user = %caller.name))]
    pub async fn remove_participant(&self, caller: &User, user_id: UserId) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::RemoveParticipant(self.store.id()))?;
        let match_night = self.store.ensure_loaded().await?;
        Self::check_can_remove(&match_night, caller, user_id)?;

        self.store
            .refresh_after(self.api.remove_participant(self.store.id(), user_id))
            .await?;

        tracing::info!("User {} removed from match night {}", user_id, self.store.id());
        Ok(())
    }

    /// Leave the match night. The creator must name a successor; the hand-off
    /// and the departure happen in the same remote call.
    ///
    /// Once left, the caller may no longer be allowed to read the match night.
    /// A refresh rejected with 403 or 404 therefore clears the snapshot
    /// instead of failing the leave.
    #[tracing::instrument(name = "Leave match night", skip(self, caller), fields(match_night_id = %self.store.id(), user = %caller.name))]
    pub async fn leave(&self, caller: &User, new_creator_id: Option<UserId>) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::Leave(self.store.id()))?;
        let match_night = self.store.ensure_loaded().await?;
        let new_creator_id = Self::check_can_leave(&match_night, caller, new_creator_id)?;

        self.api
            .leave_match_night(self.store.id(), new_creator_id)
            .await?;

        match self.store.fetch().await {
            Ok(_) => {}
            Err(MatchNightError::Remote(e))
                if matches!(e.status(), Some(StatusCode::FORBIDDEN) | Some(StatusCode::NOT_FOUND)) =>
            {
                tracing::debug!("Match night {} no longer visible after leaving", self.store.id());
                self.store.clear();
            }
            Err(e) => return Err(e),
        }

        match new_creator_id {
            Some(id) => tracing::info!(
                "{} left match night {} and handed it over to user {}",
                caller.name,
                self.store.id(),
                id
            ),
            None => tracing::info!("{} left match night {}", caller.name, self.store.id()),
        }
        Ok(())
    }

    /// Delete the whole match night with its matches and results, for everyone
    #[tracing::instrument(name = "Delete match night for all", skip(self, caller), fields(match_night_id = %self.store.id(), user = %caller.name))]
    pub async fn delete_for_all(&self, caller: &User) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::DeleteForAll(self.store.id()))?;
        let match_night = self.store.ensure_loaded().await?;
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can delete a match night for everyone".to_string(),
            ));
        }

        self.api.delete_match_night_for_all(self.store.id()).await?;
        self.store.clear();

        tracing::info!("🗑️ Match night {} deleted for all participants", self.store.id());
        Ok(())
    }

    /// Users that can still be added
    pub fn available_users(&self, all_users: &[User]) -> Vec<User> {
        let Some(match_night) = self.store.snapshot() else {
            return Vec::new();
        };
        all_users
            .iter()
            .filter(|user| !match_night.is_participant(user.id))
            .cloned()
            .collect()
    }

    /// Participants the creator can hand the match night over to
    pub fn transfer_candidates(&self) -> Vec<User> {
        self.store
            .snapshot()
            .map(|match_night| {
                match_night
                    .participants
                    .iter()
                    .filter(|user| !match_night.is_creator(user.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
