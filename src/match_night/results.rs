use std::sync::Arc;

use crate::error::{ApiError, MatchNightError, MatchNightResult};
use crate::match_night::gate::{ActionGate, ActionKey};
use crate::match_night::store::MatchNightStore;
use crate::models::common::{MatchId, UserId};
use crate::models::game::{Match, SubmitResultRequest};
use crate::models::match_night::MatchNight;
use crate::models::user::User;
use crate::services::api_client::MatchNightApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Team1Won,
    Team2Won,
    Draw,
}

/// What gets sent for a match given the games each team won
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedResult {
    pub score: String,
    pub winner_ids: Vec<UserId>,
    pub outcome: Outcome,
}

impl From<DerivedResult> for SubmitResultRequest {
    fn from(result: DerivedResult) -> Self {
        SubmitResultRequest {
            score: result.score,
            winner_ids: result.winner_ids,
        }
    }
}

/// Winners are the two players of the team with more games. Equal counts
/// are a draw with no winners; `0-0` means nothing was entered.
pub fn derive_result(game: &Match, team1_games: u32, team2_games: u32) -> MatchNightResult<DerivedResult> {
    if team1_games == 0 && team2_games == 0 {
        return Err(MatchNightError::Validation(
            "enter the games won for both teams".to_string(),
        ));
    }

    let (outcome, winner_ids) = if team1_games > team2_games {
        (Outcome::Team1Won, game.team1().to_vec())
    } else if team2_games > team1_games {
        (Outcome::Team2Won, game.team2().to_vec())
    } else {
        (Outcome::Draw, Vec::new())
    };

    Ok(DerivedResult {
        score: format!("{}-{}", team1_games, team2_games),
        winner_ids,
        outcome,
    })
}

/// Enters and corrects match results. Every accepted result is followed by
/// a standings recompute and then a refresh, in that order.
pub struct ResultEntry {
    api: Arc<dyn MatchNightApi>,
    store: Arc<MatchNightStore>,
    gate: ActionGate,
}

impl ResultEntry {
    pub fn new(api: Arc<dyn MatchNightApi>, store: Arc<MatchNightStore>, gate: ActionGate) -> Self {
        Self { api, store, gate }
    }

    pub fn check_can_edit(match_night: &MatchNight, caller: &User) -> MatchNightResult<()> {
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can enter results".to_string(),
            ));
        }
        if match_night.is_completed() {
            return Err(MatchNightError::InvalidState(
                "results of a completed game cannot change".to_string(),
            ));
        }
        Ok(())
    }

    pub fn can_edit(&self, caller: &User) -> bool {
        self.store
            .snapshot()
            .map(|mn| Self::check_can_edit(&mn, caller).is_ok())
            .unwrap_or(false)
    }

    /// Record or overwrite the result of `match_id`. Returns the follow-up
    /// match the service scheduled, if any.
    #[tracing::instrument(
        name = "Submit match result",
        skip(self, caller),
        fields(match_night_id = %self.store.id(), user = %caller.name)
    )]
    pub async fn submit(
        &self,
        caller: &User,
        match_id: MatchId,
        team1_games: u32,
        team2_games: u32,
    ) -> MatchNightResult<Option<Match>> {
        let _busy = self.gate.try_acquire(ActionKey::SubmitResult(match_id))?;
        let match_night = self.store.ensure_loaded().await?;
        Self::check_can_edit(&match_night, caller)?;

        let game = match_night.find_match(match_id).ok_or_else(|| {
            MatchNightError::Validation(format!(
                "match {} is not part of match night {}",
                match_id, match_night.id
            ))
        })?;
        let derived = derive_result(game, team1_games, team2_games)?;
        let outcome = derived.outcome;
        let request = SubmitResultRequest::from(derived);

        let match_night_id = self.store.id();
        let response = self
            .store
            .refresh_after(async {
                let response = self.api.submit_result(match_id, &request).await?;
                self.api.recalculate_stats(match_night_id).await?;
                Ok::<_, ApiError>(response)
            })
            .await?;

        tracing::info!(
            "Result {} ({:?}) saved for match {} of match night {}",
            request.score,
            outcome,
            match_id,
            match_night_id
        );
        if let Some(next) = &response.next_match {
            tracing::info!("👑 Next King of the Court match scheduled: {} on court {}", next.id, next.court);
        }

        Ok(response.next_match)
    }

    /// Ask the service to recompute standings from the recorded results
    #[tracing::instrument(name = "Recalculate stats", skip(self, caller), fields(match_night_id = %self.store.id()))]
    pub async fn recalculate_stats(&self, caller: &User) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::RecalculateStats(self.store.id()))?;
        let match_night = self.store.ensure_loaded().await?;
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can recalculate standings".to_string(),
            ));
        }
        if !match_night.has_results() {
            return Err(MatchNightError::InvalidState(
                "there are no results to calculate standings from".to_string(),
            ));
        }

        self.store
            .refresh_after(self.api.recalculate_stats(self.store.id()))
            .await
    }
}
