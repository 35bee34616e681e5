use std::sync::{Arc, RwLock};

use crate::error::{MatchNightError, MatchNightResult};
use crate::match_night::gate::{ActionGate, ActionKey};
use crate::match_night::store::MatchNightStore;
use crate::models::game::{GameMode, GameSchema, GameStatusResponse};
use crate::models::match_night::{GameStatus, MatchNight};
use crate::models::user::User;
use crate::services::api_client::MatchNightApi;

/// The scheduler needs two full teams
pub const MIN_PARTICIPANTS: usize = 4;

/// Drives `not_started -> active -> completed` for one match night.
/// Each transition is a single remote call followed by a refresh.
pub struct GameSessionController {
    api: Arc<dyn MatchNightApi>,
    store: Arc<MatchNightStore>,
    gate: ActionGate,
    // Last known mode of the running or finished session
    game_mode: RwLock<Option<GameMode>>,
}

/// A restart that has been prepared but not yet sent. Restarting discards
/// every match and result of the running session, so the remote call is
/// only reachable through [`PendingRestart::confirm`].
#[derive(Debug)]
pub struct PendingRestart<'a> {
    controller: &'a GameSessionController,
    caller: User,
    pub game_mode: GameMode,
    pub matches_discarded: usize,
    pub results_discarded: usize,
}

impl PendingRestart<'_> {
    pub fn warning(&self) -> String {
        format!(
            "Starting a new {} game removes {} matches and {} recorded results. This cannot be undone.",
            self.game_mode.display_name(),
            self.matches_discarded,
            self.results_discarded
        )
    }

    pub async fn confirm(self) -> MatchNightResult<Option<GameSchema>> {
        tracing::warn!(
            "Restart confirmed by {}: discarding {} matches",
            self.caller.name,
            self.matches_discarded
        );
        self.controller.launch(&self.caller, self.game_mode, true).await
    }
}

impl std::fmt::Debug for GameSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GameSessionController {{ match_night_id: {} }}", self.store.id())
    }
}

impl GameSessionController {
    pub fn new(api: Arc<dyn MatchNightApi>, store: Arc<MatchNightStore>, gate: ActionGate) -> Self {
        Self {
            api,
            store,
            gate,
            game_mode: RwLock::new(None),
        }
    }

    /// Game mode seen on the last start or status call. Never calls the service.
    pub fn game_mode(&self) -> Option<GameMode> {
        match self.game_mode.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn remember_mode(&self, game_mode: GameMode) {
        match self.game_mode.write() {
            Ok(mut guard) => *guard = Some(game_mode),
            Err(poisoned) => *poisoned.into_inner() = Some(game_mode),
        }
    }

    /// Preconditions shared by start and restart
    pub fn check_can_start(match_night: &MatchNight, caller: &User) -> MatchNightResult<()> {
        if match_night.participant_count() < MIN_PARTICIPANTS {
            return Err(MatchNightError::InvalidState(format!(
                "at least {} participants are required, there are {}",
                MIN_PARTICIPANTS,
                match_night.participant_count()
            )));
        }
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can start a game".to_string(),
            ));
        }
        if match_night.is_completed() {
            return Err(MatchNightError::InvalidState(
                "the game of this match night is already completed".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_can_complete(match_night: &MatchNight, caller: &User) -> MatchNightResult<()> {
        if !match_night.is_creator(caller.id) {
            return Err(MatchNightError::Unauthorized(
                "only the creator can complete a game".to_string(),
            ));
        }
        if match_night.game_status != GameStatus::Active {
            return Err(MatchNightError::InvalidState(format!(
                "only an active game can be completed, the game is {}",
                match_night.game_status
            )));
        }
        Ok(())
    }

    /// Start the first game session. On an active session this refuses with
    /// [`MatchNightError::RestartNotConfirmed`]; use [`Self::prepare_restart`].
    #[tracing::instrument(name = "Start game", skip(self, caller), fields(match_night_id = %self.store.id(), user = %caller.name))]
    pub async fn start(&self, caller: &User, game_mode: GameMode) -> MatchNightResult<Option<GameSchema>> {
        let match_night = self.store.ensure_loaded().await?;
        Self::check_can_start(&match_night, caller)?;
        if match_night.is_active() {
            return Err(MatchNightError::RestartNotConfirmed);
        }
        self.launch(caller, game_mode, false).await
    }

    /// Prepare replacing the running session with a freshly scheduled one
    pub async fn prepare_restart(
        &self,
        caller: &User,
        game_mode: GameMode,
    ) -> MatchNightResult<PendingRestart<'_>> {
        let match_night = self.store.ensure_loaded().await?;
        Self::check_can_start(&match_night, caller)?;
        if !match_night.is_active() {
            return Err(MatchNightError::InvalidState(
                "there is no active game to restart".to_string(),
            ));
        }
        Ok(PendingRestart {
            controller: self,
            caller: caller.clone(),
            game_mode,
            matches_discarded: match_night.matches.len(),
            results_discarded: match_night.results_recorded(),
        })
    }

    async fn launch(
        &self,
        caller: &User,
        game_mode: GameMode,
        restart: bool,
    ) -> MatchNightResult<Option<GameSchema>> {
        let _busy = self.gate.try_acquire(ActionKey::StartGame(self.store.id()))?;

        // Re-check against the snapshot in case it changed since preparation
        let match_night = self.store.require()?;
        Self::check_can_start(&match_night, caller)?;
        if match_night.is_active() != restart {
            return Err(MatchNightError::InvalidState(format!(
                "the game is {} now, start again",
                match_night.game_status
            )));
        }

        let schema = self
            .store
            .refresh_after(self.api.start_game(self.store.id(), game_mode))
            .await?;
        self.remember_mode(game_mode);

        tracing::info!(
            "🎮 {} game started for match night {}",
            game_mode.display_name(),
            self.store.id()
        );
        Ok(schema)
    }

    /// Finish the session. Irreversible: no roster or result changes afterwards.
    #[tracing::instrument(name = "Complete game", skip(self, caller), fields(match_night_id = %self.store.id(), user = %caller.name))]
    pub async fn complete(&self, caller: &User) -> MatchNightResult<()> {
        let _busy = self.gate.try_acquire(ActionKey::CompleteGame(self.store.id()))?;
        let match_night = self.store.ensure_loaded().await?;
        Self::check_can_complete(&match_night, caller)?;

        self.store
            .refresh_after(self.api.complete_game(self.store.id()))
            .await?;

        tracing::info!("🏁 Game of match night {} completed", self.store.id());
        Ok(())
    }

    /// Which schema, if any, is running remotely. A running schema's mode is
    /// remembered for [`Self::game_mode`].
    pub async fn status(&self) -> MatchNightResult<GameStatusResponse> {
        let status = self.api.game_status(self.store.id()).await?;
        if let Some(game_mode) = status.active_mode() {
            self.remember_mode(game_mode);
        }
        Ok(status)
    }

    pub fn can_start(&self, caller: &User) -> bool {
        self.store
            .snapshot()
            .map(|mn| Self::check_can_start(&mn, caller).is_ok())
            .unwrap_or(false)
    }

    pub fn can_complete(&self, caller: &User) -> bool {
        self.store
            .snapshot()
            .map(|mn| Self::check_can_complete(&mn, caller).is_ok())
            .unwrap_or(false)
    }
}
