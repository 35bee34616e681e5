use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::MatchNightResult;
use crate::match_night::results::ResultEntry;
use crate::models::common::MatchId;
use crate::models::game::Match;
use crate::models::user::User;

/// Lifecycle of a modal: closed, being filled in, or waiting on the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState<T> {
    Idle,
    Open(T),
    Submitting(T),
}

impl<T> Default for DialogState<T> {
    fn default() -> Self {
        DialogState::Idle
    }
}

impl<T> DialogState<T> {
    pub fn is_open(&self) -> bool {
        !matches!(self, DialogState::Idle)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, DialogState::Submitting(_))
    }

    pub fn draft(&self) -> Option<&T> {
        match self {
            DialogState::Idle => None,
            DialogState::Open(draft) | DialogState::Submitting(draft) => Some(draft),
        }
    }
}

/// Values typed into the result dialog for one match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDraft {
    pub match_id: MatchId,
    pub team1_games: u32,
    pub team2_games: u32,
    pub error: Option<String>,
}

impl ResultDraft {
    /// Starts from the recorded score when the match already has one
    pub fn for_match(game: &Match) -> Self {
        let (team1_games, team2_games) = game
            .result
            .as_ref()
            .and_then(|r| r.games())
            .unwrap_or((0, 0));
        Self {
            match_id: game.id,
            team1_games,
            team2_games,
            error: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResultDialog {
    state: DialogState<ResultDraft>,
}

impl ResultDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DialogState<ResultDraft> {
        &self.state
    }

    pub fn open(&mut self, game: &Match) {
        if self.state.is_submitting() {
            return;
        }
        self.state = DialogState::Open(ResultDraft::for_match(game));
    }

    pub fn set_games(&mut self, team1_games: u32, team2_games: u32) {
        if let DialogState::Open(draft) = &mut self.state {
            draft.team1_games = team1_games;
            draft.team2_games = team2_games;
        }
    }

    /// Closing is ignored while a submission is in flight
    pub fn close(&mut self) {
        if !self.state.is_submitting() {
            self.state = DialogState::Idle;
        }
    }

    /// Submit the draft. Success closes the dialog; a failure reopens it with
    /// the message to show.
    pub async fn submit(&mut self, entry: &ResultEntry, caller: &User) -> MatchNightResult<Option<Match>> {
        let draft = match std::mem::take(&mut self.state) {
            DialogState::Open(draft) => draft,
            other => {
                self.state = other;
                return Ok(None);
            }
        };
        self.state = DialogState::Submitting(draft.clone());

        match entry
            .submit(caller, draft.match_id, draft.team1_games, draft.team2_games)
            .await
        {
            Ok(next_match) => {
                self.state = DialogState::Idle;
                Ok(next_match)
            }
            Err(e) => {
                self.state = DialogState::Open(ResultDraft {
                    error: Some(e.user_message()),
                    ..draft
                });
                Err(e)
            }
        }
    }
}

/// Listeners for "clicked outside" events. Only open dropdowns are
/// registered, each through a [`DropdownGuard`].
#[derive(Debug, Clone, Default)]
pub struct DismissListeners {
    next_id: Arc<AtomicU64>,
    open: Arc<Mutex<HashMap<u64, Arc<AtomicBool>>>>,
}

impl DismissListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a dropdown; it stays registered until the guard is dropped
    pub fn open_dropdown(&self) -> DropdownGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let is_open = Arc::new(AtomicBool::new(true));
        self.lock().insert(id, Arc::clone(&is_open));
        DropdownGuard {
            id,
            is_open,
            listeners: self.clone(),
        }
    }

    /// Close every open dropdown
    pub fn outside_click(&self) {
        for is_open in self.lock().values() {
            is_open.store(false, Ordering::Release);
        }
    }

    pub fn registered(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<AtomicBool>>> {
        match self.open.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Debug)]
pub struct DropdownGuard {
    id: u64,
    is_open: Arc<AtomicBool>,
    listeners: DismissListeners,
}

impl DropdownGuard {
    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Acquire)
    }
}

impl Drop for DropdownGuard {
    fn drop(&mut self) {
        self.listeners.lock().remove(&self.id);
    }
}
