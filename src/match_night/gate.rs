use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{MatchNightError, MatchNightResult};
use crate::models::common::{MatchId, MatchNightId};

/// One user-triggerable action on one entity. While an action is in flight
/// the same key cannot be admitted again; different keys never block each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKey {
    SubmitResult(MatchId),
    StartGame(MatchNightId),
    CompleteGame(MatchNightId),
    RecalculateStats(MatchNightId),
    AddParticipant(MatchNightId),
    RemoveParticipant(MatchNightId),
    Leave(MatchNightId),
    DeleteForAll(MatchNightId),
    UpdateMatchNight(MatchNightId),
    DeleteMatchNight(MatchNightId),
    CreateMatchNight,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::SubmitResult(id) => write!(f, "Submitting the result of match {}", id),
            ActionKey::StartGame(id) => write!(f, "Starting the game of match night {}", id),
            ActionKey::CompleteGame(id) => write!(f, "Completing the game of match night {}", id),
            ActionKey::RecalculateStats(id) => write!(f, "Recalculating standings of match night {}", id),
            ActionKey::AddParticipant(id) => write!(f, "Adding a participant to match night {}", id),
            ActionKey::RemoveParticipant(id) => write!(f, "Removing a participant from match night {}", id),
            ActionKey::Leave(id) => write!(f, "Leaving match night {}", id),
            ActionKey::DeleteForAll(id) => write!(f, "Deleting match night {}", id),
            ActionKey::UpdateMatchNight(id) => write!(f, "Updating match night {}", id),
            ActionKey::DeleteMatchNight(id) => write!(f, "Deleting match night {}", id),
            ActionKey::CreateMatchNight => write!(f, "Creating a match night"),
        }
    }
}

/// Admission gate shared by every component acting on behalf of one user
#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    in_flight: Arc<Mutex<HashSet<ActionKey>>>,
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for the lifetime of the returned guard
    pub fn try_acquire(&self, key: ActionKey) -> MatchNightResult<BusyGuard> {
        if !lock(&self.in_flight).insert(key) {
            tracing::warn!("{} rejected: already in flight", key);
            return Err(MatchNightError::Busy(key));
        }
        Ok(BusyGuard {
            key,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn is_busy(&self, key: ActionKey) -> bool {
        lock(&self.in_flight).contains(&key)
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Releases its key when dropped: on success, on error, on unwind and when
/// the owning future is dropped mid-flight.
#[derive(Debug)]
pub struct BusyGuard {
    key: ActionKey,
    in_flight: Arc<Mutex<HashSet<ActionKey>>>,
}

impl BusyGuard {
    pub fn key(&self) -> ActionKey {
        self.key
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

// A panic while holding the set cannot leave it half-updated, so poisoning is ignored
fn lock(set: &Mutex<HashSet<ActionKey>>) -> MutexGuard<'_, HashSet<ActionKey>> {
    match set.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
