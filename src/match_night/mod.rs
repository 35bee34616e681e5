pub mod dialog;
pub mod gate;
pub mod planner;
pub mod results;
pub mod roster;
pub mod session;
pub mod standings;
pub mod store;
pub mod validation;

use std::sync::Arc;

use crate::error::MatchNightResult;
use crate::models::common::MatchNightId;
use crate::models::match_night::MatchNight;
use crate::services::api_client::MatchNightApi;

pub use gate::{ActionGate, ActionKey, BusyGuard};
pub use planner::MatchNightPlanner;
pub use results::ResultEntry;
pub use roster::RosterManager;
pub use session::{GameSessionController, PendingRestart};
pub use standings::{Standing, StandingsCalculator};
pub use store::MatchNightStore;

/// Everything needed to work on one match night, sharing a single store and
/// admission gate
pub struct MatchNightWorkspace {
    pub store: Arc<MatchNightStore>,
    pub session: GameSessionController,
    pub results: ResultEntry,
    pub roster: RosterManager,
}

impl MatchNightWorkspace {
    pub fn new(api: Arc<dyn MatchNightApi>, gate: ActionGate, id: MatchNightId) -> Self {
        let store = Arc::new(MatchNightStore::new(Arc::clone(&api), id));
        Self {
            session: GameSessionController::new(Arc::clone(&api), Arc::clone(&store), gate.clone()),
            results: ResultEntry::new(Arc::clone(&api), Arc::clone(&store), gate.clone()),
            roster: RosterManager::new(api, Arc::clone(&store), gate),
            store,
        }
    }

    /// Fetch the aggregate, replacing whatever was held. For a running game
    /// the mode is looked up too, so standings can be labelled offline.
    pub async fn load(&self) -> MatchNightResult<Arc<MatchNight>> {
        let match_night = self.store.fetch().await?;
        if match_night.is_active() && self.session.game_mode().is_none() {
            if let Err(e) = self.session.status().await {
                tracing::warn!("Game status unavailable, labelling standings as points: {}", e);
            }
        }
        Ok(match_night)
    }

    /// Standings of the held aggregate. Pure: no remote call is made.
    pub fn standings(&self) -> MatchNightResult<Vec<Standing>> {
        let match_night = self.store.require()?;
        Ok(StandingsCalculator::standings(&match_night, self.session.game_mode()))
    }
}
