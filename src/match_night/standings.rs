use serde::{Deserialize, Serialize};

use crate::models::common::UserId;
use crate::models::game::{GameMode, PointsUnit};
use crate::models::match_night::{MatchNight, PlayerStats};

/// One row of the standings table
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Standing {
    /// 1-based position in the table
    pub rank: usize,
    pub user_id: UserId,
    pub name: String,
    pub total_points: i64,
    pub unit: PointsUnit,
}

pub struct StandingsCalculator;

impl StandingsCalculator {
    /// Order stats by `total_points`, highest first. The sort is stable, so
    /// equal totals keep the order the service returned them in.
    pub fn order(stats: &[PlayerStats]) -> Vec<PlayerStats> {
        let mut ordered = stats.to_vec();
        ordered.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        ordered
    }

    /// Standings for the given aggregate. Without a known game mode the
    /// totals are labelled as points.
    pub fn standings(match_night: &MatchNight, game_mode: Option<GameMode>) -> Vec<Standing> {
        let unit = game_mode
            .map(|mode| mode.points_unit())
            .unwrap_or(PointsUnit::Points);

        Self::order(&match_night.player_stats)
            .into_iter()
            .enumerate()
            .map(|(index, stat)| Standing {
                rank: index + 1,
                user_id: stat.user_id,
                name: Self::display_name(match_night, &stat),
                total_points: stat.total_points,
                unit,
            })
            .collect()
    }

    fn display_name(match_night: &MatchNight, stat: &PlayerStats) -> String {
        if let Some(name) = stat.user_name.as_ref().filter(|n| !n.is_empty()) {
            return name.clone();
        }
        match_night
            .participants
            .iter()
            .find(|p| p.id == stat.user_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Player {}", stat.user_id))
    }
}
