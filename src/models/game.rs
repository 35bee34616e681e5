// src/models/game.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::common::{MatchId, MatchNightId, UserId};

/// The two formats the service knows how to schedule
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    EveryoneVsEveryone,
    KingOfTheCourt,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::EveryoneVsEveryone, GameMode::KingOfTheCourt];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::EveryoneVsEveryone => "everyone_vs_everyone",
            GameMode::KingOfTheCourt => "king_of_the_court",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameMode::EveryoneVsEveryone => "Everyone vs everyone",
            GameMode::KingOfTheCourt => "King of the Court",
        }
    }

    /// What `total_points` counts under this mode
    pub fn points_unit(&self) -> PointsUnit {
        match self {
            GameMode::EveryoneVsEveryone => PointsUnit::Points,
            GameMode::KingOfTheCourt => PointsUnit::Wins,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "everyone_vs_everyone" => Ok(GameMode::EveryoneVsEveryone),
            "king_of_the_court" => Ok(GameMode::KingOfTheCourt),
            other => Err(format!(
                "{} is not a supported game mode. \
                Use either `everyone_vs_everyone` or `king_of_the_court`.",
                other
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PointsUnit {
    Points,
    Wins,
}

impl fmt::Display for PointsUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointsUnit::Points => write!(f, "points"),
            PointsUnit::Wins => write!(f, "wins"),
        }
    }
}

/// One scheduled match: team {player1, player2} against team {player3, player4}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Match {
    pub id: MatchId,
    #[serde(default)]
    pub match_night_id: Option<MatchNightId>,
    pub player1_id: UserId,
    #[serde(default)]
    pub player1_name: Option<String>,
    pub player2_id: UserId,
    #[serde(default)]
    pub player2_name: Option<String>,
    pub player3_id: UserId,
    #[serde(default)]
    pub player3_name: Option<String>,
    pub player4_id: UserId,
    #[serde(default)]
    pub player4_name: Option<String>,
    pub round: u32,
    pub court: u32,
    // Consolation pairing, flagged by the scheduler
    #[serde(default)]
    pub is_naai_partij: Option<bool>,
    #[serde(default)]
    pub result: Option<MatchResult>,
}

impl Match {
    pub fn team1(&self) -> [UserId; 2] {
        [self.player1_id, self.player2_id]
    }

    pub fn team2(&self) -> [UserId; 2] {
        [self.player3_id, self.player4_id]
    }

    pub fn players(&self) -> [UserId; 4] {
        [self.player1_id, self.player2_id, self.player3_id, self.player4_id]
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.players().contains(&user_id)
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_consolation(&self) -> bool {
        self.is_naai_partij.unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MatchResult {
    #[serde(default)]
    pub id: Option<i64>,
    pub match_id: MatchId,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub winner_ids: Vec<UserId>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl MatchResult {
    /// Games per team as stored in `score`. Unparseable halves count as 0.
    pub fn games(&self) -> Option<(u32, u32)> {
        self.score.as_deref().map(parse_score)
    }

    pub fn is_draw(&self) -> bool {
        self.winner_ids.is_empty()
    }
}

/// Split a `"{team1}-{team2}"` literal into game counts, falling back to 0
/// for a missing or malformed half.
pub fn parse_score(score: &str) -> (u32, u32) {
    let mut parts = score.splitn(2, '-');
    let team1 = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    let team2 = parts.next().and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    (team1, team2)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitResultRequest {
    pub score: String,
    pub winner_ids: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SubmitResultResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// King of the court schedules the follow-up match as results come in
    #[serde(default)]
    pub next_match: Option<Match>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaStatus {
    Pending,
    Active,
    Completed,
}

/// The server-side schedule generated for one game session
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GameSchema {
    pub id: i64,
    pub match_night_id: MatchNightId,
    pub game_mode: GameMode,
    pub status: SchemaStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub matches: Option<Vec<Match>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StartGameRequest {
    pub game_mode: GameMode,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GameStatusResponse {
    pub game_active: bool,
    #[serde(default)]
    pub game_schema: Option<GameSchema>,
}

impl GameStatusResponse {
    pub fn active_mode(&self) -> Option<GameMode> {
        if !self.game_active {
            return None;
        }
        self.game_schema.as_ref().map(|schema| schema.game_mode)
    }
}
