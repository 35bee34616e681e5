// src/models/match_night.rs
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::common::{deserialize_service_datetime, MatchId, MatchNightId, UserId};
use crate::models::game::Match;
use crate::models::user::User;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Completed,
    // Anything the client does not recognise is treated as not started
    #[serde(other)]
    NotStarted,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::NotStarted => "not_started",
            GameStatus::Active => "active",
            GameStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        GameStatus::NotStarted
    }
}

/// Accumulated points of one participant, computed by the service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerStats {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub match_night_id: Option<MatchNightId>,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    pub total_points: i64,
}

/// The match-night aggregate as returned by `GET /api/match-nights/{id}`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MatchNight {
    pub id: MatchNightId,
    #[serde(deserialize_with = "deserialize_service_datetime")]
    pub date: NaiveDateTime,
    pub location: String,
    pub num_courts: u8,
    pub creator_id: UserId,
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default)]
    pub game_status: GameStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub participants_count: usize,
    #[serde(default)]
    pub participants: Vec<User>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub player_stats: Vec<PlayerStats>,
}

impl MatchNight {
    pub fn is_creator(&self, user_id: UserId) -> bool {
        self.creator_id == user_id
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    pub fn is_completed(&self) -> bool {
        self.game_status == GameStatus::Completed
    }

    pub fn is_active(&self) -> bool {
        self.game_status == GameStatus::Active
    }

    /// Participant count, preferring the embedded roster over the summary field
    pub fn participant_count(&self) -> usize {
        if self.participants.is_empty() {
            self.participants_count
        } else {
            self.participants.len()
        }
    }

    pub fn find_match(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn results_recorded(&self) -> usize {
        self.matches.iter().filter(|m| m.has_result()).count()
    }

    pub fn has_results(&self) -> bool {
        self.matches.iter().any(|m| m.has_result())
    }

    /// Names of the four players of `game`: the name embedded in the match,
    /// else the roster entry, else `#id`
    pub fn lineup(&self, game: &Match) -> [String; 4] {
        let seats = [
            (game.player1_id, &game.player1_name),
            (game.player2_id, &game.player2_name),
            (game.player3_id, &game.player3_name),
            (game.player4_id, &game.player4_name),
        ];
        seats.map(|(user_id, embedded)| {
            embedded
                .clone()
                .filter(|name| !name.is_empty())
                .or_else(|| {
                    self.participants
                        .iter()
                        .find(|p| p.id == user_id)
                        .map(|p| p.name.clone())
                })
                .unwrap_or_else(|| format!("#{}", user_id))
        })
    }
}

/// Body of create and update calls
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MatchNightInput {
    pub date: NaiveDate,
    #[serde(
        serialize_with = "serialize_hh_mm",
        deserialize_with = "deserialize_hh_mm",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub time: Option<NaiveTime>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub num_courts: Option<u8>,
}

impl MatchNightInput {
    /// Pre-fill an edit form from an existing match night
    pub fn from_match_night(match_night: &MatchNight) -> Self {
        Self {
            date: match_night.date.date(),
            time: Some(match_night.date.time()),
            location: match_night.location.clone(),
            num_courts: Some(match_night.num_courts),
        }
    }
}

fn serialize_hh_mm<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match time {
        Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_hh_mm<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid time: {}", raw))),
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchNightResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub match_night: MatchNight,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchNightsResponse {
    pub match_nights: Vec<MatchNight>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParticipantRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LeaveRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_creator_id: Option<UserId>,
}
