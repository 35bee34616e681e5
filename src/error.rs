use reqwest::StatusCode;
use thiserror::Error as ThisError;

use crate::match_night::gate::ActionKey;
use crate::models::common::{MatchNightId, UserId};

/// Failures talking to the match-night service
#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("{path} returned HTTP {status}{}", detail(.message))]
    Status {
        status: StatusCode,
        path: String,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn detail(message: &Option<String>) -> String {
    message
        .as_ref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            ApiError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// The server's own explanation, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Everything an action on a match night can fail with
#[derive(Debug, ThisError)]
pub enum MatchNightError {
    #[error("Not allowed: {0}")]
    Unauthorized(String),

    #[error("Not possible in the current state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("User {0} already participates in this match night")]
    AlreadyParticipant(UserId),

    #[error("User {0} does not participate in this match night")]
    NotParticipant(UserId),

    #[error("Restarting an active game discards all matches and results and must be confirmed first")]
    RestartNotConfirmed,

    #[error("{0} is already in progress")]
    Busy(ActionKey),

    #[error("Match night {0} has not been loaded")]
    NotLoaded(MatchNightId),

    #[error("Remote call failed: {0}")]
    Remote(#[from] ApiError),
}

impl MatchNightError {
    pub fn is_unauthorized(&self) -> bool {
        match self {
            MatchNightError::Unauthorized(_) => true,
            MatchNightError::Remote(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Text shown to the user at the action boundary. Remote failures prefer
    /// the service's own `error` message.
    pub fn user_message(&self) -> String {
        match self {
            MatchNightError::Remote(e) => match e.server_message() {
                Some(message) => message.to_string(),
                None if e.is_unauthorized() => "Your session has expired, please log in again".to_string(),
                None => match e {
                    ApiError::Network(_) => "The match-night service could not be reached".to_string(),
                    _ => "The match-night service rejected the request".to_string(),
                },
            },
            other => other.to_string(),
        }
    }
}

pub type MatchNightResult<T> = Result<T, MatchNightError>;
