use chrono::{NaiveDate, NaiveTime};

use crate::error::{MatchNightError, MatchNightResult};
use crate::models::match_night::MatchNightInput;

pub const MIN_COURTS: u8 = 1;
pub const MAX_COURTS: u8 = 4;
const MAX_LOCATION_LEN: usize = 255;

/// Start time used when a new match night is planned without one
pub fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default()
}

/// Checks create and update input before it is sent to the service
#[derive(Debug, Default)]
pub struct MatchNightValidator;

impl MatchNightValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_input(&self, input: &MatchNightInput) -> MatchNightResult<()> {
        self.validate_location(&input.location)?;
        if let Some(courts) = input.num_courts {
            self.validate_num_courts(courts)?;
        }
        Ok(())
    }

    pub fn validate_location(&self, location: &str) -> MatchNightResult<()> {
        let trimmed = location.trim();

        if trimmed.is_empty() {
            return Err(MatchNightError::Validation("Location cannot be empty".to_string()));
        }

        if trimmed.len() > MAX_LOCATION_LEN {
            return Err(MatchNightError::Validation(format!(
                "Location too long (maximum {} characters)",
                MAX_LOCATION_LEN
            )));
        }

        Ok(())
    }

    pub fn validate_num_courts(&self, num_courts: u8) -> MatchNightResult<()> {
        if !(MIN_COURTS..=MAX_COURTS).contains(&num_courts) {
            return Err(MatchNightError::Validation(format!(
                "Number of courts must be between {} and {}, got {}",
                MIN_COURTS, MAX_COURTS, num_courts
            )));
        }
        Ok(())
    }

    /// Build validated input from raw form values: `YYYY-MM-DD` and an
    /// optional `HH:MM` start time.
    pub fn parse_input(
        &self,
        date: &str,
        time: Option<&str>,
        location: &str,
        num_courts: Option<u8>,
    ) -> MatchNightResult<MatchNightInput> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            MatchNightError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", date))
        })?;

        let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => Some(NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| {
                MatchNightError::Validation(format!("Invalid time '{}', expected HH:MM", raw))
            })?),
            None => None,
        };

        let input = MatchNightInput {
            date,
            time,
            location: location.trim().to_string(),
            num_courts,
        };
        self.validate_input(&input)?;
        Ok(input)
    }
}
