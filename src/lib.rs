pub mod config;
pub mod error;
pub mod match_night;
pub mod models;
pub mod services;
pub mod telemetry;

pub use error::{ApiError, MatchNightError, MatchNightResult};
