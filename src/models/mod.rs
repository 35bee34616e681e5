pub mod common;
pub mod game;
pub mod match_night;
pub mod user;
