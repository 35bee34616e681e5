pub mod api_client;
pub mod auth_context;

pub use api_client::{HttpApiClient, MatchNightApi};
pub use auth_context::AuthContext;
