use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::config::api::ApiSettings;
use crate::error::ApiError;
use crate::models::common::{ErrorBody, MatchId, MatchNightId, UserId};
use crate::models::game::{
    GameMode, GameSchema, GameStatusResponse, StartGameRequest, SubmitResultRequest,
    SubmitResultResponse,
};
use crate::models::match_night::{
    LeaveRequest, MatchNight, MatchNightInput, MatchNightResponse, MatchNightsResponse,
    ParticipantRequest,
};
use crate::models::user::{LoginRequest, RegisterRequest, User, UserResponse, UsersResponse};

/// Calls whose 401 means "not logged in yet" rather than "session expired".
/// Raising the login signal for them would loop the login flow.
const AUTH_CHECK_PATHS: [&str; 3] = ["/api/auth/me", "/api/auth/login", "/api/auth/quick-login"];

/// The remote match-night service. Schedule generation, persistence and
/// the final say on authorization all live behind this trait.
#[async_trait]
pub trait MatchNightApi: Send + Sync {
    async fn current_user(&self) -> Result<User, ApiError>;
    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError>;
    async fn quick_login(&self, request: &LoginRequest) -> Result<User, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    async fn recalculate_stats(&self, match_night_id: MatchNightId) -> Result<(), ApiError>;

    async fn list_match_nights(&self) -> Result<Vec<MatchNight>, ApiError>;
    async fn create_match_night(&self, input: &MatchNightInput) -> Result<MatchNight, ApiError>;
    async fn get_match_night(&self, id: MatchNightId) -> Result<MatchNight, ApiError>;
    async fn update_match_night(
        &self,
        id: MatchNightId,
        input: &MatchNightInput,
    ) -> Result<MatchNight, ApiError>;
    async fn delete_match_night(&self, id: MatchNightId) -> Result<(), ApiError>;
    async fn delete_match_night_for_all(&self, id: MatchNightId) -> Result<(), ApiError>;
    async fn leave_match_night(
        &self,
        id: MatchNightId,
        new_creator_id: Option<UserId>,
    ) -> Result<(), ApiError>;
    async fn add_participant(&self, id: MatchNightId, user_id: UserId) -> Result<(), ApiError>;
    async fn remove_participant(&self, id: MatchNightId, user_id: UserId) -> Result<(), ApiError>;

    async fn start_game(
        &self,
        match_night_id: MatchNightId,
        game_mode: GameMode,
    ) -> Result<Option<GameSchema>, ApiError>;
    async fn game_status(&self, match_night_id: MatchNightId) -> Result<GameStatusResponse, ApiError>;
    async fn complete_game(&self, match_night_id: MatchNightId) -> Result<(), ApiError>;

    async fn submit_result(
        &self,
        match_id: MatchId,
        request: &SubmitResultRequest,
    ) -> Result<SubmitResultResponse, ApiError>;
}

/// reqwest implementation of [`MatchNightApi`]. The session cookie set by the
/// login call is kept in the client's cookie store and sent on every request.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    login_required: watch::Sender<bool>,
}

impl HttpApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(settings.timeout())
            .build()?;
        let (login_required, _) = watch::channel(false);

        Ok(Self {
            client,
            base_url: settings.normalized_base_url(),
            login_required,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Flips to `true` when a call comes back 401 outside the login flow.
    /// The application should send the user back to the login entry point.
    pub fn login_required(&self) -> watch::Receiver<bool> {
        self.login_required.subscribe()
    }

    pub fn is_login_required(&self) -> bool {
        *self.login_required.borrow()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
    }

    /// Send a request and turn every non-2xx answer into [`ApiError::Status`]
    async fn execute(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        tracing::debug!("Calling match-night service: {}", path);

        let response = request.send().await.map_err(|e| {
            tracing::error!("❌ Request to {} failed: {}", path, e);
            ApiError::Network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.text());

        if status == StatusCode::UNAUTHORIZED && !AUTH_CHECK_PATHS.contains(&path) {
            tracing::warn!("Session rejected by {}, login required", path);
            self.login_required.send_replace(true);
        } else {
            tracing::error!("❌ Match-night service returned {} for {}: {:?}", status, path, message);
        }

        Err(ApiError::Status {
            status,
            path: path.to_string(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path), path).await?;
        Self::decode(response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, path).json(body);
        let response = self.execute(request, path).await?;
        Self::decode(response).await
    }

    async fn send_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, path).await?;
        Ok(())
    }

    fn mark_logged_in(&self) {
        self.login_required.send_replace(false);
    }
}

/// Start returns the new schema either bare or wrapped in `game_schema`
fn schema_from_start_body(body: &str) -> Option<GameSchema> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let schema = value.get("game_schema").cloned().unwrap_or(value);
    serde_json::from_value(schema).ok()
}

#[async_trait]
impl MatchNightApi for HttpApiClient {
    async fn current_user(&self) -> Result<User, ApiError> {
        let response: UserResponse = self.get_json("/api/auth/me").await?;
        self.mark_logged_in();
        Ok(response.user)
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        let response: UserResponse = self.send_json(Method::POST, "/api/auth/login", request).await?;
        self.mark_logged_in();
        tracing::info!("✅ Logged in as {}", response.user.name);
        Ok(response.user)
    }

    async fn quick_login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        let response: UserResponse = self
            .send_json(Method::POST, "/api/auth/quick-login", request)
            .await?;
        self.mark_logged_in();
        tracing::info!("✅ Quick login as {}", response.user.name);
        Ok(response.user)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        tracing::info!("Registering user: {}", request);
        let response: UserResponse = self
            .send_json(Method::POST, "/api/auth/register", request)
            .await?;
        self.mark_logged_in();
        Ok(response.user)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.send_unit::<()>(Method::POST, "/api/auth/logout", None).await
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let response: UsersResponse = self.get_json("/api/auth/users").await?;
        Ok(response.users)
    }

    async fn recalculate_stats(&self, match_night_id: MatchNightId) -> Result<(), ApiError> {
        let path = format!("/api/auth/recalculate-stats/{}", match_night_id);
        self.send_unit::<()>(Method::POST, &path, None).await
    }

    async fn list_match_nights(&self) -> Result<Vec<MatchNight>, ApiError> {
        let response: MatchNightsResponse = self.get_json("/api/match-nights/").await?;
        Ok(response.match_nights)
    }

    async fn create_match_night(&self, input: &MatchNightInput) -> Result<MatchNight, ApiError> {
        let response: MatchNightResponse = self
            .send_json(Method::POST, "/api/match-nights/", input)
            .await?;
        Ok(response.match_night)
    }

    async fn get_match_night(&self, id: MatchNightId) -> Result<MatchNight, ApiError> {
        self.get_json(&format!("/api/match-nights/{}", id)).await
    }

    async fn update_match_night(
        &self,
        id: MatchNightId,
        input: &MatchNightInput,
    ) -> Result<MatchNight, ApiError> {
        let path = format!("/api/match-nights/{}", id);
        let response: MatchNightResponse = self.send_json(Method::PUT, &path, input).await?;
        Ok(response.match_night)
    }

    async fn delete_match_night(&self, id: MatchNightId) -> Result<(), ApiError> {
        let path = format!("/api/match-nights/{}", id);
        self.send_unit::<()>(Method::DELETE, &path, None).await
    }

    async fn delete_match_night_for_all(&self, id: MatchNightId) -> Result<(), ApiError> {
        let path = format!("/api/match-nights/{}/delete", id);
        self.send_unit::<()>(Method::DELETE, &path, None).await
    }

    async fn leave_match_night(
        &self,
        id: MatchNightId,
        new_creator_id: Option<UserId>,
    ) -> Result<(), ApiError> {
        let path = format!("/api/match-nights/{}/leave", id);
        let body = LeaveRequest { new_creator_id };
        self.send_unit(Method::POST, &path, Some(&body)).await
    }

    async fn add_participant(&self, id: MatchNightId, user_id: UserId) -> Result<(), ApiError> {
        let path = format!("/api/match-nights/{}/add-participant", id);
        self.send_unit(Method::POST, &path, Some(&ParticipantRequest { user_id }))
            .await
    }

    async fn remove_participant(&self, id: MatchNightId, user_id: UserId) -> Result<(), ApiError> {
        let path = format!("/api/match-nights/{}/remove-participant", id);
        self.send_unit(Method::POST, &path, Some(&ParticipantRequest { user_id }))
            .await
    }

    async fn start_game(
        &self,
        match_night_id: MatchNightId,
        game_mode: GameMode,
    ) -> Result<Option<GameSchema>, ApiError> {
        let path = format!("/api/game-schemas/{}/start", match_night_id);
        let request = self
            .request(Method::POST, &path)
            .json(&StartGameRequest { game_mode });
        let response = self.execute(request, &path).await?;
        if response.status() != StatusCode::CREATED {
            tracing::warn!("Start of match night {} answered {}", match_night_id, response.status());
        }
        let body = response.text().await?;
        Ok(schema_from_start_body(&body))
    }

    async fn game_status(&self, match_night_id: MatchNightId) -> Result<GameStatusResponse, ApiError> {
        self.get_json(&format!("/api/game-schemas/{}/status", match_night_id))
            .await
    }

    async fn complete_game(&self, match_night_id: MatchNightId) -> Result<(), ApiError> {
        let path = format!("/api/game-schemas/{}/complete", match_night_id);
        self.send_unit::<()>(Method::POST, &path, None).await
    }

    async fn submit_result(
        &self,
        match_id: MatchId,
        request: &SubmitResultRequest,
    ) -> Result<SubmitResultResponse, ApiError> {
        let path = format!("/api/matches/{}/result", match_id);
        let request = self.request(Method::POST, &path).json(request);
        let response = self.execute(request, &path).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(SubmitResultResponse::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}
