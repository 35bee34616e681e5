#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use padelmate::config::api::ApiSettings;
use padelmate::match_night::validation::default_start_time;
use padelmate::match_night::{ActionGate, MatchNightWorkspace};
use padelmate::models::common::{MatchId, MatchNightId, UserId};
use padelmate::models::game::{
    GameMode, GameSchema, Match, MatchResult, SchemaStatus, StartGameRequest, SubmitResultRequest,
};
use padelmate::models::match_night::{
    GameStatus, LeaveRequest, MatchNight, MatchNightInput, ParticipantRequest, PlayerStats,
};
use padelmate::models::user::{LoginRequest, RegisterRequest, User};
use padelmate::services::{AuthContext, HttpApiClient, MatchNightApi};
use padelmate::telemetry::{get_subscriber, init_subscriber};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const PASSWORD: &str = "secret";

/// Players every fake service starts with
pub const ANNA: UserId = 1;
pub const BRAM: UserId = 2;
pub const CAS: UserId = 3;
pub const DAAN: UserId = 4;
pub const EVA: UserId = 5;
pub const FEMKE: UserId = 6;

/// In-memory stand-in for the match-night backend. The session is global:
/// whoever logged in last is the current user.
pub struct FakeState {
    pub users: Vec<User>,
    pub session_user: Option<UserId>,
    pub match_nights: BTreeMap<MatchNightId, MatchNight>,
    pub schemas: HashMap<MatchNightId, GameSchema>,
    pub calls: Vec<String>,
    pub fail_next: Option<&'static str>,
    next_id: i64,
}

impl FakeState {
    fn new() -> Self {
        let seeded_users: Vec<User> = ["Anna", "Bram", "Cas", "Daan", "Eva", "Femke"]
            .iter()
            .enumerate()
            .map(|(i, name)| User {
                id: i as UserId + 1,
                name: name.to_string(),
                email: Some(format!("{}@padel.test", name.to_lowercase())),
                created_at: None,
            })
            .collect();
        Self {
            users: seeded_users,
            session_user: None,
            match_nights: BTreeMap::new(),
            schemas: HashMap::new(),
            calls: Vec::new(),
            fail_next: None,
            next_id: 100,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: UserId) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    /// Record the call and fail it if the test asked for that
    fn enter(&mut self, operation: &'static str) -> Result<(), HttpResponse> {
        self.calls.push(operation.to_string());
        if self.fail_next == Some(operation) {
            self.fail_next = None;
            return Err(HttpResponse::InternalServerError()
                .json(json!({ "error": format!("{} failed on the server", operation) })));
        }
        Ok(())
    }

    fn caller(&self) -> Result<UserId, HttpResponse> {
        self.session_user
            .ok_or_else(|| HttpResponse::Unauthorized().json(json!({ "error": "Authentication required" })))
    }

    fn visible(&self, id: MatchNightId, caller: UserId) -> Result<&MatchNight, HttpResponse> {
        let match_night = self
            .match_nights
            .get(&id)
            .ok_or_else(|| error(404, "Match night not found"))?;
        if !match_night.is_participant(caller) {
            return Err(error(403, "You are not a participant of this match night"));
        }
        Ok(match_night)
    }

    fn owned_mut(&mut self, id: MatchNightId, caller: UserId) -> Result<&mut MatchNight, HttpResponse> {
        let match_night = self
            .match_nights
            .get_mut(&id)
            .ok_or_else(|| error(404, "Match night not found"))?;
        if !match_night.is_creator(caller) {
            return Err(error(403, "Only the creator can do this"));
        }
        Ok(match_night)
    }

    fn recalculate(&mut self, id: MatchNightId) {
        let game_mode = self.schemas.get(&id).map(|s| s.game_mode);
        let Some(match_night) = self.match_nights.get_mut(&id) else {
            return;
        };

        let mut totals: Vec<(UserId, i64)> = Vec::new();
        let mut add = |user_id: UserId, points: i64| match totals.iter_mut().find(|(u, _)| *u == user_id) {
            Some(entry) => entry.1 += points,
            None => totals.push((user_id, points)),
        };
        for game in &match_night.matches {
            let Some(result) = &game.result else { continue };
            let (team1, team2) = result.games().unwrap_or((0, 0));
            match game_mode {
                Some(GameMode::KingOfTheCourt) => {
                    for player in game.players() {
                        add(player, if result.winner_ids.contains(&player) { 1 } else { 0 });
                    }
                }
                _ => {
                    for player in game.team1() {
                        add(player, team1 as i64);
                    }
                    for player in game.team2() {
                        add(player, team2 as i64);
                    }
                }
            }
        }

        let participants = match_night.participants.clone();
        match_night.player_stats = totals
            .into_iter()
            .map(|(user_id, total_points)| PlayerStats {
                id: None,
                match_night_id: Some(id),
                user_id,
                user_name: participants.iter().find(|p| p.id == user_id).map(|p| p.name.clone()),
                total_points,
            })
            .collect();
    }
}

fn error(status: u16, message: &str) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(status).unwrap();
    HttpResponse::build(status).json(json!({ "error": message }))
}

type State = web::Data<Mutex<FakeState>>;

fn lock(state: &State) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap()
}

macro_rules! try_response {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(response) => return response,
        }
    };
}

#[get("/me")]
async fn me(state: State) -> HttpResponse {
    let state = lock(&state);
    let caller = try_response!(state.caller());
    HttpResponse::Ok().json(json!({ "user": state.user(caller) }))
}

fn log_in(state: &State, request: &LoginRequest) -> HttpResponse {
    let mut state = lock(state);
    let user = state
        .users
        .iter()
        .find(|u| u.name.eq_ignore_ascii_case(&request.username))
        .cloned();
    match user {
        Some(user) if request.password.expose_secret() == PASSWORD => {
            state.session_user = Some(user.id);
            HttpResponse::Ok().json(json!({ "message": "Login successful", "user": user }))
        }
        _ => error(401, "Invalid username or password"),
    }
}

#[post("/login")]
async fn login(state: State, body: web::Json<LoginRequest>) -> HttpResponse {
    log_in(&state, &body)
}

#[post("/quick-login")]
async fn quick_login(state: State, body: web::Json<LoginRequest>) -> HttpResponse {
    log_in(&state, &body)
}

#[post("/register")]
async fn register(state: State, body: web::Json<RegisterRequest>) -> HttpResponse {
    let mut state = lock(&state);
    if state.users.iter().any(|u| u.name.eq_ignore_ascii_case(&body.name)) {
        return error(400, "Username already exists");
    }
    let user = User {
        id: state.next_id(),
        name: body.name.clone(),
        email: body.email.clone(),
        created_at: None,
    };
    state.users.push(user.clone());
    state.session_user = Some(user.id);
    HttpResponse::Created().json(json!({ "message": "User registered", "user": user }))
}

#[post("/logout")]
async fn logout(state: State) -> HttpResponse {
    let mut state = lock(&state);
    try_response!(state.enter("logout"));
    state.session_user = None;
    HttpResponse::Ok().json(json!({ "message": "Logged out" }))
}

#[get("/users")]
async fn users(state: State) -> HttpResponse {
    let state = lock(&state);
    try_response!(state.caller());
    HttpResponse::Ok().json(json!({ "users": state.users }))
}

#[post("/recalculate-stats/{id}")]
async fn recalculate_stats(state: State, path: web::Path<MatchNightId>) -> HttpResponse {
    let id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("recalculate_stats"));
    let caller = try_response!(state.caller());
    try_response!(state.visible(id, caller));
    state.recalculate(id);
    HttpResponse::Ok().json(json!({ "message": "Stats recalculated" }))
}

#[get("/")]
async fn list_match_nights(state: State) -> HttpResponse {
    let state = lock(&state);
    let caller = try_response!(state.caller());
    let match_nights: Vec<&MatchNight> = state
        .match_nights
        .values()
        .filter(|mn| mn.is_participant(caller))
        .collect();
    HttpResponse::Ok().json(json!({ "match_nights": match_nights }))
}

#[post("/")]
async fn create_match_night(state: State, body: web::Json<MatchNightInput>) -> HttpResponse {
    let mut state = lock(&state);
    try_response!(state.enter("create_match_night"));
    let caller = try_response!(state.caller());
    let creator = state.user(caller);
    let id = state.next_id();
    let input = body.into_inner();
    let match_night = MatchNight {
        id,
        date: input.date.and_time(input.time.unwrap_or_else(default_start_time)),
        location: input.location,
        num_courts: input.num_courts.unwrap_or(1),
        creator_id: caller,
        creator: creator.clone(),
        participants_count: 1,
        participants: creator.into_iter().collect(),
        ..Default::default()
    };
    state.match_nights.insert(id, match_night.clone());
    HttpResponse::Created().json(json!({ "message": "Match night created", "match_night": match_night }))
}

#[get("/{id}")]
async fn get_match_night(state: State, path: web::Path<MatchNightId>) -> HttpResponse {
    let mut state = lock(&state);
    try_response!(state.enter("get_match_night"));
    let caller = try_response!(state.caller());
    let match_night = try_response!(state.visible(path.into_inner(), caller));
    HttpResponse::Ok().json(match_night)
}

#[put("/{id}")]
async fn update_match_night(
    state: State,
    path: web::Path<MatchNightId>,
    body: web::Json<MatchNightInput>,
) -> HttpResponse {
    let mut state = lock(&state);
    try_response!(state.enter("update_match_night"));
    let caller = try_response!(state.caller());
    let match_night = try_response!(state.owned_mut(path.into_inner(), caller));
    let input = body.into_inner();
    let time = input.time.unwrap_or_else(|| match_night.date.time());
    match_night.date = input.date.and_time(time);
    match_night.location = input.location;
    if let Some(courts) = input.num_courts {
        match_night.num_courts = courts;
    }
    let updated = match_night.clone();
    HttpResponse::Ok().json(json!({ "message": "Match night updated", "match_night": updated }))
}

#[delete("/{id}")]
async fn delete_match_night(state: State, path: web::Path<MatchNightId>) -> HttpResponse {
    let id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("delete_match_night"));
    let caller = try_response!(state.caller());
    try_response!(state.owned_mut(id, caller));
    state.match_nights.remove(&id);
    HttpResponse::Ok().json(json!({ "message": "Match night deleted" }))
}

#[delete("/{id}/delete")]
async fn delete_for_all(state: State, path: web::Path<MatchNightId>) -> HttpResponse {
    let id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("delete_for_all"));
    let caller = try_response!(state.caller());
    try_response!(state.owned_mut(id, caller));
    state.match_nights.remove(&id);
    state.schemas.remove(&id);
    HttpResponse::Ok().json(json!({ "message": "Match night deleted for everyone" }))
}

#[post("/{id}/leave")]
async fn leave(state: State, path: web::Path<MatchNightId>, body: web::Json<LeaveRequest>) -> HttpResponse {
    let id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("leave"));
    let caller = try_response!(state.caller());
    let new_creator = body.new_creator_id.and_then(|u| state.user(u));
    let match_night = try_response!(state
        .match_nights
        .get_mut(&id)
        .ok_or_else(|| error(404, "Match night not found")));
    if !match_night.is_participant(caller) {
        return error(400, "You are not a participant");
    }
    if match_night.is_creator(caller) {
        match new_creator {
            Some(user) if user.id != caller && match_night.is_participant(user.id) => {
                match_night.creator_id = user.id;
                match_night.creator = Some(user);
            }
            _ => return error(400, "A new creator must be chosen"),
        }
    }
    match_night.participants.retain(|p| p.id != caller);
    match_night.participants_count = match_night.participants.len();
    HttpResponse::Ok().json(json!({ "message": "Left match night" }))
}

#[post("/{id}/add-participant")]
async fn add_participant(
    state: State,
    path: web::Path<MatchNightId>,
    body: web::Json<ParticipantRequest>,
) -> HttpResponse {
    let mut state = lock(&state);
    try_response!(state.enter("add_participant"));
    let caller = try_response!(state.caller());
    let user = try_response!(state.user(body.user_id).ok_or_else(|| error(404, "User not found")));
    let match_night = try_response!(state.owned_mut(path.into_inner(), caller));
    if match_night.game_status != GameStatus::NotStarted {
        return error(400, "Participants cannot change once the game started");
    }
    if match_night.is_participant(user.id) {
        return error(400, "User is already a participant");
    }
    match_night.participants.push(user);
    match_night.participants_count = match_night.participants.len();
    HttpResponse::Ok().json(json!({ "message": "Participant added" }))
}

#[post("/{id}/remove-participant")]
async fn remove_participant(
    state: State,
    path: web::Path<MatchNightId>,
    body: web::Json<ParticipantRequest>,
) -> HttpResponse {
    let mut state = lock(&state);
    try_response!(state.enter("remove_participant"));
    let caller = try_response!(state.caller());
    let match_night = try_response!(state.owned_mut(path.into_inner(), caller));
    if match_night.game_status != GameStatus::NotStarted {
        return error(400, "Participants cannot change once the game started");
    }
    if body.user_id == match_night.creator_id {
        return error(400, "The creator cannot be removed");
    }
    match_night.participants.retain(|p| p.id != body.user_id);
    match_night.participants_count = match_night.participants.len();
    HttpResponse::Ok().json(json!({ "message": "Participant removed" }))
}

fn new_match(id: MatchId, match_night_id: MatchNightId, players: [UserId; 4], round: u32, court: u32) -> Match {
    Match {
        id,
        match_night_id: Some(match_night_id),
        player1_id: players[0],
        player1_name: None,
        player2_id: players[1],
        player2_name: None,
        player3_id: players[2],
        player3_name: None,
        player4_id: players[3],
        player4_name: None,
        round,
        court,
        is_naai_partij: Some(false),
        result: None,
    }
}

#[post("/{id}/start")]
async fn start_game(
    state: State,
    path: web::Path<MatchNightId>,
    body: web::Json<StartGameRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("start_game"));
    let caller = try_response!(state.caller());
    let (players, num_courts) = {
        let match_night = try_response!(state.owned_mut(id, caller));
        if match_night.participants.len() < 4 {
            return error(400, "At least 4 participants are required");
        }
        if match_night.is_completed() {
            return error(400, "Game already completed");
        }
        let players: Vec<UserId> = match_night.participants.iter().map(|p| p.id).collect();
        (players, match_night.num_courts as usize)
    };

    let rounds = match body.game_mode {
        GameMode::EveryoneVsEveryone => 3,
        GameMode::KingOfTheCourt => 1,
    };
    let mut matches = Vec::new();
    for round in 0..rounds {
        let mut rotated = players.clone();
        rotated.rotate_left(round % players.len());
        for (court, group) in rotated.chunks_exact(4).take(num_courts).enumerate() {
            let match_id = state.next_id();
            matches.push(new_match(
                match_id,
                id,
                [group[0], group[1], group[2], group[3]],
                round as u32 + 1,
                court as u32 + 1,
            ));
        }
    }

    let schema = GameSchema {
        id: state.next_id(),
        match_night_id: id,
        game_mode: body.game_mode,
        status: SchemaStatus::Active,
        created_at: None,
        matches: None,
    };
    state.schemas.insert(id, schema.clone());
    if let Some(match_night) = state.match_nights.get_mut(&id) {
        match_night.matches = matches;
        match_night.player_stats.clear();
        match_night.game_status = GameStatus::Active;
    }
    HttpResponse::Created().json(json!({ "message": "Game started", "game_schema": schema }))
}

#[get("/{id}/status")]
async fn game_status(state: State, path: web::Path<MatchNightId>) -> HttpResponse {
    let id = path.into_inner();
    let state = lock(&state);
    let caller = try_response!(state.caller());
    let match_night = try_response!(state.visible(id, caller));
    let active = match_night.is_active();
    let schema = if active { state.schemas.get(&id) } else { None };
    HttpResponse::Ok().json(json!({ "game_active": active, "game_schema": schema }))
}

#[post("/{id}/complete")]
async fn complete_game(state: State, path: web::Path<MatchNightId>) -> HttpResponse {
    let id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("complete_game"));
    let caller = try_response!(state.caller());
    let match_night = try_response!(state.owned_mut(id, caller));
    if !match_night.is_active() {
        return error(400, "No active game");
    }
    match_night.game_status = GameStatus::Completed;
    if let Some(schema) = state.schemas.get_mut(&id) {
        schema.status = SchemaStatus::Completed;
    }
    HttpResponse::Ok().json(json!({ "message": "Game completed" }))
}

#[post("/{id}/result")]
async fn submit_result(
    state: State,
    path: web::Path<MatchId>,
    body: web::Json<SubmitResultRequest>,
) -> HttpResponse {
    let match_id = path.into_inner();
    let mut state = lock(&state);
    try_response!(state.enter("submit_result"));
    let caller = try_response!(state.caller());
    let result_id = state.next_id();
    let next_id = state.next_id();

    let Some(match_night_id) = state
        .match_nights
        .values()
        .find(|mn| mn.find_match(match_id).is_some())
        .map(|mn| mn.id)
    else {
        return error(404, "Match not found");
    };
    let king_of_the_court = state
        .schemas
        .get(&match_night_id)
        .map(|s| s.game_mode == GameMode::KingOfTheCourt)
        .unwrap_or(false);

    let match_night = try_response!(state.owned_mut(match_night_id, caller));
    if match_night.is_completed() {
        return error(400, "Game is completed");
    }
    let Some(game) = match_night.matches.iter_mut().find(|m| m.id == match_id) else {
        return error(404, "Match not found");
    };
    let existing_id = game.result.as_ref().and_then(|r| r.id);
    game.result = Some(MatchResult {
        id: existing_id.or(Some(result_id)),
        match_id,
        score: Some(body.score.clone()),
        winner_ids: body.winner_ids.clone(),
        created_at: None,
    });

    let next_match = if king_of_the_court && existing_id.is_none() && body.winner_ids.len() == 2 {
        let losers: Vec<UserId> = game
            .players()
            .into_iter()
            .filter(|p| !body.winner_ids.contains(p))
            .collect();
        let next = new_match(
            next_id,
            match_night_id,
            [body.winner_ids[0], losers[0], body.winner_ids[1], losers[1]],
            game.round + 1,
            game.court,
        );
        match_night.matches.push(next.clone());
        Some(next)
    } else {
        None
    };

    HttpResponse::Ok().json(json!({ "message": "Result saved", "next_match": next_match }))
}

pub struct TestApp {
    pub address: String,
    pub state: State,
}

impl TestApp {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Make the next call of `operation` fail with a 500
    pub fn fail_next(&self, operation: &'static str) {
        self.state().fail_next = Some(operation);
    }

    pub fn expire_session(&self) {
        self.state().session_user = None;
    }

    pub fn stored(&self, id: MatchNightId) -> Option<MatchNight> {
        self.state().match_nights.get(&id).cloned()
    }

    /// Insert a match night directly, bypassing the API
    pub fn seed_match_night(&self, creator: UserId, participants: &[UserId]) -> MatchNightId {
        let mut state = self.state();
        let id = state.next_id();
        let mut roster: Vec<User> = Vec::new();
        for user_id in std::iter::once(&creator).chain(participants.iter()) {
            if roster.iter().any(|u| u.id == *user_id) {
                continue;
            }
            if let Some(user) = state.user(*user_id) {
                roster.push(user);
            }
        }
        let match_night = MatchNight {
            id,
            date: NaiveDate::from_ymd_opt(2026, 3, 5)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            location: "Padel Centrum".to_string(),
            num_courts: 1,
            creator_id: creator,
            creator: state.user(creator),
            participants_count: roster.len(),
            participants: roster,
            ..Default::default()
        };
        state.match_nights.insert(id, match_night);
        id
    }

    pub fn http_client(&self) -> Arc<HttpApiClient> {
        Arc::new(HttpApiClient::new(&ApiSettings::new(self.address.clone(), 5)).unwrap())
    }

    /// A client logged in as `name`, with its auth context
    pub async fn login(&self, name: &str) -> Session {
        let client = self.http_client();
        let api: Arc<dyn MatchNightApi> = client.clone();
        let auth = AuthContext::new(Arc::clone(&api));
        let user = auth
            .login(name, SecretString::new(PASSWORD.into()))
            .await
            .expect("Failed to log in");
        Session {
            client,
            api,
            auth,
            user,
            gate: ActionGate::new(),
        }
    }
}

pub struct Session {
    pub client: Arc<HttpApiClient>,
    pub api: Arc<dyn MatchNightApi>,
    pub auth: AuthContext,
    pub user: User,
    pub gate: ActionGate,
}

impl Session {
    pub fn workspace(&self, id: MatchNightId) -> MatchNightWorkspace {
        MatchNightWorkspace::new(Arc::clone(&self.api), self.gate.clone(), id)
    }

    /// Log in as someone else on the same client
    pub async fn switch_to(&mut self, name: &str) {
        self.user = self
            .auth
            .login(name, SecretString::new(PASSWORD.into()))
            .await
            .expect("Failed to switch user");
    }
}

pub async fn spawn_app() -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let state: State = web::Data::new(Mutex::new(FakeState::new()));
    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_state.clone())
            .service(
                web::scope("/api/auth")
                    .service(me)
                    .service(login)
                    .service(quick_login)
                    .service(register)
                    .service(logout)
                    .service(users)
                    .service(recalculate_stats),
            )
            .service(
                web::scope("/api/match-nights")
                    .service(list_match_nights)
                    .service(create_match_night)
                    .service(delete_for_all)
                    .service(leave)
                    .service(add_participant)
                    .service(remove_participant)
                    .service(get_match_night)
                    .service(update_match_night)
                    .service(delete_match_night),
            )
            .service(
                web::scope("/api/game-schemas")
                    .service(start_game)
                    .service(game_status)
                    .service(complete_game),
            )
            .service(web::scope("/api/matches").service(submit_result))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to bind address")
    .run();
    // Launch the server as a background task
    let _ = tokio::spawn(server);

    TestApp { address, state }
}
