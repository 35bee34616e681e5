use std::sync::Arc;

use padelmate::config::settings::get_config;
use padelmate::error::{MatchNightError, MatchNightResult};
use padelmate::match_night::{ActionGate, MatchNightPlanner, MatchNightWorkspace};
use padelmate::models::common::{MatchId, MatchNightId, UserId};
use chrono::{NaiveDate, NaiveTime};

use padelmate::models::game::GameMode;
use padelmate::models::match_night::{MatchNight, MatchNightInput};
use padelmate::models::user::User;
use padelmate::services::{AuthContext, HttpApiClient, MatchNightApi};
use padelmate::telemetry::{get_subscriber, init_subscriber};

const USAGE: &str = "usage: padelmate <command>

commands:
  list
  show <id>
  edit <id> [--date YYYY-MM-DD] [--time HH:MM] [--location TEXT] [--courts N]
  start <id> <game_mode> [--confirm-restart]
  complete <id>
  result <night_id> <match_id> <team1_games> <team2_games>
  add <id> <user_id>
  remove <id> <user_id>
  leave <id> [new_creator_id]
  delete-all <id>";

#[tokio::main]
async fn main() {
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read the config: {}", e);
            std::process::exit(1);
        }
    };

    let subscriber = get_subscriber(
        config.application.name.clone(),
        config.application.log_level.clone(),
        std::io::stderr,
    );
    init_subscriber(subscriber);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", usage());
        std::process::exit(1);
    }

    let client = match HttpApiClient::new(&config.api) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("❌ Failed to create the HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let api: Arc<dyn MatchNightApi> = client.clone();

    let auth = AuthContext::new(Arc::clone(&api));
    if auth.init().await.is_none() {
        if let Some((username, password)) = config.api.credentials() {
            if let Err(e) = auth.login(&username, password).await {
                eprintln!("Login failed: {}", e.user_message());
                std::process::exit(1);
            }
        }
    }

    let caller = match auth.require_user() {
        Ok(user) => user,
        Err(e) => {
            eprintln!(
                "{}. Set api.username and api.password or PADELMATE_USERNAME / PADELMATE_PASSWORD.",
                e
            );
            std::process::exit(1);
        }
    };
    tracing::info!("✅ Logged in as {}", caller.name);

    if let Err(e) = run(api, &caller, &args).await {
        if client.is_login_required() {
            eprintln!("Your session is no longer valid, log in again.");
        }
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(api: Arc<dyn MatchNightApi>, caller: &User, args: &[String]) -> MatchNightResult<()> {
    let gate = ActionGate::new();
    let command = args[0].as_str();
    let rest = &args[1..];

    if command == "list" {
        let planner = MatchNightPlanner::new(api, gate);
        for match_night in planner.list().await? {
            println!(
                "{:>4}  {}  {:<30} {:<12} {} players",
                match_night.id,
                match_night.date.format("%Y-%m-%d %H:%M"),
                match_night.location,
                match_night.game_status,
                match_night.participant_count()
            );
        }
        return Ok(());
    }

    let id: MatchNightId = parse_arg(rest, 0, "match night id")?;
    let workspace_gate = gate.clone();
    let workspace = MatchNightWorkspace::new(Arc::clone(&api), gate, id);
    workspace.load().await?;

    match command {
        "show" => show(&workspace),
        "edit" => {
            let snapshot = workspace.store.require()?;
            let input = edit_input(&snapshot, &rest[1..])?;
            let planner = MatchNightPlanner::new(Arc::clone(&api), workspace_gate);
            let updated = planner.update(&workspace.store, caller, &input).await?;
            println!(
                "Match night {} now {} at {} ({} courts)",
                updated.id,
                updated.date.format("%Y-%m-%d %H:%M"),
                updated.location,
                updated.num_courts
            );
            Ok(())
        }
        "start" => {
            let game_mode: GameMode = rest
                .get(1)
                .ok_or_else(|| missing("game mode"))?
                .parse()
                .map_err(MatchNightError::Validation)?;
            let confirmed = rest.iter().any(|a| a == "--confirm-restart");

            match workspace.session.start(caller, game_mode).await {
                Err(MatchNightError::RestartNotConfirmed) if confirmed => {
                    let pending = workspace.session.prepare_restart(caller, game_mode).await?;
                    println!("{}", pending.warning());
                    pending.confirm().await?;
                }
                Err(MatchNightError::RestartNotConfirmed) => {
                    let pending = workspace.session.prepare_restart(caller, game_mode).await?;
                    println!("{}", pending.warning());
                    println!("Run again with --confirm-restart to continue.");
                    return Ok(());
                }
                other => {
                    other?;
                }
            }
            println!("{} game started", game_mode.display_name());
            Ok(())
        }
        "complete" => {
            workspace.session.complete(caller).await?;
            println!("Game completed");
            Ok(())
        }
        "result" => {
            let match_id: MatchId = parse_arg(rest, 1, "match id")?;
            let team1_games: u32 = parse_arg(rest, 2, "team 1 games")?;
            let team2_games: u32 = parse_arg(rest, 3, "team 2 games")?;
            let next_match = workspace
                .results
                .submit(caller, match_id, team1_games, team2_games)
                .await?;
            println!("Result {}-{} saved", team1_games, team2_games);
            if let Some(next) = next_match {
                println!("Next match: {} on court {}", next.id, next.court);
            }
            Ok(())
        }
        "add" => {
            let user_id: UserId = parse_arg(rest, 1, "user id")?;
            workspace.roster.add_participant(caller, user_id).await?;
            println!("User {} added", user_id);
            Ok(())
        }
        "remove" => {
            let user_id: UserId = parse_arg(rest, 1, "user id")?;
            workspace.roster.remove_participant(caller, user_id).await?;
            println!("User {} removed", user_id);
            Ok(())
        }
        "leave" => {
            let new_creator_id = match rest.get(1) {
                Some(_) => Some(parse_arg::<UserId>(rest, 1, "new creator id")?),
                None => None,
            };
            workspace.roster.leave(caller, new_creator_id).await?;
            println!("You left match night {}", id);
            Ok(())
        }
        "delete-all" => {
            workspace.roster.delete_for_all(caller).await?;
            println!("Match night {} deleted", id);
            Ok(())
        }
        other => Err(MatchNightError::Validation(format!(
            "unknown command `{}`\n\n{}",
            other,
            usage()
        ))),
    }
}

fn show(workspace: &MatchNightWorkspace) -> MatchNightResult<()> {
    let match_night = workspace.store.require()?;
    println!(
        "{} at {} ({} courts), game {}",
        match_night.date.format("%Y-%m-%d %H:%M"),
        match_night.location,
        match_night.num_courts,
        match_night.game_status
    );

    println!("\nParticipants:");
    for participant in &match_night.participants {
        let marker = if match_night.is_creator(participant.id) { " (creator)" } else { "" };
        println!("  {:>4}  {}{}", participant.id, participant.name, marker);
    }

    if !match_night.matches.is_empty() {
        println!("\nMatches:");
        for game in &match_night.matches {
            let score = match &game.result {
                Some(result) if result.is_draw() => {
                    format!("{} (draw)", result.score.as_deref().unwrap_or("-"))
                }
                Some(result) => result.score.clone().unwrap_or_else(|| "-".to_string()),
                None => "-".to_string(),
            };
            let marker = if game.is_consolation() { "  [naai-partij]" } else { "" };
            let [p1, p2, p3, p4] = match_night.lineup(game);
            println!(
                "  {:>4}  round {} court {}  {} & {} vs {} & {}  {}{}",
                game.id,
                game.round,
                game.court,
                p1,
                p2,
                p3,
                p4,
                score,
                marker
            );
        }
    }

    let standings = workspace.standings()?;
    if standings.is_empty() {
        return Ok(());
    }
    println!("\nStandings:");
    for row in standings {
        println!("  {:>2}. {:<24} {} {}", row.rank, row.name, row.total_points, row.unit);
    }
    Ok(())
}

/// Start from the current values and apply the given `--flag value` pairs
fn edit_input(match_night: &MatchNight, flags: &[String]) -> MatchNightResult<MatchNightInput> {
    let mut input = MatchNightInput::from_match_night(match_night);
    let mut flags = flags.iter();
    while let Some(flag) = flags.next() {
        let value = flags
            .next()
            .ok_or_else(|| missing(&format!("value for {}", flag)))?;
        match flag.as_str() {
            "--date" => {
                input.date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| MatchNightError::Validation(format!("invalid date: {}", value)))?;
            }
            "--time" => {
                let time = NaiveTime::parse_from_str(value, "%H:%M")
                    .map_err(|_| MatchNightError::Validation(format!("invalid time: {}", value)))?;
                input.time = Some(time);
            }
            "--location" => input.location = value.clone(),
            "--courts" => {
                let courts = value
                    .parse()
                    .map_err(|_| MatchNightError::Validation(format!("invalid courts: {}", value)))?;
                input.num_courts = Some(courts);
            }
            other => {
                return Err(MatchNightError::Validation(format!(
                    "unknown option `{}`\n\n{}",
                    other,
                    usage()
                )))
            }
        }
    }
    Ok(input)
}

fn usage() -> String {
    let modes: Vec<_> = GameMode::ALL
        .iter()
        .map(|mode| format!("  {:<22} {}", mode.as_str(), mode.display_name()))
        .collect();
    format!("{}\n\ngame modes:\n{}", USAGE, modes.join("\n"))
}

fn missing(what: &str) -> MatchNightError {
    MatchNightError::Validation(format!("missing {}\n\n{}", what, usage()))
}

fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, what: &str) -> MatchNightResult<T> {
    let raw = args.get(index).ok_or_else(|| missing(what))?;
    raw.parse()
        .map_err(|_| MatchNightError::Validation(format!("invalid {}: {}", what, raw)))
}
