//! Planit - planning poker in the terminal
//!
//! Runs one client against an in-process document store. Rooms live as
//! long as the process; the display name, identity and current room code
//! persist across runs.

use std::sync::{Arc, Mutex};

use planit_app::commands::{series_listing, Command, HELP};
use planit_app::link::room_code_from_input;
use planit_app::{AnonymousAuth, IdentityProvider, RoomSession, SessionPhase, SessionState};
use planit_core::{AppConfig, Database, Result, RoomUser, VotingProgress};
use planit_store::{DocumentStore, MemoryDocumentStore, RoomStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match AppConfig::default_path().and_then(|path| AppConfig::load_or_default(&path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring config: {}", e);
            AppConfig::default()
        }
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)))
        .init();

    tracing::info!("Starting Planit");

    if let Err(e) = run(config).await {
        tracing::error!("Planit stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let db = Arc::new(Mutex::new(Database::open(config.database_path()?)?));
    let auth = Arc::new(AnonymousAuth::new(db.clone()));
    if let Some(identity) = auth.restore()? {
        println!("Welcome back, {}", identity.display_name);
    }

    let docs: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let rooms = RoomStore::new(docs).with_code_attempts(config.session.room_code_attempts);
    let session = Arc::new(RoomSession::new(
        rooms,
        auth.clone(),
        db,
        config.session.clone(),
    ));

    tokio::spawn(render(session.clone()));

    if let Err(e) = session.restore().await {
        println!("Could not resume room: {}", e);
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(command, &session, &auth, &config).await {
            println!("{}", e);
        }
    }

    Ok(())
}

async fn execute(
    command: Command,
    session: &RoomSession,
    auth: &AnonymousAuth,
    config: &AppConfig,
) -> Result<()> {
    match command {
        Command::SignIn(name) => {
            let identity = auth.sign_in_anonymously(&name)?;
            println!("Signed in as {}", identity.display_name);
        }
        Command::SignOut => {
            session.leave_room()?;
            auth.sign_out()?;
            println!("Signed out");
        }
        Command::Create(series_type) => {
            let code = session.create_room(series_type).await?;
            println!("Created room {}", code);
            if let Some(link) = session.share_link(&config.share.base_url) {
                println!("Share: {}", link);
            }
        }
        Command::Join(input) => {
            let code = room_code_from_input(&input)?;
            session.join_room(code.as_str()).await?;
            println!("Joined room {}", code);
        }
        Command::Vote(vote) => {
            session.submit_vote(vote.clone()).await?;
            println!("Voted {}", vote);
        }
        Command::Reveal => session.reveal_votes().await?,
        Command::Reset => session.reset_votes().await?,
        Command::ListSeries => println!("{}", series_listing()),
        Command::Series(series_type) => session.select_series(series_type).await?,
        Command::Custom(values) => {
            session
                .update_series(values, planit_core::SeriesType::Custom)
                .await?
        }
        Command::Stats => match session.get_statistics() {
            Some(stats) => {
                let number = |n: Option<f64>| n.map_or("-".to_string(), |n| format!("{:.1}", n));
                println!("Average: {}", number(stats.average));
                println!("Median:  {}", number(stats.median));
                println!(
                    "Mode:    {}",
                    stats.mode.as_ref().map_or("-".to_string(), ToString::to_string)
                );
                if stats.is_consensus() {
                    println!("Consensus!");
                }
                for vote in &stats.votes {
                    let marker = if stats.is_outlier(&vote.user_id) { " (outlier)" } else { "" };
                    println!("  {}: {}{}", vote.name, vote.vote, marker);
                }
            }
            None => println!("No statistics until votes are revealed"),
        },
        Command::Users => {
            let state = session.snapshot();
            let viewer = auth.current().map(|i| i.uid).unwrap_or_default();
            let revealed = state.room.as_ref().is_some_and(|r| r.is_revealed);
            for user in &state.users {
                println!("  {}", describe(user, revealed, &viewer));
            }
        }
        Command::Link => match session.share_link(&config.share.base_url) {
            Some(link) => println!("{}", link),
            None => println!("Not in a room"),
        },
        Command::Leave => {
            session.leave_room()?;
            println!("Left room");
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn describe(user: &RoomUser, revealed: bool, viewer: &str) -> String {
    let vote = match (user.visible_vote(revealed, viewer), user.has_voted) {
        (Some(vote), _) => vote.to_string(),
        (None, true) => "voted".to_string(),
        (None, false) => "...".to_string(),
    };
    let badge = if user.is_admin { " [admin]" } else { "" };
    format!("{}{}: {}", user.name, badge, vote)
}

/// Print a status line whenever the room changes shape
async fn render(session: Arc<RoomSession>) {
    let mut rx = session.subscribe();
    let mut last = String::new();
    while rx.changed().await.is_ok() {
        let line = status_line(&rx.borrow_and_update());
        if let Some(line) = line {
            if line != last {
                println!("{}", line);
                last = line;
            }
        }
    }
}

fn status_line(state: &SessionState) -> Option<String> {
    match state.phase {
        SessionPhase::Bound => {
            let room = state.room.as_ref()?;
            let progress = VotingProgress::of(&state.users);
            Some(format!(
                "[{}] {} | {}/{} voted ({}%){}",
                room.room_id,
                planit_core::series::name_for(room.series_type),
                progress.voted,
                progress.total,
                progress.percent(),
                if room.is_revealed { " | revealed" } else { "" }
            ))
        }
        SessionPhase::NotFound => state.error.clone(),
        SessionPhase::Unbound | SessionPhase::Pending => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planit_core::{Room, RoomCode, VoteValue};

    fn voter(id: &str, vote: Option<f64>) -> RoomUser {
        RoomUser {
            user_id: id.into(),
            name: id.into(),
            has_voted: vote.is_some(),
            vote: vote.map(VoteValue::Numeric),
            is_admin: false,
        }
    }

    #[test]
    fn test_status_line_shows_progress() {
        let code = RoomCode::parse("ab12cd").unwrap();
        let mut state = SessionState {
            phase: SessionPhase::Bound,
            room: Some(Room::placeholder(code)),
            users: vec![voter("a", Some(3.0)), voter("b", None), voter("c", Some(5.0))],
            ..SessionState::default()
        };
        assert_eq!(
            status_line(&state).unwrap(),
            "[AB12CD] Fibonacci | 2/3 voted (66%)"
        );

        state.users.clear();
        assert_eq!(status_line(&state).unwrap(), "[AB12CD] Fibonacci | 0/0 voted (0%)");

        state.phase = SessionPhase::Pending;
        assert_eq!(status_line(&state), None);
    }
}
