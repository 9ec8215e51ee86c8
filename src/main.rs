//! Pocket Duel Terminal Client
//!
//! Connects one session, asks for a match and mirrors the server's state
//! as plain text. Type a selection number to answer a prompt, `m` to queue
//! for another match, `q` to leave.

use anyhow::Context;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pocket_duel::{
    game::state::{Creature, PlayerView},
    network::{ConnectionEvent, SessionState},
    ClientConfig, IdentityStore, MatchState, Session, SessionEvent, VERSION,
};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "pocket_duel=debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "pocket_duel=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Pocket Duel client v{}", VERSION);

    let config = ClientConfig::from_env();
    let store = IdentityStore::from_config(&config);
    let identity = store
        .load_or_create(Utc::now())
        .with_context(|| format!("failed to load identity from {}", store.path().display()))?;
    info!("Playing as {}", identity);

    let (mut session, mut events) = Session::connect(&config, &identity).await?;
    let mut notices = session.subscribe();
    session.request_match()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = event.unwrap_or_else(|| ConnectionEvent::Closed("event stream ended".to_string()));
                let state = session.handle(event);
                render(&session, &mut notices);
                if state == SessionState::Closed {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line.context("failed to read stdin")? {
                Some(line) => on_input(&mut session, line.trim()),
                None => {
                    stdin_open = false;
                    session.close();
                }
            }
        }
    }

    Ok(())
}

/// Apply one line of player input.
fn on_input(session: &mut Session, input: &str) {
    match input {
        "" => {}
        "q" | "quit" => session.close(),
        "m" => {
            if let Err(e) = session.request_match() {
                println!("! {}", e);
            }
        }
        other => match other.parse::<u32>() {
            Ok(index) => {
                if let Err(e) = session.respond(index) {
                    println!("! {}", e);
                }
            }
            Err(_) => println!("? enter a selection number, m or q"),
        },
    }
}

/// Print every notification queued since the last call.
fn render(session: &Session, notices: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match notices.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Display skipped {} notifications", skipped);
                continue;
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return,
        };

        match event {
            SessionEvent::Connected => println!("* connected"),
            SessionEvent::Waiting(message) => println!("* {}", message),
            SessionEvent::MatchStarted { game_id } => {
                println!("* match started ({})", game_id.as_deref().unwrap_or("unnamed"));
            }
            SessionEvent::StateChanged { .. } => {
                if let Some(state) = session.state() {
                    print_state(&state, session.identity().as_str());
                }
            }
            SessionEvent::ActionPrompt(selections) => {
                println!("> choose:");
                for (index, description) in &selections {
                    println!("  [{}] {}", index, description);
                }
            }
            SessionEvent::ServerError(message) => println!("! server: {}", message),
            SessionEvent::TransportNotice(detail) => println!("! connection: {}", detail),
            SessionEvent::FrameDiscarded(_) => {}
            SessionEvent::Closed(reason) => println!("* session ended: {}", reason),
        }
    }
}

fn print_state(state: &MatchState, me: &str) {
    let whose = if state.is_turn_of(me) { "your" } else { "opponent's" };
    println!("=== turn {} ({} turn) ===", state.turn_number, whose);
    print_side("opponent", &state.opponent_view);
    print_side("you", &state.self_view);
}

fn print_side(label: &str, view: &PlayerView) {
    println!(
        "-- {} -- hand {} | deck {}",
        view.name.as_deref().unwrap_or(label),
        view.hand_size,
        view.deck_size
    );
    match &view.active_creature {
        Some(creature) => println!("   active: {}", describe(creature)),
        None => println!("   active: -"),
    }
    for (slot, creature) in view.bench.iter().enumerate() {
        println!("   bench {}: {}", slot + 1, describe(creature));
    }
}

fn describe(creature: &Creature) -> String {
    let energies: Vec<&str> = creature.attached_energies.iter().map(|e| e.as_str()).collect();
    format!(
        "{} {}/{} [{}]",
        creature.name,
        creature.current_health,
        creature.max_health,
        energies.join(" ")
    )
}
