use std::env;
use std::process::exit;

use client::{ConnectionEvent, MeetingConfig, MeetingSession};
use system::{CardState, Participation, Role};

/// Read-only observer for one meeting: connects by short code and prints a
/// summary line per snapshot until the channel goes down.
#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (short_code, pid) = match (args.next(), args.next()) {
        (Some(short_code), Some(pid)) => (short_code, pid),
        _ => {
            eprintln!("usage: meeting-watch <short_code> <participant_id> [name] [base_url]");
            exit(2);
        }
    };
    let name = args.next().unwrap_or_else(|| "watcher".into());
    let base_url = args.next().unwrap_or_else(|| "ws://127.0.0.1:8000".into());

    let participation = Participation {
        id: pid,
        name,
        role: Role::Member,
    };
    let config = MeetingConfig::new(base_url, short_code, participation);
    let (mut session, mut events) = MeetingSession::connect(config);

    while let Some(event) = events.recv().await {
        match &event {
            ConnectionEvent::Open => println!("connected"),
            ConnectionEvent::Closed { reason } => println!("disconnected: {:?}", reason),
            ConnectionEvent::Snapshot(_) => {}
        }
        session.handle_event(event);
        if session.is_disconnected() {
            break;
        }
        if let Some(snapshot) = session.snapshot() {
            let queue = session
                .speaker_queue()
                .iter()
                .map(|participant| participant.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{} participants | warm {} | cool {} | move on {} | queue [{}]",
                snapshot.participants.len(),
                session.state_count(CardState::Warm),
                session.state_count(CardState::Cool),
                session.state_count(CardState::MoveOn),
                queue,
            );
        }
    }

    session.shutdown().await;
}
