use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispute_console::config::ConsoleConfig;
use dispute_console::models::dispute::Party;
use dispute_console::services::backend_api::HttpBackendApi;
use dispute_console::services::dispute_session::DisputeSession;
use dispute_console::services::notifications::{Level, Notifier, RecordingNotifier};
use dispute_console::services::realtime::{RealtimeChannel, RealtimeConfig};
use dispute_console::view;

const HELP: &str = "Type a message and press enter to send it.\n\
/resolve buyer|seller  award the escrow\n\
/show                  print the dispute and full transcript\n\
/quit                  close the session";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dispute_console=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: dispute-console <dispute_id>");
        eprintln!("Requires ADMIN_AUTH_TOKEN; ADMIN_API_BASE_URL and ADMIN_REALTIME_URL are optional.");
        std::process::exit(1);
    }
    let dispute_id = &args[1];

    let config = ConsoleConfig::from_env()?;
    let api = Arc::new(HttpBackendApi::new(&config)?);
    let realtime = RealtimeChannel::new(RealtimeConfig::from_console(&config));
    let notifier = Arc::new(RecordingNotifier::new());

    tracing::info!("Opening dispute {} against {}", dispute_id, config.api_base_url);

    let session = DisputeSession::open(api, Some(&realtime), notifier.clone(), dispute_id).await;
    flush_notifications(&notifier);
    let mut session = session?;

    print_lines(&view::render_dispute(session.dispute(), session.resolution().can_resolve()));
    let mut printed = print_new_messages(&session, 0);
    println!("{}", HELP);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(Duration::from_millis(250));
    let mut pending_award: Option<Party> = None;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                printed = print_new_messages(&session, printed);
                flush_notifications(&notifier);
            }

            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();

                if let Some(party) = pending_award.take() {
                    if line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("yes") {
                        match session.resolve(party).await {
                            Ok(_) => {
                                print_lines(&view::render_dispute(session.dispute(), session.resolution().can_resolve()));
                            }
                            Err(_) if session.resolution().is_confirming() => {
                                flush_notifications(&notifier);
                                println!("{}", confirm_prompt(party));
                                pending_award = Some(party);
                            }
                            Err(_) => {}
                        }
                    } else {
                        session.resolution().cancel_confirmation();
                        notifier.info("Resolution cancelled");
                    }
                } else if line == "/quit" {
                    break;
                } else if line == "/show" {
                    print_lines(&view::render_dispute(session.dispute(), session.resolution().can_resolve()));
                    print_lines(&view::render_transcript(&session.messages()));
                } else if let Some(party) = line.strip_prefix("/resolve") {
                    let party = match party.trim().to_ascii_lowercase().as_str() {
                        "buyer" => Party::Buyer,
                        "seller" => Party::Seller,
                        _ => {
                            println!("Usage: /resolve buyer|seller");
                            continue;
                        }
                    };
                    match session.resolution().open_confirmation() {
                        Ok(()) => {
                            println!("{}", confirm_prompt(party));
                            pending_award = Some(party);
                        }
                        Err(e) => notifier.error(&e.user_message()),
                    }
                } else if !line.is_empty() {
                    session.composer().set_draft(line);
                    // Failures are already surfaced as notifications
                    let _ = session.send_draft().await;
                }

                flush_notifications(&notifier);
            }
        }
    }

    session.close().await;
    Ok(())
}

fn confirm_prompt(party: Party) -> String {
    format!("Release escrow to the {}? This cannot be undone. [y/N]", party.label())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_new_messages(session: &DisputeSession, printed: usize) -> usize {
    let messages = session.messages();
    if messages.len() > printed {
        print_lines(&view::render_transcript(&messages[printed..]));
    }
    messages.len()
}

fn flush_notifications(notifier: &RecordingNotifier) {
    for notification in notifier.drain() {
        let marker = match notification.level {
            Level::Success => "✓",
            Level::Info => "i",
            Level::Error => "✗",
        };
        println!("{} {}", marker, notification.message);
    }
}
