use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use inquire::Text;
use tokio::sync::Mutex;

use crate::config::SchedulerConfig;
use crate::handlers::engine::{EngineReply, SchedulerEngine, SessionEvent, SessionStore};
use crate::models::intent::{EventSelector, Intent};
use crate::models::interval::TimeInterval;
use crate::service::calendar_client::InMemoryCalendarClient;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const CLI_SESSION: &str = "cli";

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Book a new event (times are local wall clock, "YYYY-MM-DD HH:MM")
    Schedule {
        title: String,
        start: String,
        end: String,
    },
    /// Move or rename an existing event found by title near a time
    Reschedule {
        title: String,
        around_start: String,
        around_end: String,
        #[arg(long)]
        new_start: Option<String>,
        #[arg(long)]
        new_end: Option<String>,
        #[arg(long)]
        new_title: Option<String>,
    },
    /// Cancel an existing event found by title near a time
    Remove {
        title: String,
        around_start: String,
        around_end: String,
    },
    /// Show events in a window
    Agenda { from: String, to: String },
    /// Find free slots of the given length in a window
    Free {
        duration_minutes: i64,
        from: String,
        to: String,
    },
}

pub async fn cli(config: SchedulerConfig) {
    let cli = Cli::parse();

    let client = match config.calendar_file.clone() {
        Some(path) => InMemoryCalendarClient::load(path),
        None => Ok(InMemoryCalendarClient::new(Vec::new())),
    };
    let client = match client {
        Ok(client) => Arc::new(client),
        Err(err) => {
            println!("Failed to load calendar: {}", err);
            return;
        }
    };

    let intent = match build_intent(&cli.command, &config) {
        Ok(intent) => intent,
        Err(err) => {
            println!("{}", err);
            return;
        }
    };

    let store = Arc::new(Mutex::new(SessionStore::new()));
    let engine = SchedulerEngine::new(store, client, config);

    let mut reply = engine
        .handle_event(
            SessionEvent::IntentSubmitted {
                session_id: CLI_SESSION.to_string(),
                intent,
            },
            Utc::now(),
        )
        .await;

    loop {
        match reply {
            Ok(EngineReply::AwaitingConfirmation { ref summary, .. })
            | Ok(EngineReply::Reprompt { ref summary }) => {
                println!("{}", summary);
                let answer = Text::new("Confirm? (yes/no)")
                    .prompt()
                    .unwrap_or_else(|_| "cancel".to_string());
                reply = engine
                    .handle_event(
                        SessionEvent::ReplySubmitted {
                            session_id: CLI_SESSION.to_string(),
                            text: answer,
                        },
                        Utc::now(),
                    )
                    .await;
            }
            Ok(EngineReply::Committed { summary, .. }) => {
                println!("{}", summary);
                break;
            }
            Ok(EngineReply::Cancelled { .. }) => {
                println!("Cancelled; nothing was changed.");
                break;
            }
            Ok(EngineReply::Informational { summary })
            | Ok(EngineReply::ConflictDetected { summary, .. }) => {
                println!("{}", summary);
                break;
            }
            Err(err) => {
                println!("{}", err);
                break;
            }
        }
    }
}

fn build_intent(command: &Commands, config: &SchedulerConfig) -> Result<Intent, String> {
    match command {
        Commands::Schedule { title, start, end } => Ok(Intent::Create {
            title: title.clone(),
            interval: parse_interval(start, end, config)?,
        }),
        Commands::Reschedule {
            title,
            around_start,
            around_end,
            new_start,
            new_end,
            new_title,
        } => {
            let new_interval = match (new_start, new_end) {
                (Some(start), Some(end)) => Some(parse_interval(start, end, config)?),
                (None, None) => None,
                _ => return Err("--new-start and --new-end must be given together".to_string()),
            };
            Ok(Intent::Update {
                selector: EventSelector {
                    title: title.clone(),
                    around: parse_interval(around_start, around_end, config)?,
                },
                new_title: new_title.clone(),
                new_interval,
            })
        }
        Commands::Remove {
            title,
            around_start,
            around_end,
        } => Ok(Intent::Delete {
            selector: EventSelector {
                title: title.clone(),
                around: parse_interval(around_start, around_end, config)?,
            },
        }),
        Commands::Agenda { from, to } => Ok(Intent::List {
            window: parse_interval(from, to, config)?,
        }),
        Commands::Free {
            duration_minutes,
            from,
            to,
        } => Ok(Intent::FindSlot {
            duration_minutes: *duration_minutes,
            window: parse_interval(from, to, config)?,
        }),
    }
}

fn parse_interval(
    start: &str,
    end: &str,
    config: &SchedulerConfig,
) -> Result<TimeInterval, String> {
    let start = parse_local(start)?;
    let end = parse_local(end)?;
    TimeInterval::from_local(start, end, config.timezone).map_err(|err| err.to_string())
}

fn parse_local(text: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .map_err(|_| format!("Invalid time '{}'; expected \"YYYY-MM-DD HH:MM\"", text))
}
