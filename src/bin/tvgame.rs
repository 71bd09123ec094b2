//! Terminal client for the trivia game.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tvgame -- host --url ws://localhost:8080/ws
//! cargo run --bin tvgame -- join --url ws://localhost:8080/ws --name Alice --code ABCD
//! ```
//!
//! The host types `begin` (or an empty line) to start the game. A contestant
//! types an answer when prompted, and the text of an answer, or its number,
//! to vote.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use garde::Validate;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tvgame::{
    config::{Config, ConfigError},
    controller::Controller,
    logger::setup_logger,
    participant::{Participant, ParticipantPhase},
    render::{PhaseData, PhaseName, RenderBridge},
    session::{Machine, Session},
    ws::{self, TransportError},
};
use web_time::Instant;

/// Frame period of the tick loop
const TICK: Duration = Duration::from_millis(50);

/// Time allowed for the socket to finish closing before the process exits
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "tvgame", version, about = "Party trivia terminal client")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Websocket endpoint of the game server, overrides the configuration
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    role: Role,
}

#[derive(Debug, Subcommand)]
enum Role {
    /// Create a room and drive the shared display
    Host,
    /// Join a room as a contestant
    Join {
        /// Name to play under
        #[arg(long)]
        name: String,
        /// Room code shown on the host's display
        #[arg(long)]
        code: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Prints views as plain text
#[derive(Debug, Default)]
struct Terminal {
    ballot: Vec<String>,
}

impl RenderBridge for Terminal {
    fn render_phase(&mut self, name: PhaseName, data: &PhaseData) {
        match data {
            PhaseData::Joining { error: Some(error) } => println!("[{name}] {error}"),
            PhaseData::Joining { error: None } => println!("[{name}] joining..."),
            PhaseData::Waiting => println!("[{name}]"),
            PhaseData::Answering {
                prompt,
                pending,
                error,
                ..
            } => {
                println!("[{name}] {prompt}");
                if *pending {
                    println!("  sent, waiting for the server");
                }
                if let Some(error) = error {
                    println!("  ! {error}");
                }
            }
            PhaseData::Voting {
                ballot,
                pending,
                error,
            } => {
                println!("[{name}] {}", ballot.text);
                for (number, answer) in ballot.answers.iter().enumerate() {
                    println!("  {}. {answer}", number + 1);
                }
                self.ballot.clone_from(&ballot.answers);
                if *pending {
                    println!("  sent, waiting for the server");
                }
                if let Some(error) = error {
                    println!("  ! {error}");
                }
            }
            PhaseData::Creating => println!("[{name}] creating room..."),
            PhaseData::Lobby { room_code, players } => {
                println!("[{name}] room code {room_code}, {} joined", players.len());
                for player in players {
                    println!("  {}", player.name);
                }
            }
            PhaseData::CollectingAnswers(collection) | PhaseData::CollectingVotes(collection) => {
                println!(
                    "[{name}] {} ({}/{} in, {}s left)",
                    collection.question.text,
                    collection.responded,
                    collection.expected,
                    collection.remaining
                );
            }
            PhaseData::Results {
                question,
                standings,
                ..
            } => {
                println!("[{name}] {}", question.text);
                for answer in &question.answers {
                    let marker = if answer.is_correct() { "*" } else { " " };
                    println!("  {marker} {} ({} votes)", answer.text, answer.vote_count());
                }
                print_standings(standings);
            }
            PhaseData::Summary { standings } | PhaseData::Complete { standings } => {
                println!("[{name}]");
                print_standings(standings);
            }
        }
    }

    fn render_error(&mut self, text: &str) {
        println!("! {text}");
    }
}

fn print_standings(standings: &[tvgame::roster::Standing]) {
    for standing in standings {
        println!(
            "  {:>2}. {:<20} {:>6}",
            standing.position + 1,
            standing.player.name,
            standing.total
        );
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
                path: path.clone(),
                source,
            })?;
            Config::from_json(&text)?
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.url.clone_from(url);
        config.validate().map_err(ConfigError::from)?;
    }

    Ok(config)
}

fn spawn_stdin() -> mpsc::UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

/// Connects a session and ticks it until the connection closes
async fn run<M, F>(config: &Config, machine: M, mut on_line: F) -> Result<(), CliError>
where
    M: Machine,
    M::Event: Send + 'static,
    F: FnMut(&mut Session<M, Terminal>, &str),
{
    let (mut session, link) = Session::new(machine, Terminal::default(), config.max_messages_per_tick);
    session.start();

    let transport = ws::connect(&config.url, link).await?;
    let mut input = spawn_stdin();
    let mut interval = tokio::time::interval(TICK);

    loop {
        interval.tick().await;

        while let Ok(line) = input.try_recv() {
            on_line(&mut session, line.trim());
        }

        session.tick(Instant::now());
        if session.is_closed() {
            break;
        }
    }

    tokio::time::sleep(TICK).await;
    session.tick(Instant::now());
    drop(session);

    if tokio::time::timeout(CLOSE_GRACE, transport.join()).await.is_err() {
        tracing::debug!("websocket did not close in time");
    }

    Ok(())
}

async fn host(config: &Config) -> Result<(), CliError> {
    let controller = Controller::new(config.durations());

    run(config, controller, |session, line| match line {
        "" | "begin" => {
            if let Err(e) = session.act(Controller::begin) {
                println!("! {e}");
            }
        }
        other => println!("! unknown command `{other}`, type `begin` to start"),
    })
    .await
}

async fn join(config: &Config, name: String, code: String) -> Result<(), CliError> {
    let participant = Participant::new(name, code);

    run(config, participant, |session, line| {
        let result = match session.machine().phase() {
            ParticipantPhase::Voting => {
                let choice = line
                    .parse::<usize>()
                    .ok()
                    .and_then(|number| number.checked_sub(1))
                    .and_then(|index| session.bridge().ballot.get(index).cloned())
                    .unwrap_or_else(|| line.to_string());
                session.act(|participant| participant.submit_vote(choice))
            }
            _ => session.act(|participant| participant.submit_answer(line)),
        };
        if let Err(e) = result {
            println!("! {e}");
        }
    })
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.role {
        Role::Host => host(&config).await,
        Role::Join { name, code } => join(&config, name, code).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
