use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gambit::ai_game::{AiGame, AiGameError};
use gambit::orchestrator::{MoveOrchestrator, MoveSource};
use gambit::persistence::{JsonSessionStore, SessionStore};
use gambit::rules::*;
use gambit::service::UciEngine;
use gambit::service_match::{MatchEvent, ServiceMatch};
use gambit::session::GameSession;

mod config;

use config::GambitCliConfig;

fn clap_parse_color(s: &str) -> Result<Color, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn clap_parse_position(s: &str) -> Result<Position, String> {
    s.parse().map_err(|e| format!("{}", e))
}

#[derive(Debug, Parser)]
struct GambitCliArgs {
    #[clap(long, global = true, default_value = "gambit-cli-config.json")]
    config: PathBuf,
    #[clap(subcommand)]
    subcommand: Commands
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play against an engine from the config file.
    Play {
        #[clap(short, long)]
        engine: String,
        /// The color you play. Ignored when resuming a saved game.
        #[clap(short, long, default_value = "white", value_parser = clap_parse_color)]
        color: Color,
        #[clap(long)]
        load: Option<PathBuf>,
        #[clap(long)]
        save: Option<PathBuf>
    },
    /// Let two engines play each other.
    SelfPlay {
        #[clap(short, long)]
        white: String,
        #[clap(short, long)]
        black: String,
        #[clap(long, value_parser = clap_parse_position)]
        fen: Option<Position>
    },
    /// Count leaf nodes of the legal move tree.
    Perft {
        #[clap(long, value_parser = clap_parse_position)]
        fen: Option<Position>,
        depth: u32
    }
}

fn print_board(position: &Position, flipped: bool) {
    let ranks: Vec<u8> = if flipped { (0..8).collect() } else { (0..8).rev().collect() };
    let files: Vec<u8> = if flipped { (0..8).rev().collect() } else { (0..8).collect() };
    for &rank in &ranks {
        let row: Vec<String> = files
            .iter()
            .map(|&file| position.piece_on(Square::new(file, rank)).map_or('.', |p| p.to_char()).to_string())
            .collect();
        println!("{} {}", rank + 1, row.join(" "));
    }
    let labels: Vec<String> = files.iter().map(|&file| ((b'a' + file) as char).to_string()).collect();
    println!("  {}", labels.join(" "));
}

fn save_session(session: &GameSession, path: &Path) -> Result<()> {
    let blob = JsonSessionStore.save(session)?;
    std::fs::write(path, blob).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "game saved");
    Ok(())
}

async fn play(config: &GambitCliConfig, engine: &str, color: Color, load: Option<PathBuf>, save: Option<PathBuf>) -> Result<()> {
    let session = match &load {
        Some(path) => {
            let blob = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            JsonSessionStore
                .restore(&blob)
                .with_context(|| format!("failed to restore {}", path.display()))?
        }
        None => GameSession::new(color)
    };
    let engine = UciEngine::new(config.engine(engine)?)
        .await
        .with_context(|| format!("failed to start engine `{}`", engine))?;
    println!("playing {} against {}", session.player_color(), engine.name());
    let flipped = session.player_color() == Color::Black;
    let mut game = AiGame::new(session, engine, MoveOrchestrator::new(config.orchestrator));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while game.session().is_active() {
        if game.session().is_ai_turn() {
            let turn = game.play_ai_move().await?;
            match turn.played.source {
                MoveSource::Service { .. } => println!("{}: {}", game.session().ai_color(), turn.san),
                MoveSource::Fallback(reason) => {
                    warn!(%reason, failures = turn.played.failures.len(), "engine move replaced by fallback");
                    println!("{}: {} (fallback)", game.session().ai_color(), turn.san)
                }
            }
            continue;
        }

        print_board(game.session().position(), flipped);
        print!("{} ({})> ", game.session().whose_turn(), game.session().status());
        std::io::stdout().flush()?;
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break
        };
        match line.trim() {
            "" => {}
            "quit" | "exit" => break,
            "board" | "fen" => println!("{}", game.session().position()),
            "moves" => {
                let position = game.session().position();
                let moves: Vec<String> = game.session().legal_moves().into_iter().map(|mv| to_san(position, mv)).collect();
                println!("{}", moves.join(" "));
            }
            "history" => {
                for (i, entry) in game.session().history().iter().enumerate() {
                    println!("{:>3}. {}", i + 1, entry.san);
                }
            }
            "draw" => {
                game.agree_draw()?;
            }
            "save" => match &save {
                Some(path) => save_session(game.session(), path)?,
                None => println!("no --save path given")
            },
            notation => match game.play_player_move(notation) {
                Ok(_) => {}
                Err(AiGameError::Session(e)) => println!("{}", e),
                Err(e) => return Err(e.into())
            }
        }
    }

    if !game.session().is_active() {
        print_board(game.session().position(), flipped);
        println!("{}", game.session().status());
    }
    if let Some(path) = &save {
        save_session(game.session(), path)?;
    }
    Ok(())
}

async fn self_play(config: &GambitCliConfig, white: &str, black: &str, fen: Option<Position>) -> Result<()> {
    let white_engine = UciEngine::new(config.engine(white)?)
        .await
        .with_context(|| format!("failed to start engine `{}`", white))?;
    let black_engine = UciEngine::new(config.engine(black)?)
        .await
        .with_context(|| format!("failed to start engine `{}`", black))?;
    info!(white = white_engine.name(), black = black_engine.name(), "engines ready");

    let session = GameSession::from_position(fen.unwrap_or_default(), Color::White);
    let orchestrator = MoveOrchestrator::new(config.orchestrator);
    let events = ServiceMatch::new(session, Box::new(white_engine), Box::new(black_engine), orchestrator).run();
    futures_util::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event? {
            MatchEvent::MovePlayed { color, san, source, failures, .. } => match source {
                MoveSource::Service { .. } => println!("{}: {}", color, san),
                MoveSource::Fallback(reason) => {
                    warn!(%color, %reason, failures, "engine move replaced by fallback");
                    println!("{}: {} (fallback)", color, san)
                }
            },
            MatchEvent::GameOver { status } => println!("{}", status)
        }
    }
    Ok(())
}

fn run_perft(fen: Option<Position>, depth: u32) -> Result<()> {
    let position = fen.unwrap_or_default();
    if depth == 0 {
        println!("total: 1");
        return Ok(());
    }
    let mut total = 0;
    for mv in legal_moves(&position) {
        let nodes = perft(&apply_move(&position, mv)?, depth - 1);
        println!("{}: {}", mv, nodes);
        total += nodes;
    }
    println!("total: {}", total);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = GambitCliArgs::parse();
    match args.subcommand {
        Commands::Play { engine, color, load, save } => {
            let config = GambitCliConfig::load(&args.config)?;
            play(&config, &engine, color, load, save).await
        }
        Commands::SelfPlay { white, black, fen } => {
            let config = GambitCliConfig::load(&args.config)?;
            self_play(&config, &white, &black, fen).await
        }
        Commands::Perft { fen, depth } => run_perft(fen, depth)
    }
}
