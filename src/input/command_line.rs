/// Parsing for the command line at startup

use std::path::PathBuf;
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crate::engine::{EngineConfig, EngineOption};
use crate::query::{Query, QueryKind, QueryParams, UNSET};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Stockfish release builds, by instruction set. See the Stockfish download page for which one suits a CPU.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Variant {
    Default,
    Bmi2,
    Avx2,
    Popcnt,
    Modern,
}

impl Variant {
    /// File name of the release binary, e.g. `stockfish_15.1_linux_x64_avx2`.
    pub fn file_name(&self, windows: bool, version: &str) -> String {
        let suffix = match self {
            Variant::Default => "",
            Variant::Bmi2 => "_bmi2",
            Variant::Avx2 => "_avx2",
            Variant::Popcnt => "_popcnt",
            Variant::Modern => "_modern",
        };

        match windows {
            true => format!("stockfish_{version}_win_x64{suffix}.exe"),
            false => format!("stockfish_{version}_linux_x64{suffix}"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Asks a UCI chess engine about a position.")]
pub struct Cli {
    /// Path to the engine executable.
    #[arg(short, long, required_unless_present = "engine_dir")]
    pub engine: Option<PathBuf>,

    /// Directory holding Stockfish release builds, used instead of --engine.
    #[arg(long, conflicts_with = "engine")]
    pub engine_dir: Option<PathBuf>,

    /// Which build to pick from --engine-dir.
    #[arg(long, value_enum, default_value = "default")]
    pub variant: Variant,

    /// Stockfish version to pick from --engine-dir.
    #[arg(long, default_value = "15.1")]
    pub stockfish_version: String,

    /// Extra argument for the engine process. Can be repeated.
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Engine option applied at startup, as NAME=VALUE (e.g. `Threads=4`). Can be repeated.
    #[arg(short, long = "option", value_parser = parse_option)]
    pub options: Vec<(EngineOption, String)>,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub query: QueryCommand,
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// The move the engine would play.
    BestMove(QueryArgs),
    /// The FEN after playing --moves.
    MakeMoves(QueryArgs),
    /// Every legal move in the position.
    LegalMoves(QueryArgs),
    /// Squares of the pieces giving check.
    Checkers(QueryArgs),
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The position, in FEN.
    #[arg(short, long, default_value = START_FEN)]
    pub fen: String,

    /// Moves to play from the position, in coordinate notation (e.g. "e2e4 e7e5").
    #[arg(short, long)]
    pub moves: Option<String>,

    /// Engine skill level. Negative means the engine default.
    #[arg(long, default_value_t = UNSET, allow_negative_numbers = true)]
    pub difficulty: i32,

    /// Search depth. Negative means no limit.
    #[arg(long, default_value_t = UNSET, allow_negative_numbers = true)]
    pub depth: i32,

    /// Time to search, in ms. Negative means no limit.
    #[arg(long, default_value_t = UNSET as i64, allow_negative_numbers = true)]
    pub movetime: i64,

    /// Target playing strength, used when no difficulty is given.
    #[arg(long, default_value_t = UNSET, allow_negative_numbers = true)]
    pub elo: i32,
}

fn parse_option(s: &str) -> Result<(EngineOption, String)> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{s}'"))?;

    Ok((name.parse()?, value.trim().to_string()))
}

impl Cli {
    pub fn engine_path(&self) -> Result<PathBuf> {
        match (&self.engine, &self.engine_dir) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(dir)) => Ok(dir.join(self.variant.file_name(cfg!(windows), &self.stockfish_version))),
            (None, None) => Err(anyhow!("no engine given, use --engine or --engine-dir")),
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::new(self.engine_path()?);

        for arg in self.engine_args.iter() {
            config = config.with_arg(arg);
        }
        for (option, value) in self.options.iter() {
            config = config.with_option(*option, value);
        }

        Ok(config)
    }
}

impl QueryCommand {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryCommand::BestMove(_) => QueryKind::BestMove,
            QueryCommand::MakeMoves(_) => QueryKind::MakeMoves,
            QueryCommand::LegalMoves(_) => QueryKind::LegalMoves,
            QueryCommand::Checkers(_) => QueryKind::Checkers,
        }
    }

    pub fn to_query(&self) -> Result<Query> {
        let args = match self {
            QueryCommand::BestMove(args)
            | QueryCommand::MakeMoves(args)
            | QueryCommand::LegalMoves(args)
            | QueryCommand::Checkers(args) => args,
        };

        let params = QueryParams {
            moves: args.moves.clone(),
            difficulty: args.difficulty,
            depth: args.depth,
            movetime: args.movetime,
            elo: args.elo,
        };

        Ok(Query::new(self.kind(), args.fen.as_str(), params)?)
    }
}
