use std::fmt::{Display, Formatter};

/// Prefixes of the lines that close a response block.
pub mod sentinel {
    pub const READY: &str = "readyok";
    pub const BEST_MOVE: &str = "bestmove";
    pub const FEN: &str = "Fen:";
    pub const CHECKERS: &str = "Checkers:";
    pub const NODES: &str = "Nodes";
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GoOptions {
    pub depth: Option<u32>,  // plies to search
    pub movetime: Option<u64>,  // time to calculate, in ms
}

/// The commands this client sends to an engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UciCommand {
    IsReady,
    NewGame,
    SetOption {
        name: String,
        value: String,
    },
    SetPosition {
        fen: String,
        moves: Option<String>,
    },
    Calculate(GoOptions),  // `go` in UCI
    Perft(u32),
    Display,  // `d`, non-standard, prints the board with its FEN and checkers
    Quit,
}

impl UciCommand {
    /// `position fen ..`, appending the moves only when there are any.
    pub fn set_position(fen: &str, moves: Option<&str>) -> Self {
        UciCommand::SetPosition {
            fen: fen.to_string(),
            moves: moves
                .filter(|x| !x.trim().is_empty())
                .map(|x| x.to_string()),
        }
    }
}

impl Display for UciCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UciCommand::IsReady => write!(f, "isready"),
            UciCommand::NewGame => write!(f, "ucinewgame"),
            UciCommand::SetOption { name, value } => write!(f, "setoption name {name} value {value}"),
            UciCommand::SetPosition { fen, moves: Some(moves) } => write!(f, "position fen {fen} moves {moves}"),
            UciCommand::SetPosition { fen, moves: None } => write!(f, "position fen {fen}"),
            UciCommand::Calculate(options) => {
                write!(f, "go")?;
                if let Some(depth) = options.depth {
                    write!(f, " depth {depth}")?;
                }
                if let Some(movetime) = options.movetime {
                    write!(f, " movetime {movetime}")?;
                }
                Ok(())
            },
            UciCommand::Perft(depth) => write!(f, "go perft {depth}"),
            UciCommand::Display => write!(f, "d"),
            UciCommand::Quit => write!(f, "quit"),
        }
    }
}

#[test]
fn check_go_variants() {
    let go = |depth, movetime| UciCommand::Calculate(GoOptions { depth, movetime }).to_string();

    assert_eq!(go(None, None), "go");
    assert_eq!(go(Some(10), None), "go depth 10");
    assert_eq!(go(None, Some(1000)), "go movetime 1000");
    assert_eq!(go(Some(10), Some(1000)), "go depth 10 movetime 1000");
}

#[test]
fn check_position_moves_suffix() {
    let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    assert_eq!(
        UciCommand::set_position(fen, Some("e2e4 e7e5")).to_string(),
        format!("position fen {fen} moves e2e4 e7e5"),
    );
    assert_eq!(UciCommand::set_position(fen, Some("  ")).to_string(), format!("position fen {fen}"));
    assert_eq!(UciCommand::set_position(fen, None).to_string(), format!("position fen {fen}"));
}

#[test]
fn check_fixed_vocabulary() {
    assert_eq!(UciCommand::IsReady.to_string(), "isready");
    assert_eq!(UciCommand::NewGame.to_string(), "ucinewgame");
    assert_eq!(UciCommand::Perft(1).to_string(), "go perft 1");
    assert_eq!(UciCommand::Display.to_string(), "d");
    assert_eq!(UciCommand::Quit.to_string(), "quit");
    assert_eq!(
        UciCommand::SetOption { name: "Skill Level".to_string(), value: "10".to_string() }.to_string(),
        "setoption name Skill Level value 10",
    );
}
