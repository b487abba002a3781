use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

// Fields are separated by single spaces only; any other whitespace would split the command on the wire.
const FEN_REGEX: &str = r"^(([rnbqkp1-8PRNBQK]{1,8}/){7}[rnbqkp1-8PRNBQK]{1,8}) ([wb]) ([-kqKQ]{1,4}) (-|[a-h][1-8]) ([0-9]+) ([0-9]+)$";
const MOVE_REGEX: &str = r"^([a-h][1-8]){2}[qnrb]?$";
const MOVES_REGEX: &str = r"^ *(([a-h][1-8]){2}[qnrb]?( +([a-h][1-8]){2}[qnrb]?)*)? *$";

lazy_static! {
    static ref FEN_PATTERN: Regex = Regex::new(FEN_REGEX).expect("FEN pattern compiles");
    static ref MOVE_PATTERN: Regex = Regex::new(MOVE_REGEX).expect("move pattern compiles");
    static ref MOVES_PATTERN: Regex = Regex::new(MOVES_REGEX).expect("moves pattern compiles");
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Query is missing FEN")]
    MissingFen,
    #[error("Incorrect FEN in Query: {0}")]
    InvalidFen(String),
    #[error("Incorrect move in Query: {0}")]
    InvalidMove(String),
}

pub fn validate_fen(fen: &str) -> Result<(), ValidationError> {
    if fen.is_empty() {
        return Err(ValidationError::MissingFen);
    }

    match FEN_PATTERN.is_match(fen) {
        true => Ok(()),
        false => Err(ValidationError::InvalidFen(fen.to_string())),
    }
}

pub fn is_move(chess_move: &str) -> bool {
    MOVE_PATTERN.is_match(chess_move)
}

/// A space separated sequence of coordinate moves, e.g. `e2e4 e7e5 g1f3`. Blank means no moves.
/// Only spaces separate moves: tabs and line breaks are rejected.
pub fn validate_moves(moves: &str) -> Result<(), ValidationError> {
    if MOVES_PATTERN.is_match(moves) {
        return Ok(());
    }

    let invalid = moves
        .split(' ')
        .find(|x| !x.is_empty() && !is_move(x))
        .unwrap_or(moves);

    Err(ValidationError::InvalidMove(invalid.to_string()))
}
