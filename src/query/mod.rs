use std::collections::HashSet;
use serde::Serialize;
use crate::engine::command::GoOptions;

pub mod validation;

pub use validation::ValidationError;

/// Marks a numeric search constraint as not set: the engine default applies.
/// Any negative value is treated the same way.
pub const UNSET: i32 = -1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum QueryKind {
    BestMove,
    MakeMoves,
    LegalMoves,
    Checkers,
}

/// The optional parts of a [`Query`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryParams {
    pub moves: Option<String>,  // coordinate moves played from the FEN, space separated
    pub difficulty: i32,  // `Skill Level`
    pub depth: i32,
    pub movetime: i64,  // ms
    pub elo: i32,  // `UCI_Elo`, only used when no difficulty is given
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            moves: None,
            difficulty: UNSET,
            depth: UNSET,
            movetime: UNSET as i64,
            elo: UNSET,
        }
    }
}

/// A validated request for the engine. Build one with [`Query::new`]; it can't be changed afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Query {
    kind: QueryKind,
    fen: String,
    params: QueryParams,
}

impl Query {
    pub fn new(kind: QueryKind, fen: impl Into<String>, params: QueryParams) -> Result<Self, ValidationError> {
        let fen = fen.into();

        validation::validate_fen(&fen)?;
        if let Some(moves) = &params.moves {
            validation::validate_moves(moves)?;
        }

        Ok(Query { kind, fen, params })
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn moves(&self) -> Option<&str> {
        self.params.moves.as_deref()
    }

    pub fn difficulty(&self) -> i32 {
        self.params.difficulty
    }

    pub fn depth(&self) -> i32 {
        self.params.depth
    }

    pub fn movetime(&self) -> i64 {
        self.params.movetime
    }

    pub fn elo(&self) -> i32 {
        self.params.elo
    }

    pub fn skill_level(&self) -> Option<u32> {
        u32::try_from(self.params.difficulty).ok()
    }

    pub fn target_elo(&self) -> Option<u32> {
        u32::try_from(self.params.elo).ok()
    }

    pub fn go_options(&self) -> GoOptions {
        GoOptions {
            depth: u32::try_from(self.params.depth).ok(),
            movetime: u64::try_from(self.params.movetime).ok(),
        }
    }
}

/// What the engine answered to a [`Query`], one variant per [`QueryKind`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum QueryOutcome {
    BestMove(String),
    Fen(String),
    LegalMoves(HashSet<String>),
    Checkers(String),
}

impl QueryOutcome {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryOutcome::BestMove(_) => QueryKind::BestMove,
            QueryOutcome::Fen(_) => QueryKind::MakeMoves,
            QueryOutcome::LegalMoves(_) => QueryKind::LegalMoves,
            QueryOutcome::Checkers(_) => QueryKind::Checkers,
        }
    }
}
