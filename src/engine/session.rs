use std::collections::HashSet;
use std::io::{BufRead, BufReader, PipeReader, Write};
use std::process::ChildStdin;
use tracing::{debug, info, warn};
use crate::engine::command::{sentinel, UciCommand};
use crate::engine::driver::UciDriver;
use crate::engine::error::EngineError;
use crate::engine::options::EngineOption;
use crate::engine::process::{EngineConfig, EngineProcess};
use crate::query::{Query, QueryKind, QueryOutcome};

/// One engine process and the queries it answers.
///
/// Every operation is a fixed sequence of commands, each state change fenced by
/// `isready`/`readyok`. After any error the engine is in an unknown state:
/// close the session and start a new one.
pub struct EngineSession<R = BufReader<PipeReader>, W: Write = ChildStdin> {
    driver: UciDriver<R, W>,
    process: Option<EngineProcess>,
    closed: bool,
}

impl EngineSession {
    pub fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        let (driver, process) = UciDriver::spawn(config)?;
        Ok(EngineSession::from_driver(driver, Some(process)))
    }
}

impl<R, W: Write> EngineSession<R, W> {
    /// A session over an existing driver. Without a process, `close` only sends `quit`.
    pub fn from_driver(driver: UciDriver<R, W>, process: Option<EngineProcess>) -> Self {
        EngineSession {
            driver,
            process,
            closed: false,
        }
    }

    pub fn driver(&self) -> &UciDriver<R, W> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut UciDriver<R, W> {
        &mut self.driver
    }

    pub fn process(&self) -> Option<&EngineProcess> {
        self.process.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        !self.closed && self.process.as_ref().map_or(true, |x| x.is_alive())
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.process.as_ref().and_then(|x| x.exit_code())
    }

    /// Sends `quit`, then kills the process if it is still there.
    /// The kill is attempted even when `quit` could not be written. Calling it again does nothing.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut failures = Vec::new();
        let already_exited = self.process.as_ref().map_or(false, |x| !x.is_alive());

        if already_exited {
            debug!("engine exited before quit");
        } else if let Err(error) = self.driver.send(&UciCommand::Quit) {
            failures.push(error);
        }

        if let Some(process) = &self.process {
            if let Err(error) = process.terminate() {
                failures.push(EngineError::Io(error));
            }
            info!(pid = process.id(), "engine session closed");
        }

        match failures.is_empty() {
            true => Ok(()),
            false => Err(EngineError::Shutdown(failures)),
        }
    }
}

impl<R: BufRead, W: Write> EngineSession<R, W> {
    pub fn execute(&mut self, query: &Query) -> Result<QueryOutcome, EngineError> {
        debug!(kind = ?query.kind(), fen = query.fen(), "execute");

        match query.kind() {
            QueryKind::BestMove => self.best_move(query).map(QueryOutcome::BestMove),
            QueryKind::MakeMoves => self.make_moves(query).map(QueryOutcome::Fen),
            QueryKind::LegalMoves => self.legal_moves(query).map(QueryOutcome::LegalMoves),
            QueryKind::Checkers => self.checkers(query).map(QueryOutcome::Checkers),
        }
    }

    pub fn best_move(&mut self, query: &Query) -> Result<String, EngineError> {
        if let Some(skill_level) = query.skill_level() {
            self.driver.wait_ready()?;
            self.driver.apply_option(EngineOption::SkillLevel.uci_name(), &skill_level.to_string())?;
        } else if let Some(elo) = query.target_elo() {
            self.driver.wait_ready()?;
            self.driver.apply_option(EngineOption::LimitStrength.uci_name(), "true")?;
            self.driver.apply_option(EngineOption::Elo.uci_name(), &elo.to_string())?;
        }

        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::set_position(query.fen(), query.moves()))?;

        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::Calculate(query.go_options()))?;

        let line = self.driver.await_last_line(sentinel::BEST_MOVE)?;

        line[sentinel::BEST_MOVE.len()..]
            .split_whitespace()
            .next()
            .map(|x| x.to_string())
            .ok_or_else(|| EngineError::MalformedLine {
                expected: sentinel::BEST_MOVE.to_string(),
                line: line.clone(),
            })
    }

    /// The FEN after playing the query's moves. Without moves this is the query's FEN as the engine prints it.
    pub fn make_moves(&mut self, query: &Query) -> Result<String, EngineError> {
        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::set_position(query.fen(), query.moves()))?;

        self.read_fen()
    }

    pub fn legal_moves(&mut self, query: &Query) -> Result<HashSet<String>, EngineError> {
        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::set_position(query.fen(), query.moves()))?;

        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::Perft(1))?;

        let mut response = self.driver.await_sentinel(sentinel::NODES)?;
        response.pop();

        Ok(parse_perft_moves(&response))
    }

    /// Squares of the pieces giving check, space separated. Empty when not in check.
    pub fn checkers(&mut self, query: &Query) -> Result<String, EngineError> {
        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::set_position(query.fen(), query.moves()))?;

        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::Display)?;

        let line = self.driver.await_last_line(sentinel::CHECKERS)?;
        Ok(line[sentinel::CHECKERS.len()..].trim().to_string())
    }

    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.driver.new_game()
    }

    fn read_fen(&mut self) -> Result<String, EngineError> {
        self.driver.wait_ready()?;
        self.driver.send(&UciCommand::Display)?;

        let line = self.driver.await_last_line(sentinel::FEN)?;
        let fen = line[sentinel::FEN.len()..].trim();

        match fen.is_empty() {
            true => Err(EngineError::MalformedLine {
                expected: sentinel::FEN.to_string(),
                line,
            }),
            false => Ok(fen.to_string()),
        }
    }
}

/// `go perft 1` prints one `<move>: <nodes>` line per legal move.
fn parse_perft_moves(lines: &[String]) -> HashSet<String> {
    lines.iter()
        .filter(|x| x.contains(':'))
        .filter_map(|x| x.split(':').next())
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

impl<R, W: Write> Drop for EngineSession<R, W> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(%error, "failed to close engine session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Cursor;
    use crate::engine::driver::UciDriver;
    use crate::engine::error::EngineError;
    use crate::query::{Query, QueryKind, QueryOutcome, QueryParams};
    use super::{parse_perft_moves, EngineSession};

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    type ScriptedSession = EngineSession<Cursor<String>, Vec<u8>>;

    fn scripted(output: &str) -> ScriptedSession {
        EngineSession::from_driver(UciDriver::new(Cursor::new(output.to_string()), Vec::new()), None)
    }

    fn written(session: &ScriptedSession) -> Vec<String> {
        String::from_utf8(session.driver().writer().clone())
            .unwrap()
            .lines()
            .map(|x| x.to_string())
            .collect()
    }

    fn query(kind: QueryKind, params: QueryParams) -> Query {
        Query::new(kind, START_FEN, params).unwrap()
    }

    #[test]
    fn best_move_plain_search() {
        let mut session = scripted("readyok\nreadyok\ninfo depth 10 score cp 30 pv e2e4\nbestmove e2e4 ponder e7e5\n");
        let params = QueryParams { depth: 10, ..QueryParams::default() };

        assert_eq!(session.best_move(&query(QueryKind::BestMove, params)).unwrap(), "e2e4");
        assert_eq!(
            written(&session),
            vec![
                "isready".to_string(),
                format!("position fen {START_FEN}"),
                "isready".to_string(),
                "go depth 10".to_string(),
            ],
        );
    }

    #[test]
    fn best_move_with_difficulty_sets_skill_level() {
        let mut session = scripted("readyok\nreadyok\nreadyok\nbestmove d2d4\n");
        let params = QueryParams {
            moves: Some("e2e4 e7e5".to_string()),
            difficulty: 10,
            elo: 1500,
            depth: 10,
            movetime: 10,
        };

        assert_eq!(session.best_move(&query(QueryKind::BestMove, params)).unwrap(), "d2d4");
        assert_eq!(
            written(&session),
            vec![
                "isready".to_string(),
                "setoption name Skill Level value 10".to_string(),
                "isready".to_string(),
                format!("position fen {START_FEN} moves e2e4 e7e5"),
                "isready".to_string(),
                "go depth 10 movetime 10".to_string(),
            ],
        );
    }

    #[test]
    fn best_move_with_elo_limits_strength() {
        let mut session = scripted("readyok\nreadyok\nreadyok\nbestmove g1f3\n");
        let params = QueryParams { elo: 1500, movetime: 100, ..QueryParams::default() };

        assert_eq!(session.best_move(&query(QueryKind::BestMove, params)).unwrap(), "g1f3");
        assert_eq!(
            written(&session)[..3],
            [
                "isready".to_string(),
                "setoption name UCI_LimitStrength value true".to_string(),
                "setoption name UCI_Elo value 1500".to_string(),
            ],
        );
        assert_eq!(written(&session).last().map(String::as_str), Some("go movetime 100"));
    }

    #[test]
    fn best_move_without_token_is_malformed() {
        let mut session = scripted("readyok\nreadyok\nbestmove\n");

        let error = session.best_move(&query(QueryKind::BestMove, QueryParams::default())).unwrap_err();
        assert!(matches!(error, EngineError::MalformedLine { .. }));
        assert!(error.is_protocol_failure());
    }

    #[test]
    fn make_moves_reads_fen_from_display() {
        let after = "rnbqkbnr/pppppppp/8/8/P7/8/1PPPPPPP/RNBQKBNR b KQkq - 0 1";
        let mut session = scripted(&format!(
            "readyok\nreadyok\n +---+\n |   |\n\nFen: {after}\nKey: 8F8F01D4562F59FB\nCheckers: \n",
        ));
        let params = QueryParams { moves: Some("a2a4".to_string()), ..QueryParams::default() };

        assert_eq!(session.make_moves(&query(QueryKind::MakeMoves, params)).unwrap(), after);
        assert_eq!(
            written(&session),
            vec![
                "isready".to_string(),
                format!("position fen {START_FEN} moves a2a4"),
                "isready".to_string(),
                "d".to_string(),
            ],
        );
    }

    #[test]
    fn legal_moves_collects_perft_lines() {
        let mut session = scripted(
            "readyok\nreadyok\ninfo string NNUE evaluation enabled\na2a3: 1\nb2b3: 1\na2a3: 1\ng1f3: 1\n\nNodes searched: 3\n",
        );

        let moves = session.legal_moves(&query(QueryKind::LegalMoves, QueryParams::default())).unwrap();
        assert_eq!(moves, HashSet::from(["a2a3".to_string(), "b2b3".to_string(), "g1f3".to_string()]));
        assert_eq!(written(&session).last().map(String::as_str), Some("go perft 1"));
    }

    #[test]
    fn perft_parsing_skips_lines_without_colon() {
        let lines = vec!["".to_string(), "e7e8q: 1".to_string(), "info depth 0".to_string()];

        assert_eq!(parse_perft_moves(&lines), HashSet::from(["e7e8q".to_string()]));
    }

    #[test]
    fn checkers_strips_prefix() {
        let mut session = scripted("readyok\nreadyok\nFen: 4k3/8/8/8/8/8/8/4K2r w - - 0 1\nCheckers: h1 \n");

        assert_eq!(session.checkers(&query(QueryKind::Checkers, QueryParams::default())).unwrap(), "h1");

        let mut session = scripted("readyok\nreadyok\nCheckers: \n");
        assert_eq!(session.checkers(&query(QueryKind::Checkers, QueryParams::default())).unwrap(), "");
    }

    #[test]
    fn execute_dispatches_on_kind() {
        let mut session = scripted("readyok\nreadyok\nCheckers: \n");

        assert_eq!(
            session.execute(&query(QueryKind::Checkers, QueryParams::default())).unwrap(),
            QueryOutcome::Checkers(String::new()),
        );
    }

    #[test]
    fn truncated_output_is_a_protocol_failure() {
        let mut session = scripted("readyok\nreadyok\nFen: \n");

        let error = session.make_moves(&query(QueryKind::MakeMoves, QueryParams::default())).unwrap_err();
        assert!(matches!(error, EngineError::MalformedLine { .. }));

        let mut session = scripted("readyok\n");
        let error = session.legal_moves(&query(QueryKind::LegalMoves, QueryParams::default())).unwrap_err();
        assert_eq!(error.lines(), Some(&[][..]));
    }

    #[test]
    fn close_is_idempotent() {
        let mut session = scripted("");

        session.close().unwrap();
        session.close().unwrap();

        assert!(!session.is_alive());
        assert_eq!(written(&session), vec!["quit".to_string()]);
    }
}
