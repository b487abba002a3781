use std::{env, fs, process};
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use crate::engine::EngineConfig;


pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const EMPTY_BOARD_FEN: &str = "8/8/8/8/8/8/8/8 b KQkq - 0 1";
pub const MOCK_ENGINE_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/tests/assets/mock_engine.sh");
pub const STOCKFISH_PATH_VAR: &str = "STOCKFISH_PATH";

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Set STOCKFISH_PATH to a Stockfish binary to run this test")]
    NoStockfish,
    #[error("Engine answered {actual}, expected {expected}")]
    UnexpectedAnswer {
        expected: String,
        actual: String,
    },
}

/// The shell stand-in engine, run through `sh` so the script needs no exec bit.
pub fn mock_engine() -> EngineConfig {
    EngineConfig::new("sh").with_arg(MOCK_ENGINE_PATH)
}

/// Commands the mock engine received, one per line. The file is removed on drop.
pub struct CommandLog {
    pub path: PathBuf,
}

impl CommandLog {
    pub fn new(name: &str) -> Self {
        let path = env::temp_dir().join(format!("uci_client_{}_{name}.log", process::id()));
        fs::remove_file(&path).ok();

        CommandLog { path }
    }

    pub fn lines(&self) -> Vec<String> {
        fs::read_to_string(&self.path)
            .unwrap_or_default()
            .lines()
            .map(|x| x.to_string())
            .collect()
    }
}

impl Drop for CommandLog {
    fn drop(&mut self) {
        fs::remove_file(&self.path).ok();
    }
}

/// The mock engine, logging every command it reads to `log`.
pub fn logged_mock_engine(log: &CommandLog) -> EngineConfig {
    mock_engine().with_arg(log.path.display().to_string())
}

pub fn stockfish() -> Result<EngineConfig, TestError> {
    env::var_os(STOCKFISH_PATH_VAR)
        .map(|x| EngineConfig::new(PathBuf::from(x)))
        .ok_or(TestError::NoStockfish)
}

/// A `Write` whose bytes stay readable after the writer moved to another thread.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();

        String::from_utf8(bytes).unwrap()
            .lines()
            .map(|x| x.to_string())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
