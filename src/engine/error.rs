use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unable to start and bind engine process")]
    Init(#[source] Box<EngineError>),
    #[error("Failed to spawn engine process `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Can not find expected line '{expected}' in output:\n  {}", .lines.join("\n  "))]
    MissingSentinel {
        expected: String,
        lines: Vec<String>,
    },
    #[error("Malformed '{expected}' line: {line}")]
    MalformedLine {
        expected: String,
        line: String,
    },
    #[error("Engine stream failure")]
    Io(#[from] io::Error),
    #[error("Error while closing engine: {}", .0.iter().map(|x| x.to_string()).collect::<Vec<_>>().join("; "))]
    Shutdown(Vec<EngineError>),
    #[error("Request cancelled by dispatcher shutdown")]
    Cancelled,
    #[error("Dispatcher worker is no longer running")]
    Disconnected,
}

impl EngineError {
    /// Whether this error came out of a command/response exchange
    /// (a missing or malformed sentinel, or a broken stream).
    pub fn is_protocol_failure(&self) -> bool {
        matches!(
            self,
            EngineError::MissingSentinel { .. } | EngineError::MalformedLine { .. } | EngineError::Io(_)
        )
    }

    pub fn is_init_failure(&self) -> bool {
        matches!(self, EngineError::Init(_))
    }

    pub fn is_shutdown_failure(&self) -> bool {
        matches!(self, EngineError::Shutdown(_))
    }

    /// The lines read before a sentinel went missing, if that is what failed.
    pub fn lines(&self) -> Option<&[String]> {
        match self {
            EngineError::MissingSentinel { lines, .. } => Some(lines),
            _ => None,
        }
    }
}

#[test]
fn missing_sentinel_lists_every_line() {
    let error = EngineError::MissingSentinel {
        expected: "readyok".to_string(),
        lines: vec!["info string a".to_string(), "info string b".to_string()],
    };

    assert!(error.is_protocol_failure());
    assert_eq!(
        error.to_string(),
        "Can not find expected line 'readyok' in output:\n  info string a\n  info string b"
    );
}

#[test]
fn shutdown_joins_causes() {
    let error = EngineError::Shutdown(vec![
        EngineError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
        EngineError::Cancelled,
    ]);

    assert!(error.is_shutdown_failure());
    assert!(!error.is_protocol_failure());
    assert_eq!(
        error.to_string(),
        "Error while closing engine: Engine stream failure; Request cancelled by dispatcher shutdown"
    );
}
