use std::collections::BTreeMap;
use std::io;
use std::io::PipeReader;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use crate::engine::error::EngineError;
use crate::engine::options::EngineOption;

/// How to launch an engine, and the options to apply once it is up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub options: BTreeMap<EngineOption, String>,
}

impl EngineConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        EngineConfig {
            program: program.into(),
            args: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_option(mut self, option: EngineOption, value: impl ToString) -> Self {
        self.options.insert(option, value.to_string());
        self
    }
}

/// Shared handle on a spawned engine. Clones refer to the same process,
/// so one can be kept aside to kill an engine whose streams are busy elsewhere.
#[derive(Clone, Debug)]
pub struct EngineProcess {
    child: Arc<Mutex<Child>>,
    id: u32,
}

impl EngineProcess {
    /// Spawns the engine with piped stdin. Its stdout and stderr share one pipe, so the returned
    /// reader sees diagnostics in the order the engine wrote them.
    pub fn spawn(config: &EngineConfig) -> Result<(Self, PipeReader, ChildStdin), EngineError> {
        let spawn_error = |source: io::Error| EngineError::Spawn {
            program: config.program.display().to_string(),
            source,
        };

        let (output, output_writer) = io::pipe().map_err(spawn_error)?;
        let error_writer = output_writer.try_clone().map_err(spawn_error)?;

        // The command, and with it the parent's copies of the write ends, is dropped at the end
        // of this statement. Otherwise the reader would never see end-of-stream.
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(output_writer)
            .stderr(error_writer)
            .spawn()
            .map_err(spawn_error)?;

        let stdin = child.stdin.take();
        let process = EngineProcess::new(child);

        match stdin {
            Some(stdin) => {
                info!(pid = process.id(), program = %config.program.display(), "spawned engine");
                Ok((process, output, stdin))
            },
            None => {
                process.terminate().ok();
                Err(spawn_error(io::Error::new(io::ErrorKind::BrokenPipe, "engine pipes unavailable")))
            },
        }
    }

    pub fn new(child: Child) -> Self {
        let id = child.id();

        EngineProcess {
            child: Arc::new(Mutex::new(child)),
            id,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    // Only held for non-blocking calls, or for the wait right after a kill.
    fn lock(&self) -> MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.lock().try_wait(), Ok(None))
    }

    /// `None` while running. A process ended by a signal has a status but no code.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.lock().try_wait().ok().flatten()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status().and_then(|status| status.code())
    }

    /// Kills the process if it is still running and reaps it. A no-op for a process that already exited.
    pub fn terminate(&self) -> io::Result<()> {
        let mut child = self.lock();

        if let Some(status) = child.try_wait()? {
            debug!(pid = self.id, %status, "engine already exited");
            return Ok(());
        }

        match child.kill() {
            Ok(()) => (),
            // Older std reports a child that exited in the meantime this way
            Err(error) if error.kind() == io::ErrorKind::InvalidInput => return Ok(()),
            Err(error) => return Err(error),
        }

        let status = child.wait()?;
        info!(pid = self.id, %status, "engine terminated");

        Ok(())
    }
}

#[test]
fn spawn_failure_names_the_program() {
    let config = EngineConfig::new("./definitely/not/an/engine");
    let error = EngineProcess::spawn(&config).unwrap_err();

    assert!(matches!(error, EngineError::Spawn { .. }));
    assert!(error.to_string().contains("./definitely/not/an/engine"));
}

#[test]
fn config_collects_args_and_options() {
    let config = EngineConfig::new("stockfish")
        .with_arg("--bench")
        .with_option(EngineOption::Threads, 2)
        .with_option(EngineOption::Hash, "64")
        .with_option(EngineOption::Threads, 4);

    assert_eq!(config.args, vec!["--bench".to_string()]);
    assert_eq!(config.options.len(), 2);
    assert_eq!(config.options.get(&EngineOption::Threads).map(String::as_str), Some("4"));
}
