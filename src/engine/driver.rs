use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, PipeReader, Write};
use std::process::ChildStdin;
use tracing::{debug, warn};
use crate::engine::channel::LineChannel;
use crate::engine::command::{sentinel, UciCommand};
use crate::engine::error::EngineError;
use crate::engine::options::EngineOption;
use crate::engine::process::{EngineConfig, EngineProcess};

/// Request/response framing on top of a [`LineChannel`].
///
/// UCI has no request ids and no acknowledgements: every response block is
/// read until a line with a known prefix shows up. `wait_ready` is the only
/// way to know the engine finished processing what was sent before it.
pub struct UciDriver<R, W: Write> {
    channel: LineChannel<R, W>,
}

pub type ProcessDriver = UciDriver<BufReader<PipeReader>, ChildStdin>;

impl ProcessDriver {
    /// Starts the engine, performs the `isready` handshake and applies `config.options`.
    /// Nothing is left running if any of that fails.
    pub fn spawn(config: &EngineConfig) -> Result<(Self, EngineProcess), EngineError> {
        let (process, stdout, stdin) = EngineProcess::spawn(config)
            .map_err(|x| EngineError::Init(Box::new(x)))?;
        let mut driver = UciDriver::new(BufReader::new(stdout), stdin);

        if let Err(error) = driver.initialize(&config.options) {
            if let Err(kill_error) = process.terminate() {
                warn!(pid = process.id(), %kill_error, "could not terminate engine after failed start");
            }
            return Err(EngineError::Init(Box::new(error)));
        }

        Ok((driver, process))
    }
}

impl<R, W: Write> UciDriver<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        UciDriver {
            channel: LineChannel::new(reader, writer),
        }
    }

    pub fn send(&mut self, command: &UciCommand) -> Result<(), EngineError> {
        self.send_command(&command.to_string())
    }

    /// `quit` bypasses the buffered writer so it still gets out while the engine is torn down.
    pub fn send_command(&mut self, text: &str) -> Result<(), EngineError> {
        debug!(command = text, "send");

        if text == "quit" {
            self.channel.write_raw(text)?;
        } else {
            self.channel.write_line(text)?;
        }

        Ok(())
    }

    pub fn apply_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.send(&UciCommand::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn writer(&self) -> &W {
        self.channel.writer()
    }
}

impl<R: BufRead, W: Write> UciDriver<R, W> {
    /// Reads until a line starting with `prefix`. The returned lines end with that line.
    pub fn await_sentinel(&mut self, prefix: &str) -> Result<Vec<String>, EngineError> {
        let mut lines = Vec::new();

        while let Some(line) = self.channel.read_line()? {
            let found = line.starts_with(prefix);
            lines.push(line);

            if found {
                return Ok(lines);
            }
        }

        Err(EngineError::MissingSentinel {
            expected: prefix.to_string(),
            lines,
        })
    }

    pub fn await_last_line(&mut self, prefix: &str) -> Result<String, EngineError> {
        let mut lines = self.await_sentinel(prefix)?;

        lines.pop().ok_or_else(|| EngineError::MissingSentinel {
            expected: prefix.to_string(),
            lines: Vec::new(),
        })
    }

    pub fn wait_ready(&mut self) -> Result<(), EngineError> {
        self.send(&UciCommand::IsReady)?;
        self.await_sentinel(sentinel::READY)?;
        Ok(())
    }

    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send(&UciCommand::NewGame)?;
        self.wait_ready()
    }

    /// The startup sequence: a handshake, then every option behind its own `isready`.
    pub fn initialize(&mut self, options: &BTreeMap<EngineOption, String>) -> Result<(), EngineError> {
        self.wait_ready()?;

        for (option, value) in options {
            self.wait_ready()?;
            self.apply_option(option.uci_name(), value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use crate::engine::error::EngineError;
    use crate::engine::options::EngineOption;
    use super::UciDriver;

    fn scripted(output: &str) -> UciDriver<Cursor<String>, Vec<u8>> {
        UciDriver::new(Cursor::new(output.to_string()), Vec::new())
    }

    fn written(driver: &UciDriver<Cursor<String>, Vec<u8>>) -> String {
        String::from_utf8(driver.writer().clone()).unwrap()
    }

    #[test]
    fn sentinel_block_includes_every_line_in_order() {
        let mut driver = scripted("info string one\ninfo string two\nbestmove e2e4 ponder e7e5\nreadyok\n");

        assert_eq!(
            driver.await_sentinel("bestmove").unwrap(),
            vec!["info string one", "info string two", "bestmove e2e4 ponder e7e5"],
        );
        assert_eq!(driver.await_sentinel("readyok").unwrap(), vec!["readyok"]);
    }

    #[test]
    fn missing_sentinel_carries_everything_read() {
        let mut driver = scripted("31\n0\n1\n2\n");

        assert_eq!(driver.await_last_line("3").unwrap(), "31");

        let error = driver.await_sentinel("40").unwrap_err();
        assert!(error.is_protocol_failure());
        assert_eq!(error.lines(), Some(&["0".to_string(), "1".to_string(), "2".to_string()][..]));

        let error = driver.await_sentinel("1").unwrap_err();
        assert_eq!(error.lines(), Some(&[][..]));
    }

    #[test]
    fn counting_stream_matches_prefixes() {
        let mut output = String::from("31\n");
        for i in 0..33 {
            output.push_str(&format!("{i}\n"));
        }
        let mut driver = scripted(&output);

        assert_eq!(driver.await_last_line("3").unwrap(), "31");
        assert_eq!(driver.await_last_line("1").unwrap(), "1");
        assert_eq!(driver.await_last_line("3").unwrap(), "3");
        assert_eq!(driver.await_sentinel("32").unwrap().len(), 29);
        assert!(driver.await_last_line("21").is_err());
    }

    #[test]
    fn wait_ready_sends_isready() {
        let mut driver = scripted("Stockfish 15.1 by the Stockfish developers\nreadyok\n");

        driver.wait_ready().unwrap();
        assert_eq!(written(&driver), "isready\n");

        assert!(matches!(driver.wait_ready(), Err(EngineError::MissingSentinel { .. })));
    }

    #[test]
    fn initialize_guards_each_option() {
        let mut driver = scripted("readyok\nreadyok\nreadyok\n");
        let options = BTreeMap::from([
            (EngineOption::Threads, "2".to_string()),
            (EngineOption::SkillLevel, "5".to_string()),
        ]);

        driver.initialize(&options).unwrap();

        assert_eq!(
            written(&driver),
            "isready\n\
             isready\nsetoption name Threads value 2\n\
             isready\nsetoption name Skill Level value 5\n",
        );
    }

    #[test]
    fn new_game_waits_for_engine() {
        let mut driver = scripted("readyok\n");

        driver.new_game().unwrap();
        assert_eq!(written(&driver), "ucinewgame\nisready\n");
    }

    #[test]
    fn quit_is_written_unbuffered() {
        let mut driver = scripted("");

        driver.send_command("quit").unwrap();
        assert_eq!(written(&driver), "quit\n");
    }
}
